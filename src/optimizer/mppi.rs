use tracing::{debug, info};

use super::config::{DefaultAction, OptimizerConfig};
use super::errors::OptimError;
use super::weights::{blend, importance_weights};
use crate::action::ActionSequence;
use crate::env::{Env, RenderMode, Transition};
use crate::noise::NoiseFilter;
use crate::sampler::{RolloutSampler, SampleRequest, Sampler, stream_seed};
use crate::trajectory::{ActionClip, TrajectoryError, TrajectoryRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    Planning,
    Terminated,
}

/// Summary of one committed control step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Index of the committed step (0 for the first).
    pub step: usize,
    pub iterations: usize,
    /// Best discounted rollout return seen during this call.
    pub best_return: f64,
    /// Rollouts discarded across all iterations of this call.
    pub discarded: usize,
    /// Reward of the committed real step.
    pub reward: f64,
    pub done: bool,
}

/// Receding-horizon MPPI controller.
///
/// Owns the real environment, the trajectory record (including the nominal
/// plan) and the rollout sampler. Each [`train_step`](Mppi::train_step)
/// refines the plan and commits exactly one real action.
pub struct Mppi<E: Env, Smp = RolloutSampler<E>> {
    env: E,
    config: OptimizerConfig,
    filter: NoiseFilter,
    sampler: Smp,
    record: TrajectoryRecord<E::State>,
    clip: ActionClip,
    phase: Phase,
}

impl<E: Env + Clone + 'static> Mppi<E> {
    /// Resets `env` with `config.seed` and builds a worker pool of
    /// `config.num_workers` private environment copies.
    pub fn new(env: E, config: OptimizerConfig) -> Result<Self, OptimError> {
        let sampler = RolloutSampler::new(&env, config.num_workers, config.paths_per_worker);
        Self::with_sampler(env, config, sampler)
    }
}

impl<E, Smp> Mppi<E, Smp>
where
    E: Env,
    Smp: Sampler<E::State>,
{
    pub fn with_sampler(mut env: E, config: OptimizerConfig, sampler: Smp) -> Result<Self, OptimError> {
        config.validate()?;
        let action_dim = env.action_dim();
        let filter = NoiseFilter::from_config(&config.noise, action_dim)?;
        if let DefaultAction::Fixed(action) = &config.default_action {
            if action.len() != action_dim {
                return Err(OptimError::Config(format!(
                    "default action has {} components, environment expects {action_dim}",
                    action.len()
                )));
            }
        }
        let clip = ActionClip::new(env.action_bounds(), config.action_clip);
        let record = TrajectoryRecord::initialize(&mut env, config.horizon, config.seed, clip)?;
        Ok(Self {
            env,
            config,
            filter,
            sampler,
            record,
            clip,
            phase: Phase::Initialized,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn filter(&self) -> &NoiseFilter {
        &self.filter
    }

    pub fn record(&self) -> &TrajectoryRecord<E::State> {
        &self.record
    }

    pub fn into_record(self) -> TrajectoryRecord<E::State> {
        self.record
    }

    pub fn nominal(&self) -> &ActionSequence {
        self.record.nominal()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// [`train_step`](Mppi::train_step) with the configured
    /// `num_iterations`.
    pub async fn step(&mut self) -> Result<Option<StepReport>, OptimError> {
        self.train_step(self.config.num_iterations).await
    }

    /// Runs up to `num_iterations` sample-and-blend iterations, then commits
    /// the first planned action to the real environment and shifts the plan.
    ///
    /// Returns `Ok(None)` without touching anything once the episode is over.
    /// On error nothing is committed and the plan is restored to what it was
    /// before the call.
    pub async fn train_step(&mut self, num_iterations: usize) -> Result<Option<StepReport>, OptimError> {
        if self.is_done() {
            return Ok(None);
        }
        self.phase = Phase::Planning;

        let step = self.record.num_steps();
        let plan_before = self.record.nominal().clone();
        let mut best_return = f64::NEG_INFINITY;
        let mut discarded = 0;

        for iteration in 0..num_iterations {
            match self.iterate(step, iteration).await {
                Ok((best, lost)) => {
                    best_return = best_return.max(best);
                    discarded += lost;
                }
                Err(err) => {
                    self.record.set_nominal(plan_before)?;
                    return Err(err);
                }
            }
        }

        let transition = match self.commit() {
            Ok(transition) => transition,
            Err(err) => {
                self.record.set_nominal(plan_before)?;
                return Err(err);
            }
        };
        let done = transition.done || self.record.num_steps() >= self.config.episode_limit();
        if done {
            self.phase = Phase::Terminated;
        }

        info!(
            step,
            reward = transition.reward,
            best_return,
            discarded,
            done,
            "committed control step"
        );
        Ok(Some(StepReport {
            step,
            iterations: num_iterations,
            best_return,
            discarded,
            reward: transition.reward,
            done,
        }))
    }

    /// One sample → weight → blend pass. Returns the batch's best return and
    /// how many rollouts it lost.
    async fn iterate(&mut self, step: usize, iteration: usize) -> Result<(f64, usize), OptimError> {
        let start = self
            .record
            .current_state()
            .ok_or_else(|| TrajectoryError::InvariantViolation("record has no solved state".into()))?;
        let stream = stream_seed(stream_seed(self.config.seed, step as u64), iteration as u64);
        let batch = self
            .sampler
            .sample(SampleRequest {
                nominal: self.record.nominal(),
                filter: &self.filter,
                start,
                clip: self.clip,
                gamma: self.config.gamma,
                stream,
            })
            .await?;

        let weights = importance_weights(&batch.returns(), self.config.kappa);
        let updated = blend(&batch.candidates, &weights).ok_or_else(|| OptimError::SamplingExhausted {
            requested: batch.requested,
            last_error: "empty batch".into(),
        })?;
        self.record.set_nominal(updated)?;

        let best = batch.best().map_or(f64::NEG_INFINITY, |c| c.total_return);
        debug!(
            step,
            iteration,
            survivors = batch.len(),
            discarded = batch.discarded,
            best,
            "blended rollouts into plan"
        );
        Ok((best, batch.discarded))
    }

    /// Executes `nominal[0]` from the last solved state, records it and
    /// advances the plan by one step.
    fn commit(&mut self) -> Result<Transition, OptimError> {
        let state = self
            .record
            .current_state()
            .cloned()
            .ok_or_else(|| TrajectoryError::InvariantViolation("record has no solved state".into()))?;
        self.env.set_state(&state)?;

        let nominal = self.record.nominal();
        let action = self.clip.clipped(nominal.row(0));
        let fill = match &self.config.default_action {
            DefaultAction::Mean => self.filter.mean().to_vec(),
            DefaultAction::Repeat => nominal.row(nominal.horizon() - 1).to_vec(),
            DefaultAction::Fixed(action) => action.clone(),
        };

        let transition = self.env.step(&action, RenderMode::Off)?;
        self.record.commit_step(
            action,
            self.env.get_state(),
            transition.observation.clone(),
            transition.reward,
            transition.info.clone(),
        )?;
        self.record.nominal_mut().shift_left(&fill);
        Ok(transition)
    }
}
