//! Parallel evaluation of perturbed action sequences.

mod batch;
mod errors;
mod rollout;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

pub use batch::{Candidate, RolloutBatch};
pub use errors::SampleError;
pub use rollout::{RolloutJob, WorkerOutput, perturb, run_rollout, stream_seed};

use crate::action::ActionSequence;
use crate::env::{Env, VecEnv};
use crate::noise::NoiseFilter;
use crate::runtime::{LocalScheduler, Scheduler};
use crate::trajectory::ActionClip;

/// Everything a sampler needs for one batch. Read-only for the whole batch.
#[derive(Debug)]
pub struct SampleRequest<'a, S> {
    pub nominal: &'a ActionSequence,
    pub filter: &'a NoiseFilter,
    pub start: &'a S,
    pub clip: ActionClip,
    pub gamma: f64,
    /// Base of the per-candidate random streams. Candidate `i` draws from
    /// `stream_seed(stream, i)`, whichever worker runs it.
    pub stream: u64,
}

#[async_trait]
pub trait Sampler<S: Send + Sync>: Send {
    /// Number of rollouts each call attempts.
    fn batch_size(&self) -> usize;

    async fn sample(&mut self, request: SampleRequest<'_, S>) -> Result<RolloutBatch, SampleError>;
}

/// Splits a batch over `num_workers` private environment copies and runs them
/// on a [`Scheduler`], joining all workers before returning.
pub struct RolloutSampler<E, Sch = LocalScheduler> {
    envs: VecEnv<E>,
    paths_per_worker: usize,
    scheduler: Sch,
}

impl<E: Env + Clone> RolloutSampler<E, LocalScheduler> {
    pub fn new(prototype: &E, num_workers: usize, paths_per_worker: usize) -> Self {
        Self::with_scheduler(prototype, num_workers, paths_per_worker, LocalScheduler::new())
    }
}

impl<E: Env + Clone, Sch: Scheduler> RolloutSampler<E, Sch> {
    pub fn with_scheduler(prototype: &E, num_workers: usize, paths_per_worker: usize, scheduler: Sch) -> Self {
        Self {
            envs: VecEnv::replicate(prototype, num_workers),
            paths_per_worker,
            scheduler,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.envs.len()
    }

    pub fn paths_per_worker(&self) -> usize {
        self.paths_per_worker
    }
}

#[async_trait]
impl<E, Sch> Sampler<E::State> for RolloutSampler<E, Sch>
where
    E: Env + Clone + 'static,
    Sch: Scheduler,
{
    fn batch_size(&self) -> usize {
        self.envs.len() * self.paths_per_worker
    }

    async fn sample(&mut self, request: SampleRequest<'_, E::State>) -> Result<RolloutBatch, SampleError> {
        let requested = self.batch_size();
        if request.nominal.action_dim() != request.filter.action_dim() {
            return Err(SampleError::ActionDim {
                expected: request.filter.action_dim(),
                got: request.nominal.action_dim(),
            });
        }

        let nominal = Arc::new(request.nominal.clone());
        let filter = Arc::new(request.filter.clone());
        let handles: Vec<_> = (0..self.envs.len())
            .map(|worker| {
                let first = worker * self.paths_per_worker;
                let job = RolloutJob {
                    env: self.envs.checkout(worker),
                    start: request.start.clone(),
                    nominal: Arc::clone(&nominal),
                    filter: Arc::clone(&filter),
                    clip: request.clip,
                    gamma: request.gamma,
                    stream: request.stream,
                    indices: first..first + self.paths_per_worker,
                };
                self.scheduler.submit(job)
            })
            .collect();

        // Barrier: nothing is weighted until every worker has reported.
        let results = join_all(handles).await;

        let mut batch = RolloutBatch {
            requested,
            ..RolloutBatch::default()
        };
        let mut last_error = String::new();
        for (worker, result) in results.into_iter().enumerate() {
            match result {
                Ok(WorkerOutput { env, outcomes }) => {
                    if let Err(err) = self.envs.checkin(worker, env) {
                        warn!(worker, %err, "could not return worker environment");
                    }
                    for outcome in outcomes {
                        match outcome {
                            Ok(candidate) => batch.candidates.push(candidate),
                            Err(err) => {
                                debug!(worker, %err, "rollout discarded");
                                last_error = err.to_string();
                                batch.discarded += 1;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(worker, %err, "worker lost, discarding its rollouts");
                    last_error = err.to_string();
                    batch.discarded += self.paths_per_worker;
                }
            }
        }

        if batch.is_empty() {
            return Err(SampleError::Exhausted {
                requested,
                last_error,
            });
        }
        if batch.discarded > 0 {
            warn!(discarded = batch.discarded, requested, "some rollouts failed");
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, PointMass};

    async fn sample_once(num_workers: usize, paths: usize, stream: u64) -> RolloutBatch {
        let mut env = PointMass::default();
        env.reset(5).unwrap();
        let start = env.get_state();
        let mut sampler = RolloutSampler::new(&env, num_workers, paths);
        let nominal = ActionSequence::zeros(4, 2);
        let filter = NoiseFilter::from_legacy(2, 0.5, [0.25, 0.8, 0.0]).unwrap();
        sampler
            .sample(SampleRequest {
                nominal: &nominal,
                filter: &filter,
                start: &start,
                clip: ActionClip::new((-1.0, 1.0), 0.999),
                gamma: 1.0,
                stream,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn batch_has_every_requested_rollout() {
        let batch = sample_once(3, 2, 1).await;
        assert_eq!(batch.requested, 6);
        assert_eq!(batch.len(), 6);
        assert_eq!(batch.discarded, 0);
        let indices: Vec<_> = batch.candidates.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn worker_split_does_not_change_candidates() {
        let spread = sample_once(4, 1, 9).await;
        let packed = sample_once(1, 4, 9).await;
        assert_eq!(spread.candidates, packed.candidates);
    }

    #[tokio::test]
    async fn mismatched_filter_is_rejected() {
        let env = PointMass::default();
        let start = env.get_state();
        let mut sampler = RolloutSampler::new(&env, 1, 1);
        let nominal = ActionSequence::zeros(4, 2);
        let filter = NoiseFilter::white(vec![0.0], vec![1.0]).unwrap();
        let err = sampler
            .sample(SampleRequest {
                nominal: &nominal,
                filter: &filter,
                start: &start,
                clip: ActionClip::new((-1.0, 1.0), 0.999),
                gamma: 1.0,
                stream: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err, SampleError::ActionDim { expected: 1, got: 2 });
        assert_eq!(err.to_string(), "nominal plan has 2 action components, noise filter has 1");
    }
}
