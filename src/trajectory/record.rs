use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::TrajectoryError;
use super::types::{ActionClip, Path};
use crate::action::ActionSequence;
use crate::env::{Env, RenderMode, StepInfo, Transition};
use crate::video::VideoSink;

/// One episode's committed history plus the plan still being refined.
///
/// `solved_states[0]` is the reset state; every [`commit_step`] appends one
/// entry to each aligned sequence, so at all times
/// `states == observations == actions + 1 == rewards + 1 == infos + 1`.
///
/// [`commit_step`]: TrajectoryRecord::commit_step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryRecord<S> {
    id: Uuid,
    seed: u64,
    horizon: usize,
    observation_dim: usize,
    action_dim: usize,
    clip: ActionClip,
    solved_states: Vec<S>,
    solved_observations: Vec<Vec<f64>>,
    solved_actions: Vec<Vec<f64>>,
    solved_rewards: Vec<f64>,
    solved_infos: Vec<StepInfo>,
    nominal: ActionSequence,
}

impl<S> TrajectoryRecord<S> {
    /// Resets `env` with `seed` and captures the initial state and observation.
    pub fn initialize<E>(env: &mut E, horizon: usize, seed: u64, clip: ActionClip) -> Result<Self, TrajectoryError>
    where
        E: Env<State = S>,
    {
        let observation = env.reset(seed)?;
        let action_dim = env.action_dim();
        Ok(Self {
            id: Uuid::new_v4(),
            seed,
            horizon,
            observation_dim: env.observation_dim(),
            action_dim,
            clip,
            solved_states: vec![env.get_state()],
            solved_observations: vec![observation],
            solved_actions: Vec::new(),
            solved_rewards: Vec::new(),
            solved_infos: Vec::new(),
            nominal: ActionSequence::zeros(horizon, action_dim),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn observation_dim(&self) -> usize {
        self.observation_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn clip(&self) -> ActionClip {
        self.clip
    }

    pub fn solved_states(&self) -> &[S] {
        &self.solved_states
    }

    pub fn solved_observations(&self) -> &[Vec<f64>] {
        &self.solved_observations
    }

    pub fn solved_actions(&self) -> &[Vec<f64>] {
        &self.solved_actions
    }

    pub fn solved_rewards(&self) -> &[f64] {
        &self.solved_rewards
    }

    pub fn solved_infos(&self) -> &[StepInfo] {
        &self.solved_infos
    }

    /// The most recent committed state; rollouts start here.
    pub fn current_state(&self) -> Option<&S> {
        self.solved_states.last()
    }

    pub fn nominal(&self) -> &ActionSequence {
        &self.nominal
    }

    /// Replaces the nominal plan. The shape must not change.
    pub fn set_nominal(&mut self, nominal: ActionSequence) -> Result<(), TrajectoryError> {
        if !nominal.same_shape(&self.nominal) {
            return Err(TrajectoryError::InvariantViolation(format!(
                "nominal sequence is {}x{}, record holds {}x{}",
                nominal.horizon(),
                nominal.action_dim(),
                self.nominal.horizon(),
                self.nominal.action_dim()
            )));
        }
        self.nominal = nominal;
        Ok(())
    }

    pub(crate) fn nominal_mut(&mut self) -> &mut ActionSequence {
        &mut self.nominal
    }

    pub fn num_steps(&self) -> usize {
        self.solved_actions.len()
    }

    pub fn total_reward(&self) -> f64 {
        self.solved_rewards.iter().sum()
    }

    pub fn any_solved(&self) -> bool {
        self.solved_infos.iter().any(|i| i.solved)
    }

    pub fn check_invariant(&self) -> Result<(), TrajectoryError> {
        let states = self.solved_states.len();
        let aligned = states > 0
            && self.solved_observations.len() == states
            && self.solved_actions.len() + 1 == states
            && self.solved_rewards.len() + 1 == states
            && self.solved_infos.len() + 1 == states;
        if aligned {
            Ok(())
        } else {
            Err(TrajectoryError::InvariantViolation(format!(
                "states={states} observations={} actions={} rewards={} infos={}",
                self.solved_observations.len(),
                self.solved_actions.len(),
                self.solved_rewards.len(),
                self.solved_infos.len()
            )))
        }
    }

    /// Appends one committed control step to every aligned sequence.
    pub fn commit_step(
        &mut self,
        action: Vec<f64>,
        next_state: S,
        next_observation: Vec<f64>,
        reward: f64,
        info: StepInfo,
    ) -> Result<(), TrajectoryError> {
        self.check_invariant()?;
        if action.len() != self.action_dim {
            return Err(TrajectoryError::InvariantViolation(format!(
                "committed action has {} components, record expects {}",
                action.len(),
                self.action_dim
            )));
        }
        self.solved_actions.push(action);
        self.solved_states.push(next_state);
        self.solved_observations.push(next_observation);
        self.solved_rewards.push(reward);
        self.solved_infos.push(info);
        Ok(())
    }

    /// Drives `env` from `solved_states[t]` through the committed actions
    /// `solved_actions[t..]`. The record itself is left untouched.
    pub fn replay_from<E>(&self, t: usize, env: &mut E, mode: RenderMode) -> Result<Vec<Transition>, TrajectoryError>
    where
        E: Env<State = S>,
    {
        self.restore(t, env)?;
        self.solved_actions[t..]
            .iter()
            .map(|action| {
                env.step(&self.clip.clipped(action), mode)
                    .map_err(TrajectoryError::from)
            })
            .collect()
    }

    /// Replays the whole trajectory with rendering on, writing the initial
    /// frame and one frame after every step into `sink`.
    ///
    /// Steps run in [`RenderMode::Frames`]; an environment that attaches no
    /// frame to its transition is asked for one with `render_frame`.
    /// Returns whether any step reported the environment's solved flag. The
    /// sink is only finished when every frame was written.
    pub fn render_result<E, V>(&self, env: &mut E, sink: &mut V) -> Result<bool, TrajectoryError>
    where
        E: Env<State = S>,
        V: VideoSink + ?Sized,
    {
        self.restore(0, env)?;
        sink.push_frame(&env.render_frame()?)?;
        let mut solved = false;
        for action in &self.solved_actions {
            let transition = env.step(&self.clip.clipped(action), RenderMode::Frames)?;
            solved |= transition.info.solved;
            match transition.frame {
                Some(frame) => sink.push_frame(&frame)?,
                None => sink.push_frame(&env.render_frame()?)?,
            }
        }
        sink.finish()?;
        Ok(solved)
    }

    /// Replays from the start and collects everything the environment reports.
    pub fn gather_path<E>(&self, env: &mut E) -> Result<Path, TrajectoryError>
    where
        E: Env<State = S>,
    {
        let mut path = Path {
            actions: self.solved_actions.iter().map(|a| self.clip.clipped(a)).collect(),
            ..Path::default()
        };
        for transition in self.replay_from(0, env, RenderMode::Off)? {
            path.terminated = transition.done;
            path.observations.push(transition.observation);
            path.rewards.push(transition.reward);
            path.infos.push(transition.info);
        }
        Ok(path)
    }

    fn restore<E>(&self, t: usize, env: &mut E) -> Result<(), TrajectoryError>
    where
        E: Env<State = S>,
    {
        self.check_invariant()?;
        let last = self.solved_states.len() - 1;
        if t > last {
            return Err(TrajectoryError::ReplayIndex { t, last });
        }
        env.reset(self.seed)?;
        env.set_state(&self.solved_states[t])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Pendulum, PendulumState};
    use crate::video::MemorySink;

    fn record_with_steps(env: &mut Pendulum, steps: usize) -> TrajectoryRecord<PendulumState> {
        let clip = ActionClip::new(env.action_bounds(), 0.999);
        let mut record = TrajectoryRecord::initialize(env, 4, 9, clip).unwrap();
        for k in 0..steps {
            let action = clip.clipped(&[if k % 2 == 0 { 1.5 } else { -0.3 }]);
            let tr = env.step(&action, RenderMode::Off).unwrap();
            record
                .commit_step(action, env.get_state(), tr.observation, tr.reward, tr.info)
                .unwrap();
        }
        record
    }

    #[test]
    fn initialize_captures_reset_state() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 0);
        assert_eq!(record.solved_states().len(), 1);
        assert_eq!(record.solved_observations().len(), 1);
        assert_eq!(record.nominal().horizon(), 4);
        assert!(record.nominal().as_array().iter().all(|a| *a == 0.0));
        record.check_invariant().unwrap();
    }

    #[test]
    fn commits_keep_sequences_aligned() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 5);
        assert_eq!(record.solved_states().len(), 6);
        assert_eq!(record.solved_actions().len(), 5);
        assert_eq!(record.solved_rewards().len(), 5);
        assert_eq!(record.solved_actions()[0], vec![0.999]);
        record.check_invariant().unwrap();
    }

    #[test]
    fn replay_is_repeatable_and_matches_history() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 6);
        let mut other = Pendulum::default();
        let first = record.replay_from(0, &mut other, RenderMode::Off).unwrap();
        let second = record.replay_from(0, &mut other, RenderMode::Off).unwrap();
        assert_eq!(first, second);
        let rewards: Vec<f64> = first.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, record.solved_rewards());
        assert_eq!(other.get_state(), *record.current_state().unwrap());
    }

    #[test]
    fn replay_from_midpoint_covers_the_tail() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 6);
        let tail = record.replay_from(4, &mut env, RenderMode::Off).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].observation, record.solved_observations()[6]);
        assert!(matches!(
            record.replay_from(7, &mut env, RenderMode::Off),
            Err(TrajectoryError::ReplayIndex { t: 7, last: 6 })
        ));
    }

    #[test]
    fn render_writes_one_frame_per_state() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 3);
        let mut sink = MemorySink::new(30);
        let solved = record.render_result(&mut env, &mut sink).unwrap();
        assert!(!solved);
        assert_eq!(sink.frames.len(), 4);
        assert!(sink.is_finished());

        // Frames attached by the steps match a fresh render of each state.
        for (frame, state) in sink.frames.iter().zip(record.solved_states()) {
            env.set_state(state).unwrap();
            assert_eq!(*frame, env.render_frame().unwrap());
        }
    }

    #[test]
    fn gather_path_mirrors_record() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 3);
        let path = record.gather_path(&mut env).unwrap();
        assert_eq!(path.actions, record.solved_actions());
        assert_eq!(path.total_reward(), record.total_reward());
        assert!(!path.terminated);
    }

    #[test]
    fn misaligned_record_refuses_commits() {
        let mut env = Pendulum::default();
        let record = record_with_steps(&mut env, 2);
        let mut value = serde_json::to_value(&record).unwrap();
        value["solved_rewards"] = serde_json::json!([]);
        let mut broken: TrajectoryRecord<PendulumState> = serde_json::from_value(value).unwrap();
        let err = broken
            .commit_step(vec![0.0], env.get_state(), env.observe(), 0.0, StepInfo::default())
            .unwrap_err();
        assert!(matches!(err, TrajectoryError::InvariantViolation(_)));
    }

    #[test]
    fn wrong_action_width_is_an_invariant_violation() {
        let mut env = Pendulum::default();
        let mut record = record_with_steps(&mut env, 0);
        let err = record
            .commit_step(vec![0.0, 1.0], env.get_state(), env.observe(), 0.0, StepInfo::default())
            .unwrap_err();
        assert!(matches!(err, TrajectoryError::InvariantViolation(_)));
        assert_eq!(record.num_steps(), 0);
    }
}
