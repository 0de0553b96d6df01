use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::batch::Candidate;
use crate::action::ActionSequence;
use crate::env::{Env, EnvError, RenderMode};
use crate::noise::NoiseFilter;
use crate::runtime::Task;
use crate::trajectory::ActionClip;

/// Mixes a base stream id with a sub-index (splitmix64 finaliser).
pub fn stream_seed(base: u64, index: u64) -> u64 {
    let mut z = base
        .wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// `nominal + noise`, clipped, drawn from the candidate's own stream.
pub fn perturb(
    nominal: &ActionSequence,
    filter: &NoiseFilter,
    clip: ActionClip,
    seed: u64,
) -> ActionSequence {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut actions = filter.sample_sequence(nominal.horizon(), &mut rng);
    let block = actions.as_array_mut();
    *block += nominal.as_array();
    block.mapv_inplace(|a| clip.clamp(a));
    actions
}

/// Executes `actions` from `start` and scores them.
///
/// Stepping stops early when the environment reports done; the remaining rows
/// stay in the plan but contribute nothing to the return.
pub fn run_rollout<E: Env>(
    env: &mut E,
    start: &E::State,
    index: usize,
    actions: ActionSequence,
    gamma: f64,
) -> Result<Candidate, EnvError> {
    env.set_state(start)?;
    let mut candidate = Candidate::scored(index, actions, 0.0);
    let mut discount = 1.0;
    for k in 0..candidate.actions.horizon() {
        let action = candidate.actions.row(k).to_vec();
        let transition = env.step(&action, RenderMode::Off)?;
        candidate.total_return += discount * transition.reward;
        candidate.rewards.push(transition.reward);
        candidate.observations.push(transition.observation);
        discount *= gamma;
        if transition.done {
            candidate.terminated_at = Some(k);
            break;
        }
    }
    Ok(candidate)
}

/// What one worker hands back: its environment and one outcome per assigned path.
pub struct WorkerOutput<E> {
    pub env: E,
    pub outcomes: Vec<Result<Candidate, EnvError>>,
}

/// The rollouts assigned to a single worker, run sequentially on its private
/// environment copy.
pub struct RolloutJob<E: Env> {
    pub env: E,
    pub start: E::State,
    pub nominal: Arc<ActionSequence>,
    pub filter: Arc<NoiseFilter>,
    pub clip: ActionClip,
    pub gamma: f64,
    pub stream: u64,
    pub indices: std::ops::Range<usize>,
}

impl<E: Env + 'static> Task for RolloutJob<E> {
    type Output = WorkerOutput<E>;

    fn call(self) -> Self::Output {
        let RolloutJob {
            mut env,
            start,
            nominal,
            filter,
            clip,
            gamma,
            stream,
            indices,
        } = self;
        let outcomes = indices
            .map(|index| {
                let actions = perturb(&nominal, &filter, clip, stream_seed(stream, index as u64));
                run_rollout(&mut env, &start, index, actions, gamma)
            })
            .collect();
        WorkerOutput { env, outcomes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{PointMass, PointMassState};

    fn start() -> PointMassState {
        PointMassState {
            position: [0.0, 0.0],
            velocity: [0.0, 0.0],
            goal: [0.5, -0.5],
            t: 0,
        }
    }

    #[test]
    fn stream_seeds_differ_per_index() {
        let a = stream_seed(42, 0);
        let b = stream_seed(42, 1);
        let c = stream_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, stream_seed(42, 0));
    }

    #[test]
    fn perturbation_is_clipped_and_reproducible() {
        let nominal = ActionSequence::zeros(5, 2);
        let filter = NoiseFilter::white(vec![0.0; 2], vec![5.0; 2]).unwrap();
        let clip = ActionClip::new((-1.0, 1.0), 0.999);
        let a = perturb(&nominal, &filter, clip, 7);
        assert_eq!(a, perturb(&nominal, &filter, clip, 7));
        assert!(a.as_array().iter().all(|x| x.abs() <= 0.999));
    }

    #[test]
    fn discounted_return() {
        let mut env = PointMass::default();
        let actions = ActionSequence::zeros(3, 2);
        let candidate = run_rollout(&mut env, &start(), 0, actions, 0.5).unwrap();
        let r = &candidate.rewards;
        assert_eq!(r.len(), 3);
        let expected = r[0] + 0.5 * r[1] + 0.25 * r[2];
        assert!((candidate.total_return - expected).abs() < 1e-12);
    }

    #[test]
    fn rollout_stops_at_done() {
        let mut env = PointMass::new(2);
        let actions = ActionSequence::zeros(5, 2);
        let candidate = run_rollout(&mut env, &start(), 3, actions, 1.0).unwrap();
        assert_eq!(candidate.terminated_at, Some(1));
        assert_eq!(candidate.rewards.len(), 2);
        assert_eq!(candidate.actions.horizon(), 5);
        assert_eq!(candidate.index, 3);
    }
}
