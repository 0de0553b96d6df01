//! End-to-end behaviour of the MPPI controller: plan updates, termination,
//! determinism and replay.

use async_trait::async_trait;

use trajopt::action::ActionSequence;
use trajopt::env::{Env, Pendulum, PendulumState, PointMass, PointMassState, RenderMode};
use trajopt::optimizer::{DefaultAction, Mppi, OptimError, OptimizerConfig, Phase, importance_weights};
use trajopt::sampler::{Candidate, RolloutBatch, SampleError, SampleRequest, Sampler};
use trajopt::trajectory::TrajectoryRecord;
use trajopt::video::MemorySink;

// ============================================================================
// Helpers
// ============================================================================

/// Hands back the same three candidates on every call.
struct ScriptedSampler {
    candidates: Vec<Candidate>,
}

#[async_trait]
impl Sampler<PendulumState> for ScriptedSampler {
    fn batch_size(&self) -> usize {
        self.candidates.len()
    }

    async fn sample(&mut self, _request: SampleRequest<'_, PendulumState>) -> Result<RolloutBatch, SampleError> {
        Ok(RolloutBatch {
            requested: self.candidates.len(),
            candidates: self.candidates.clone(),
            discarded: 0,
        })
    }
}

fn column(values: &[f64]) -> ActionSequence {
    let rows: Vec<Vec<f64>> = values.iter().map(|v| vec![*v]).collect();
    ActionSequence::from_rows(&rows).unwrap()
}

fn scripted() -> Vec<Candidate> {
    vec![
        Candidate::scored(0, column(&[0.1, 0.2, 0.3, 0.4, 0.5]), 1.0),
        Candidate::scored(1, column(&[0.6, -0.2, 0.0, 0.1, -0.4]), 5.0),
        Candidate::scored(2, column(&[-0.3, 0.4, 0.2, -0.1, 0.9]), 2.0),
    ]
}

/// The κ = 1 blend of [`scripted`], worked out by hand.
fn expected_blend() -> Vec<f64> {
    let z = 1.0 + (-3.0f64).exp() + (-4.0f64).exp();
    let w = [(-4.0f64).exp() / z, 1.0 / z, (-3.0f64).exp() / z];
    let candidates = scripted();
    (0..5)
        .map(|k| {
            candidates
                .iter()
                .zip(w)
                .map(|(c, w)| w * c.actions.row(k)[0])
                .sum()
        })
        .collect()
}

fn scripted_mppi(default_action: DefaultAction) -> Mppi<Pendulum, ScriptedSampler> {
    let config = OptimizerConfig {
        horizon: 5,
        kappa: 1.0,
        default_action,
        max_steps: Some(10),
        ..OptimizerConfig::default()
    };
    Mppi::with_sampler(Pendulum::default(), config, ScriptedSampler { candidates: scripted() }).unwrap()
}

fn point_mass_config(num_workers: usize, paths_per_worker: usize) -> OptimizerConfig {
    OptimizerConfig {
        horizon: 8,
        num_workers,
        paths_per_worker,
        seed: 7,
        max_steps: Some(6),
        ..OptimizerConfig::default()
    }
}

async fn optimize(config: OptimizerConfig) -> TrajectoryRecord<PointMassState> {
    let mut agent = Mppi::new(PointMass::default(), config).unwrap();
    while agent.train_step(1).await.unwrap().is_some() {}
    agent.into_record()
}

// ============================================================================
// Plan updates
// ============================================================================

#[tokio::test]
async fn test_commits_first_action_of_weighted_blend() {
    let mut agent = scripted_mppi(DefaultAction::Mean);
    let blend = expected_blend();

    let report = agent.train_step(1).await.unwrap().unwrap();
    assert_eq!(report.step, 0);
    assert_eq!(report.best_return, 5.0);

    let committed = agent.record().solved_actions()[0][0];
    assert!((committed - blend[0]).abs() < 1e-12);

    let nominal: Vec<f64> = agent.nominal().rows().map(|r| r[0]).collect();
    for k in 0..4 {
        assert!((nominal[k] - blend[k + 1]).abs() < 1e-12, "row {k}");
    }
    assert_eq!(nominal[4], 0.0);
}

#[test]
fn test_scripted_weights_order_by_return() {
    let w = importance_weights(&[1.0, 5.0, 2.0], 1.0);
    assert!(w[1] > w[2] && w[2] > w[0]);
}

#[tokio::test]
async fn test_shift_fill_follows_default_action() {
    let blend = expected_blend();

    let mut repeat = scripted_mppi(DefaultAction::Repeat);
    repeat.train_step(1).await.unwrap();
    assert!((repeat.nominal().row(4)[0] - blend[4]).abs() < 1e-12);

    let mut fixed = scripted_mppi(DefaultAction::Fixed(vec![0.25]));
    fixed.train_step(1).await.unwrap();
    assert_eq!(fixed.nominal().row(4).to_vec(), vec![0.25]);
}

#[tokio::test]
async fn test_step_runs_configured_iterations() {
    let config = OptimizerConfig {
        num_iterations: 3,
        ..point_mass_config(2, 2)
    };
    let mut agent = Mppi::new(PointMass::default(), config.clone()).unwrap();
    let report = agent.step().await.unwrap().unwrap();
    assert_eq!(report.iterations, 3);

    // Same plan as asking for three iterations explicitly.
    let mut explicit = Mppi::new(PointMass::default(), config).unwrap();
    explicit.train_step(3).await.unwrap();
    assert_eq!(agent.nominal(), explicit.nominal());
    assert_eq!(agent.record().solved_actions(), explicit.record().solved_actions());
}

#[test]
fn test_fixed_default_action_must_match_action_dim() {
    let config = OptimizerConfig {
        default_action: DefaultAction::Fixed(vec![0.0, 0.0]),
        ..OptimizerConfig::default()
    };
    let err = Mppi::new(Pendulum::default(), config).err().unwrap();
    assert!(matches!(err, OptimError::Config(_)));
}

// ============================================================================
// Episode bookkeeping
// ============================================================================

#[tokio::test]
async fn test_record_stays_aligned_while_stepping() {
    let mut agent = Mppi::new(PointMass::default(), point_mass_config(2, 3)).unwrap();
    assert_eq!(agent.phase(), Phase::Initialized);
    for k in 1..=4 {
        agent.train_step(1).await.unwrap().unwrap();
        let record = agent.record();
        record.check_invariant().unwrap();
        assert_eq!(record.solved_states().len(), k + 1);
        assert_eq!(record.solved_observations().len(), k + 1);
        assert_eq!(record.solved_actions().len(), k);
        assert_eq!(record.solved_rewards().len(), k);
        assert_eq!(record.solved_infos().len(), k);
        assert_eq!(record.nominal().horizon(), 8);
    }
    assert_eq!(agent.phase(), Phase::Planning);
}

#[tokio::test]
async fn test_episode_ends_at_step_limit() {
    let config = OptimizerConfig {
        horizon: 4,
        num_workers: 2,
        paths_per_worker: 2,
        ..OptimizerConfig::default()
    };
    let mut agent = Mppi::new(Pendulum::default(), config).unwrap();
    let mut reports = Vec::new();
    while let Some(report) = agent.train_step(1).await.unwrap() {
        reports.push(report);
    }
    assert_eq!(reports.len(), 4);
    assert!(reports[3].done && !reports[2].done);
    assert!(agent.is_done());

    let before = agent.record().clone();
    assert!(agent.train_step(3).await.unwrap().is_none());
    assert_eq!(agent.record().num_steps(), before.num_steps());
    assert_eq!(agent.nominal(), before.nominal());
}

#[tokio::test]
async fn test_environment_done_ends_episode() {
    let config = OptimizerConfig {
        horizon: 6,
        num_workers: 1,
        paths_per_worker: 4,
        max_steps: Some(50),
        ..OptimizerConfig::default()
    };
    let mut agent = Mppi::new(Pendulum::new(3), config).unwrap();
    let mut steps = 0;
    while agent.train_step(1).await.unwrap().is_some() {
        steps += 1;
    }
    assert_eq!(steps, 3);
    assert_eq!(agent.phase(), Phase::Terminated);
}

// ============================================================================
// Determinism and replay
// ============================================================================

#[tokio::test]
async fn test_same_seed_same_trajectory() {
    let a = optimize(point_mass_config(4, 2)).await;
    let b = optimize(point_mass_config(4, 2)).await;
    assert_eq!(a.solved_actions(), b.solved_actions());
    assert_eq!(a.solved_states(), b.solved_states());
    assert_eq!(a.nominal(), b.nominal());
}

#[tokio::test]
async fn test_worker_split_does_not_change_trajectory() {
    let reference = optimize(point_mass_config(4, 2)).await;
    for (workers, paths) in [(1, 8), (2, 4), (8, 1)] {
        let other = optimize(point_mass_config(workers, paths)).await;
        assert_eq!(other.solved_actions(), reference.solved_actions(), "{workers}x{paths}");
    }
}

#[tokio::test]
async fn test_different_seed_different_trajectory() {
    let a = optimize(point_mass_config(2, 4)).await;
    let b = optimize(OptimizerConfig {
        seed: 8,
        ..point_mass_config(2, 4)
    })
    .await;
    assert_ne!(a.solved_actions(), b.solved_actions());
}

#[tokio::test]
async fn test_replay_reproduces_committed_steps() {
    let record = optimize(point_mass_config(2, 4)).await;
    let mut env = PointMass::default();

    let full = record.replay_from(0, &mut env, RenderMode::Off).unwrap();
    let rewards: Vec<f64> = full.iter().map(|t| t.reward).collect();
    assert_eq!(rewards, record.solved_rewards());
    for (t, transition) in full.iter().enumerate() {
        assert_eq!(transition.observation, record.solved_observations()[t + 1]);
    }

    let tail = record.replay_from(3, &mut env, RenderMode::Off).unwrap();
    assert_eq!(tail, full[3..].to_vec());

    let again = record.replay_from(0, &mut env, RenderMode::Off).unwrap();
    assert_eq!(again, full);
}

#[tokio::test]
async fn test_render_writes_one_frame_per_state() {
    let record = optimize(point_mass_config(2, 4)).await;
    let mut sink = MemorySink::new(30);
    record.render_result(&mut PointMass::default(), &mut sink).unwrap();
    assert!(sink.is_finished());
    assert_eq!(sink.frames.len(), record.num_steps() + 1);
}

// ============================================================================
// Control quality
// ============================================================================

#[tokio::test]
async fn test_point_mass_moves_towards_goal() {
    let config = OptimizerConfig {
        horizon: 15,
        num_workers: 4,
        paths_per_worker: 16,
        kappa: 20.0,
        seed: 3,
        max_steps: Some(40),
        ..OptimizerConfig::default()
    };
    let record = optimize(config).await;

    let distance = |s: &PointMassState| {
        let dx = s.position[0] - s.goal[0];
        let dy = s.position[1] - s.goal[1];
        (dx * dx + dy * dy).sqrt()
    };
    let states = record.solved_states();
    let initial = distance(&states[0]);
    let last = distance(&states[states.len() - 1]);
    assert_eq!(record.num_steps(), 40);
    assert!(last < 0.5 * initial + 0.05, "distance went from {initial} to {last}");
}

#[tokio::test]
async fn test_rollouts_leave_real_environment_alone() {
    let mut agent = Mppi::new(PointMass::default(), point_mass_config(2, 2)).unwrap();
    agent.train_step(1).await.unwrap();
    let record = agent.record();

    let mut env = PointMass::default();
    env.reset(record.seed()).unwrap();
    let transition = env.step(&record.solved_actions()[0], RenderMode::Off).unwrap();
    assert_eq!(env.get_state(), record.solved_states()[1]);
    assert_eq!(transition.reward, record.solved_rewards()[0]);
}
