// trajopt/src/train.rs
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::JobConfig;
use crate::env::{AnyState, EnvError, make_env};
use crate::optimizer::{Mppi, OptimError};
use crate::persist::{PersistError, TrajectoryStore};
use crate::trajectory::{TrajectoryError, TrajectoryRecord};
use crate::video::{RenderError, Y4mWriter};

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error("trajectory {index}: {source}")]
    Optimizer {
        index: usize,
        #[source]
        source: OptimError,
    },

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("cannot create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySummary {
    pub seed: u64,
    pub steps: usize,
    pub total_reward: f64,
    pub solved: bool,
    pub video: Option<PathBuf>,
}

#[derive(Debug)]
pub struct JobStats {
    pub trajectories: Vec<TrajectorySummary>,
    pub total_steps: usize,
    pub elapsed: Duration,
}

impl JobStats {
    pub fn solved(&self) -> usize {
        self.trajectories.iter().filter(|t| t.solved).count()
    }
}

/// Optimizes `cfg.num_traj` trajectories one after another, appending each
/// finished record to `cfg.output`.
///
/// A record is persisted as soon as its episode ends, so an error part way
/// through keeps every trajectory finished before it.
pub async fn run_job(cfg: &JobConfig) -> Result<JobStats, JobError> {
    let started = Instant::now();
    let mut store = TrajectoryStore::create(&cfg.output)?;
    if cfg.visualize {
        create_dir(&cfg.video_dir)?;
    }

    let mut stats = JobStats {
        trajectories: Vec::with_capacity(cfg.num_traj),
        total_steps: 0,
        elapsed: Duration::ZERO,
    };

    for index in 0..cfg.num_traj {
        let optimizer = cfg.optimizer_for(index);
        let seed = optimizer.seed;
        let env = make_env(&cfg.env_name, cfg.env_max_steps)?;
        let mut agent = Mppi::new(env, optimizer).map_err(|source| JobError::Optimizer { index, source })?;
        info!(trajectory = index, seed, env = %cfg.env_name, "optimizing trajectory");

        for _ in 0..cfg.total_steps {
            agent
                .step()
                .await
                .map_err(|source| JobError::Optimizer { index, source })?;
            if agent.is_done() {
                break;
            }
        }

        let record = agent.into_record();
        store.append(&record)?;

        let video = if cfg.visualize {
            let path = cfg.video_dir.join(format!("traj{index}.y4m"));
            render_to_file(&record, &cfg.env_name, cfg.env_max_steps, &path, cfg.fps)?;
            Some(path)
        } else {
            None
        };

        let summary = TrajectorySummary {
            seed,
            steps: record.num_steps(),
            total_reward: record.total_reward(),
            solved: record.any_solved(),
            video,
        };
        info!(
            trajectory = index,
            steps = summary.steps,
            total_reward = summary.total_reward,
            solved = summary.solved,
            "trajectory finished"
        );
        stats.total_steps += summary.steps;
        stats.trajectories.push(summary);
    }

    stats.elapsed = started.elapsed();
    info!(
        trajectories = stats.trajectories.len(),
        solved = stats.solved(),
        output = %store.path().display(),
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "job complete"
    );
    Ok(stats)
}

/// Replays `record` in a fresh `env_name` environment and writes it as a Y4M
/// video at `path`. Returns whether the replay reached a solved state.
pub fn render_to_file(
    record: &TrajectoryRecord<AnyState>,
    env_name: &str,
    env_max_steps: usize,
    path: &Path,
    fps: u32,
) -> Result<bool, JobError> {
    let mut env = make_env(env_name, env_max_steps)?;
    let mut writer = Y4mWriter::create(path, fps)?;
    let solved = record.render_result(&mut env, &mut writer)?;
    info!(path = %writer.path().display(), frames = writer.frames_written(), solved, "video written");
    Ok(solved)
}

/// Renders every record stored in `files`, `repeat` times each, into
/// `out_dir`. Records are numbered in file order across all of `files`, so
/// `traj{n}_pass{p}.y4m` names are unique for the whole call. Returns the
/// paths written.
pub fn render_store(
    files: &[PathBuf],
    repeat: usize,
    out_dir: &Path,
    env_name: &str,
    env_max_steps: usize,
    fps: u32,
) -> Result<Vec<PathBuf>, JobError> {
    let mut records: Vec<TrajectoryRecord<AnyState>> = Vec::new();
    for file in files {
        let loaded: Vec<TrajectoryRecord<AnyState>> = TrajectoryStore::load(file)?;
        if loaded.is_empty() {
            warn!(file = %file.display(), "no trajectories to render");
        }
        records.extend(loaded);
    }
    create_dir(out_dir)?;

    let mut written = Vec::with_capacity(records.len() * repeat);
    for pass in 0..repeat {
        for (index, record) in records.iter().enumerate() {
            let path = out_dir.join(format!("traj{index}_pass{pass}.y4m"));
            render_to_file(record, env_name, env_max_steps, &path, fps)?;
            written.push(path);
        }
    }
    Ok(written)
}

fn create_dir(path: &Path) -> Result<(), JobError> {
    std::fs::create_dir_all(path).map_err(|source| JobError::Io {
        path: path.to_path_buf(),
        source,
    })
}
