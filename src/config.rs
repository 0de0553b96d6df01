use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimizer::OptimizerConfig;

/// Seed offset between consecutive trajectories of one job.
pub const SEED_STRIDE: u64 = 12345;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Complete configuration of an optimization job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Registry name passed to [`crate::env::make_env`].
    pub env_name: String,
    /// The environment's own time limit.
    pub env_max_steps: usize,
    /// Number of independent trajectories to optimize.
    pub num_traj: usize,
    /// Control steps per trajectory.
    pub total_steps: usize,
    /// Optimizer iterations per control step.
    pub num_iter: usize,
    /// Render every trajectory after it is optimized.
    pub visualize: bool,
    pub output: PathBuf,
    pub video_dir: PathBuf,
    pub fps: u32,
    pub optimizer: OptimizerConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            env_name: "pendulum".to_string(),
            env_max_steps: 200,
            num_traj: 1,
            total_steps: 100,
            num_iter: 1,
            visualize: false,
            output: PathBuf::from("trajectories.jsonl"),
            video_dir: PathBuf::from("vids"),
            fps: 30,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl JobConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn trajectory_seed(&self, index: usize) -> u64 {
        self.optimizer
            .seed
            .wrapping_add((index as u64).wrapping_mul(SEED_STRIDE))
    }

    /// The optimizer settings for trajectory `index`: its own seed, and an
    /// episode limit of `total_steps`.
    pub fn optimizer_for(&self, index: usize) -> OptimizerConfig {
        OptimizerConfig {
            seed: self.trajectory_seed(index),
            max_steps: Some(self.total_steps),
            num_iterations: self.num_iter,
            ..self.optimizer.clone()
        }
    }
}
