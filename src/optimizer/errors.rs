use thiserror::Error;

use crate::env::EnvError;
use crate::noise::NoiseError;
use crate::sampler::SampleError;
use crate::trajectory::TrajectoryError;

#[derive(Error, Debug)]
pub enum OptimError {
    #[error("invalid optimizer configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Noise(#[from] NoiseError),

    #[error(transparent)]
    Environment(#[from] EnvError),

    /// No rollout in an iteration survived. Nothing was committed.
    #[error("sampling exhausted: all {requested} rollouts failed (last error: {last_error})")]
    SamplingExhausted { requested: usize, last_error: String },

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

impl From<SampleError> for OptimError {
    fn from(err: SampleError) -> Self {
        match err {
            SampleError::Exhausted {
                requested,
                last_error,
            } => OptimError::SamplingExhausted {
                requested,
                last_error,
            },
            mismatch @ SampleError::ActionDim { .. } => OptimError::Config(mismatch.to_string()),
        }
    }
}
