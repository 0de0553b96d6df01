use thiserror::Error;

use crate::env::EnvError;
use crate::video::RenderError;

#[derive(Error, Debug)]
pub enum TrajectoryError {
    /// The record's aligned sequences disagree. Never expected in correct use.
    #[error("trajectory invariant violated: {0}")]
    InvariantViolation(String),

    #[error("replay index {t} is past the last solved state ({last})")]
    ReplayIndex { t: usize, last: usize },

    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
