use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("step failed at t={step}: {reason}")]
    Step { step: usize, reason: String },

    #[error("action has {got} components, environment expects {expected}")]
    ActionDim { expected: usize, got: usize },

    #[error("state restore failed: {0}")]
    State(String),

    #[error("unknown environment: {0}")]
    Unknown(String),

    #[error("Environment error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
