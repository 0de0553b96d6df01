use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Every rollout in the batch failed.
    #[error("all {requested} rollouts failed (last error: {last_error})")]
    Exhausted { requested: usize, last_error: String },

    /// The nominal plan and the noise filter disagree on the action width.
    #[error("nominal plan has {got} action components, noise filter has {expected}")]
    ActionDim { expected: usize, got: usize },
}
