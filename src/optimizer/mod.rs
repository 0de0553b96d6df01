//! The MPPI trajectory optimizer.
//!
//! Each control step samples perturbed plans around the current nominal
//! sequence, weights them by `exp(κ·return)`, blends them into a new nominal
//! sequence and finally commits its first action to the real environment.

mod config;
mod errors;
mod mppi;
mod weights;

pub use config::{DefaultAction, OptimizerConfig};
pub use errors::OptimError;
pub use mppi::{Mppi, Phase, StepReport};
pub use weights::{blend, importance_weights};
