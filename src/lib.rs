//! Sampling-based trajectory optimization (MPPI) over seeded, snapshot-able
//! environments.
//!
//! A [`Mppi`] controller owns one real environment and a pool of private
//! copies. Each control step perturbs the nominal action plan with
//! autoregressive noise, rolls the candidates out in parallel from the last
//! committed state, blends them by exponentiated return and commits the first
//! action of the blended plan.

pub mod action;
pub mod config;
pub mod env;
pub mod noise;
pub mod optimizer;
pub mod persist;
pub mod runtime;
pub mod sampler;
pub mod train;
pub mod trajectory;
pub mod video;

pub use action::ActionSequence;
pub use config::JobConfig;
pub use env::{Env, make_env};
pub use noise::{NoiseConfig, NoiseFilter};
pub use optimizer::{DefaultAction, Mppi, OptimError, OptimizerConfig, StepReport};
pub use persist::TrajectoryStore;
pub use trajectory::TrajectoryRecord;
