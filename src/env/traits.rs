use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::env::errors::EnvError;
use crate::env::types::{Frame, RenderMode, Transition};

/// The capability interface every simulated environment exposes to the optimizer.
///
/// Implementations must be deterministic: resetting with the same seed, or
/// restoring the same `State`, followed by the same actions must reproduce the
/// same transitions bit for bit. Rollouts and replay both depend on it.
///
/// `State` is treated as an opaque snapshot. The optimizer never inspects it;
/// it only clones it, hands it back through [`Env::set_state`] and persists it.
pub trait Env: Send {
    type State: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn observation_dim(&self) -> usize;
    fn action_dim(&self) -> usize;

    /// Inclusive per-component range accepted by [`Env::step`].
    fn action_bounds(&self) -> (f64, f64) {
        (-1.0, 1.0)
    }

    fn reset(&mut self, seed: u64) -> Result<Vec<f64>, EnvError>;
    fn get_state(&self) -> Self::State;
    fn set_state(&mut self, state: &Self::State) -> Result<(), EnvError>;
    fn observe(&self) -> Vec<f64>;
    fn step(&mut self, action: &[f64], mode: RenderMode) -> Result<Transition, EnvError>;
    fn render_frame(&self) -> Result<Frame, EnvError>;
}
