// trajopt/src/env/mod.rs
mod errors;
pub mod pendulum;
pub mod point_mass;
mod traits;
mod types;
mod vec_env;

use serde::{Deserialize, Serialize};

pub use errors::EnvError;
pub use pendulum::{Pendulum, PendulumState};
pub use point_mass::{PointMass, PointMassState};
pub use traits::Env;
pub use types::{Frame, RenderMode, StepInfo, Transition};
pub use vec_env::VecEnv;

/// Environments selectable by name from a job configuration.
#[derive(Debug, Clone)]
pub enum AnyEnv {
    Pendulum(Pendulum),
    PointMass(PointMass),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "env")]
pub enum AnyState {
    Pendulum(PendulumState),
    PointMass(PointMassState),
}

/// Looks up an environment by its registry name.
pub fn make_env(name: &str, max_steps: usize) -> Result<AnyEnv, EnvError> {
    match name {
        "pendulum" => Ok(AnyEnv::Pendulum(Pendulum::new(max_steps))),
        "point_mass" => Ok(AnyEnv::PointMass(PointMass::new(max_steps))),
        other => Err(EnvError::Unknown(other.to_string())),
    }
}

impl Env for AnyEnv {
    type State = AnyState;

    fn observation_dim(&self) -> usize {
        match self {
            Self::Pendulum(e) => e.observation_dim(),
            Self::PointMass(e) => e.observation_dim(),
        }
    }

    fn action_dim(&self) -> usize {
        match self {
            Self::Pendulum(e) => e.action_dim(),
            Self::PointMass(e) => e.action_dim(),
        }
    }

    fn action_bounds(&self) -> (f64, f64) {
        match self {
            Self::Pendulum(e) => e.action_bounds(),
            Self::PointMass(e) => e.action_bounds(),
        }
    }

    fn reset(&mut self, seed: u64) -> Result<Vec<f64>, EnvError> {
        match self {
            Self::Pendulum(e) => e.reset(seed),
            Self::PointMass(e) => e.reset(seed),
        }
    }

    fn get_state(&self) -> Self::State {
        match self {
            Self::Pendulum(e) => AnyState::Pendulum(e.get_state()),
            Self::PointMass(e) => AnyState::PointMass(e.get_state()),
        }
    }

    fn set_state(&mut self, state: &Self::State) -> Result<(), EnvError> {
        match (self, state) {
            (Self::Pendulum(e), AnyState::Pendulum(s)) => e.set_state(s),
            (Self::PointMass(e), AnyState::PointMass(s)) => e.set_state(s),
            (_, s) => Err(EnvError::State(format!("snapshot {s:?} belongs to another environment"))),
        }
    }

    fn observe(&self) -> Vec<f64> {
        match self {
            Self::Pendulum(e) => e.observe(),
            Self::PointMass(e) => e.observe(),
        }
    }

    fn step(&mut self, action: &[f64], mode: RenderMode) -> Result<Transition, EnvError> {
        match self {
            Self::Pendulum(e) => e.step(action, mode),
            Self::PointMass(e) => e.step(action, mode),
        }
    }

    fn render_frame(&self) -> Result<Frame, EnvError> {
        match self {
            Self::Pendulum(e) => e.render_frame(),
            Self::PointMass(e) => e.render_frame(),
        }
    }
}
