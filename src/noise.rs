//! Time-correlated exploration noise.
//!
//! Perturbations follow an AR(p) recursion over the horizon:
//!
//! ```text
//! eps_0 = w_0
//! eps_k = β0·w_k + β1·eps_{k-1} + ... + βp·eps_{k-p}      (k ≥ 1)
//! w_k  ~ N(mean, sigma)  independently per step and component
//! ```
//!
//! Taps that would reach before step 0 are skipped.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::ActionSequence;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoiseError {
    #[error("{field} has {got} components, expected 1 or {expected}")]
    Dimension {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("sigma must be finite and non-negative, got {0}")]
    Sigma(f64),

    #[error("filter needs at least one coefficient")]
    NoCoefficients,

    #[error("filter coefficient {index} is not finite")]
    Coefficient { index: usize },
}

/// Serializable filter parameters as they appear in a job configuration.
///
/// `mean` and `sigma` may hold a single value that is broadcast to every
/// action component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub mean: Vec<f64>,
    pub sigma: Vec<f64>,
    pub coefficients: Vec<f64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            mean: vec![0.0],
            sigma: vec![1.0],
            coefficients: vec![0.25, 0.8, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFilter {
    mean: Vec<f64>,
    sigma: Vec<f64>,
    coefficients: Vec<f64>,
}

impl NoiseFilter {
    /// `coefficients[0]` scales the fresh draw; `coefficients[j]` for `j ≥ 1`
    /// scales the perturbation `j` steps back. An all-zero tuple is read as
    /// "no colouring" and becomes the identity filter.
    pub fn new(mean: Vec<f64>, sigma: Vec<f64>, coefficients: Vec<f64>) -> Result<Self, NoiseError> {
        if mean.len() != sigma.len() {
            return Err(NoiseError::Dimension {
                field: "sigma",
                expected: mean.len(),
                got: sigma.len(),
            });
        }
        if let Some(&bad) = sigma.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(NoiseError::Sigma(bad));
        }
        if coefficients.is_empty() {
            return Err(NoiseError::NoCoefficients);
        }
        if let Some(index) = coefficients.iter().position(|c| !c.is_finite()) {
            return Err(NoiseError::Coefficient { index });
        }
        let coefficients = if coefficients.iter().all(|&c| c == 0.0) {
            vec![1.0]
        } else {
            coefficients
        };
        Ok(Self {
            mean,
            sigma,
            coefficients,
        })
    }

    /// Independent per-step noise.
    pub fn white(mean: Vec<f64>, sigma: Vec<f64>) -> Result<Self, NoiseError> {
        Self::new(mean, sigma, vec![1.0])
    }

    /// The job-script layout: one shared sigma and the taps `[β0, β1, β2]`.
    pub fn from_legacy(action_dim: usize, sigma: f64, betas: [f64; 3]) -> Result<Self, NoiseError> {
        Self::new(vec![0.0; action_dim], vec![sigma; action_dim], betas.to_vec())
    }

    pub fn from_config(config: &NoiseConfig, action_dim: usize) -> Result<Self, NoiseError> {
        let mean = broadcast("mean", &config.mean, action_dim)?;
        let sigma = broadcast("sigma", &config.sigma, action_dim)?;
        Self::new(mean, sigma, config.coefficients.clone())
    }

    pub fn action_dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of past perturbations each step depends on.
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn sample_sequence<R: Rng + ?Sized>(&self, horizon: usize, rng: &mut R) -> ActionSequence {
        let dim = self.action_dim();
        let mut eps = Array2::<f64>::zeros((horizon, dim));
        for k in 0..horizon {
            let white = Array1::from_shape_fn(dim, |i| {
                let z: f64 = rng.sample(StandardNormal);
                self.mean[i] + self.sigma[i] * z
            });
            let mut row = if k == 0 { white } else { white * self.coefficients[0] };
            for (j, beta) in self.coefficients.iter().enumerate().skip(1).take(k) {
                row.scaled_add(*beta, &eps.row(k - j));
            }
            eps.row_mut(k).assign(&row);
        }
        ActionSequence::from_array(eps)
    }
}

fn broadcast(field: &'static str, values: &[f64], dim: usize) -> Result<Vec<f64>, NoiseError> {
    match values.len() {
        1 => Ok(vec![values[0]; dim]),
        n if n == dim => Ok(values.to_vec()),
        got => Err(NoiseError::Dimension {
            field,
            expected: dim,
            got,
        }),
    }
}
