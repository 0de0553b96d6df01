use serde::{Deserialize, Serialize};

use super::errors::OptimError;
use crate::noise::NoiseConfig;

/// What fills the last slot of the plan after it shifts forward.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAction {
    /// The noise filter's mean.
    #[default]
    Mean,
    /// A copy of the previous last action.
    Repeat,
    Fixed(Vec<f64>),
}

/// Immutable per-run optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Planning horizon H.
    pub horizon: usize,
    pub paths_per_worker: usize,
    pub num_workers: usize,
    /// Temperature κ. `f64::INFINITY` selects the best candidate outright.
    pub kappa: f64,
    /// Discount γ applied inside each rollout.
    pub gamma: f64,
    pub default_action: DefaultAction,
    pub seed: u64,
    pub noise: NoiseConfig,
    /// Iterations per control step when the caller does not say otherwise.
    pub num_iterations: usize,
    /// Committed steps after which the episode ends. Defaults to `horizon`.
    pub max_steps: Option<usize>,
    /// Fraction of the action range actions are clipped to.
    pub action_clip: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            horizon: 16,
            paths_per_worker: 8,
            num_workers: 4,
            kappa: 5.0,
            gamma: 1.0,
            default_action: DefaultAction::Mean,
            seed: 123,
            noise: NoiseConfig::default(),
            num_iterations: 1,
            max_steps: None,
            action_clip: 0.999,
        }
    }
}

impl OptimizerConfig {
    pub fn batch_size(&self) -> usize {
        self.paths_per_worker * self.num_workers
    }

    pub fn episode_limit(&self) -> usize {
        self.max_steps.unwrap_or(self.horizon)
    }

    pub fn validate(&self) -> Result<(), OptimError> {
        let fail = |msg: String| Err(OptimError::Config(msg));
        if self.horizon == 0 {
            return fail("horizon must be at least 1".into());
        }
        if self.num_workers == 0 || self.paths_per_worker == 0 {
            return fail(format!(
                "need at least one rollout per batch, got {} workers x {} paths",
                self.num_workers, self.paths_per_worker
            ));
        }
        if self.kappa.is_nan() || self.kappa < 0.0 {
            return fail(format!("kappa must be >= 0, got {}", self.kappa));
        }
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return fail(format!("gamma must be finite and >= 0, got {}", self.gamma));
        }
        if !(self.action_clip > 0.0 && self.action_clip <= 1.0) {
            return fail(format!("action_clip must be in (0, 1], got {}", self.action_clip));
        }
        if self.episode_limit() == 0 {
            return fail("max_steps must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OptimizerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size(), 32);
        assert_eq!(config.episode_limit(), 16);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"horizon": 8, "default_action": "repeat", "max_steps": 50}"#).unwrap();
        assert_eq!(config.horizon, 8);
        assert_eq!(config.default_action, DefaultAction::Repeat);
        assert_eq!(config.episode_limit(), 50);
        assert_eq!(config.kappa, 5.0);
    }

    #[test]
    fn fixed_default_action_parses() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"default_action": {"fixed": [0.1, -0.1]}}"#).unwrap();
        assert_eq!(config.default_action, DefaultAction::Fixed(vec![0.1, -0.1]));
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            OptimizerConfig { horizon: 0, ..Default::default() },
            OptimizerConfig { num_workers: 0, ..Default::default() },
            OptimizerConfig { kappa: -1.0, ..Default::default() },
            OptimizerConfig { kappa: f64::NAN, ..Default::default() },
            OptimizerConfig { action_clip: 1.5, ..Default::default() },
            OptimizerConfig { max_steps: Some(0), ..Default::default() },
        ] {
            assert!(matches!(bad.validate(), Err(OptimError::Config(_))), "{bad:?}");
        }
        let greedy = OptimizerConfig { kappa: f64::INFINITY, ..Default::default() };
        greedy.validate().unwrap();
    }
}
