use serde::{Deserialize, Serialize};

use crate::env::StepInfo;

/// The symmetric shrink applied to every action before it reaches the
/// environment, during optimization and replay alike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionClip {
    pub lo: f64,
    pub hi: f64,
}

impl ActionClip {
    /// Shrinks `bounds` about their midpoint by `scale` (0.999 keeps actuators
    /// just short of saturation).
    pub fn new(bounds: (f64, f64), scale: f64) -> Self {
        let (lo, hi) = bounds;
        let mid = 0.5 * (lo + hi);
        let half = 0.5 * (hi - lo) * scale.clamp(0.0, 1.0);
        Self {
            lo: mid - half,
            hi: mid + half,
        }
    }

    pub fn clamp(&self, a: f64) -> f64 {
        a.clamp(self.lo, self.hi)
    }

    /// Clipped copy of one action, from a slice or an `ndarray` row.
    pub fn clipped<'a>(&self, action: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
        action.into_iter().map(|a| self.clamp(*a)).collect()
    }
}

/// A replayed episode, step-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub observations: Vec<Vec<f64>>,
    pub actions: Vec<Vec<f64>>,
    pub rewards: Vec<f64>,
    pub infos: Vec<StepInfo>,
    pub terminated: bool,
}

impl Path {
    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    pub fn solved(&self) -> bool {
        self.infos.iter().any(|i| i.solved)
    }
}
