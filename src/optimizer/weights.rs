//! Path-integral weighting of rollout returns.

use crate::action::ActionSequence;
use crate::sampler::Candidate;

/// `w_i = exp(κ(R_i − R_max)) / Σ_j exp(κ(R_j − R_max))`.
///
/// NaN and −∞ returns get zero weight. Candidates tied at `R_max` always get
/// an unscaled term of 1, which keeps `κ = ∞` well defined (an even split over
/// the best) and `κ = 0` the plain mean. If no return is usable the weights
/// fall back to uniform.
pub fn importance_weights(returns: &[f64], kappa: f64) -> Vec<f64> {
    let usable = |r: f64| !r.is_nan() && r > f64::NEG_INFINITY;
    let r_max = returns
        .iter()
        .copied()
        .filter(|r| usable(*r))
        .fold(f64::NEG_INFINITY, f64::max);
    if r_max == f64::NEG_INFINITY {
        let n = returns.len().max(1) as f64;
        return vec![1.0 / n; returns.len()];
    }

    let raw: Vec<f64> = returns
        .iter()
        .map(|&r| {
            if !usable(r) {
                0.0
            } else if r == r_max || kappa == 0.0 {
                1.0
            } else {
                (kappa * (r - r_max)).exp()
            }
        })
        .collect();
    // At least the maximiser contributes 1, so the sum is never zero.
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// `Σ_i w_i · candidate_i` over the whole horizon.
pub fn blend(candidates: &[Candidate], weights: &[f64]) -> Option<ActionSequence> {
    let first = candidates.first()?;
    let mut out = ActionSequence::zeros(first.actions.horizon(), first.actions.action_dim());
    for (candidate, &w) in candidates.iter().zip(weights) {
        if w == 0.0 {
            continue;
        }
        out.as_array_mut().scaled_add(w, candidate.actions.as_array());
    }
    Some(out)
}
