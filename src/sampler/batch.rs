use crate::action::ActionSequence;

/// One scored candidate plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position in the batch's deterministic draw order.
    pub index: usize,
    /// The plan as executed, after noise and clipping.
    pub actions: ActionSequence,
    /// `Σ γ^k r_k` over the executed steps.
    pub total_return: f64,
    pub rewards: Vec<f64>,
    pub observations: Vec<Vec<f64>>,
    /// Step at which the environment reported done, if it did.
    pub terminated_at: Option<usize>,
}

impl Candidate {
    /// A candidate carrying only a plan and its score.
    pub fn scored(index: usize, actions: ActionSequence, total_return: f64) -> Self {
        Self {
            index,
            actions,
            total_return,
            rewards: Vec::new(),
            observations: Vec::new(),
            terminated_at: None,
        }
    }
}

/// The surviving rollouts of one optimizer iteration.
#[derive(Debug, Clone, Default)]
pub struct RolloutBatch {
    pub requested: usize,
    pub candidates: Vec<Candidate>,
    /// Rollouts whose environment failed; they count as return −∞ and are
    /// left out of `candidates`.
    pub discarded: usize,
}

impl RolloutBatch {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.total_return).collect()
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates
            .iter()
            .max_by(|a, b| a.total_return.total_cmp(&b.total_return))
    }
}
