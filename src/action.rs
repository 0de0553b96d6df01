use ndarray::{Array2, ArrayView1, ArrayViewMut1, s};
use serde::{Deserialize, Serialize};

/// A horizon × action_dim block of actions.
///
/// Row `k` is the action planned for `k` steps into the future. The shape is
/// fixed at construction; every mutating method preserves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSequence {
    data: Array2<f64>,
}

impl ActionSequence {
    pub fn zeros(horizon: usize, action_dim: usize) -> Self {
        Self {
            data: Array2::zeros((horizon, action_dim)),
        }
    }

    /// Builds a sequence from explicit rows. Returns `None` if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let action_dim = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != action_dim) {
            return None;
        }
        let data = Array2::from_shape_vec((rows.len(), action_dim), rows.concat()).ok()?;
        Some(Self { data })
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn horizon(&self) -> usize {
        self.data.nrows()
    }

    pub fn action_dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, k: usize) -> ArrayView1<'_, f64> {
        self.data.row(k)
    }

    pub fn row_mut(&mut self, k: usize) -> ArrayViewMut1<'_, f64> {
        self.data.row_mut(k)
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.data.outer_iter()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn as_array_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Drops the first row, moves everything one step earlier and writes
    /// `fill` into the freed last row. `fill` must have `action_dim` entries.
    pub fn shift_left(&mut self, fill: &[f64]) {
        let horizon = self.horizon();
        if horizon == 0 {
            return;
        }
        let tail = self.data.slice(s![1.., ..]).to_owned();
        self.data.slice_mut(s![..horizon - 1, ..]).assign(&tail);
        self.data.row_mut(horizon - 1).assign(&ArrayView1::from(fill));
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.data.dim() == other.data.dim()
    }
}
