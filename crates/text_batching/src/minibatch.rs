use anyhow::{anyhow, bail, Result};
use ndarray::ArrayD;

/// One padded field of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchColumn {
    /// Shape `[batch_size, max_0, max_1, ...]`.
    Padded(ArrayD<i64>),
    /// One padded array per sub-position of a grouped field.
    Group(Vec<ArrayD<i64>>),
}

impl BatchColumn {
    /// Number of samples in the column.
    pub fn batch_size(&self) -> Option<usize> {
        match self {
            BatchColumn::Padded(array) => array.shape().first().copied(),
            BatchColumn::Group(arrays) => arrays.first().and_then(|a| a.shape().first().copied()),
        }
    }
}

/// The `MiniBatch` struct represents a batch of padded field columns ready
/// for model input.
///
/// Columns keep the dataset's field order. Each padded array has shape
/// `[batch_size, ...]` where the remaining dimensions are the per-axis maxima
/// over the batch's samples, so padding is local to the batch.
///
/// # Examples
/// Suppose a batch of 3 sentences with 5, 3 and 4 tokens and two fields:
/// - `"word"` -> shape `[3, 5]`
/// - `"char"` (2-D per sample) -> shape `[3, 5, max_chars]`
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch {
    columns: Vec<(String, BatchColumn)>,
    indices: Vec<usize>,
}

impl MiniBatch {
    pub fn new(columns: Vec<(String, BatchColumn)>, indices: Vec<usize>) -> Self {
        Self { columns, indices }
    }

    /// Returns the number of samples in the batch.
    pub fn batch_size(&self) -> usize {
        self.indices.len()
    }

    /// Dataset indices of the batch's samples, in batch order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns the column for a given field name.
    pub fn get(&self, field: &str) -> Result<&BatchColumn> {
        self.columns
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, column)| column)
            .ok_or_else(|| anyhow!("Field '{}' not found in mini-batch", field))
    }

    /// Returns the padded array of a non-grouped field.
    pub fn padded(&self, field: &str) -> Result<&ArrayD<i64>> {
        match self.get(field)? {
            BatchColumn::Padded(array) => Ok(array),
            BatchColumn::Group(_) => bail!("Field '{}' is grouped, not a single array", field),
        }
    }

    /// Returns the per-position arrays of a grouped field.
    pub fn group(&self, field: &str) -> Result<&[ArrayD<i64>]> {
        match self.get(field)? {
            BatchColumn::Group(arrays) => Ok(arrays),
            BatchColumn::Padded(_) => bail!("Field '{}' is not grouped", field),
        }
    }

    /// Field names in field order.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> &[(String, BatchColumn)] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<(String, BatchColumn)> {
        self.columns
    }
}
