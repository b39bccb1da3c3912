use crate::dataset::TextDataset;
use crate::field::{Field, FieldValue};
use crate::minibatch::{BatchColumn, MiniBatch};
use anyhow::{bail, ensure, Context, Result};
use ndarray::{ArrayD, Axis, IxDyn, Slice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which end of the sequence axis receives padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingSide {
    /// Content first, padding after.
    #[default]
    Right,
    /// Padding first, content aligned to the end of the sequence axis.
    Left,
}

/// Pads arrays of equal rank to a common shape and stacks them along a new
/// leading batch axis.
///
/// The output shape is `[arrays.len(), max_0, max_1, ...]` where `max_k` is the
/// largest extent of axis `k` over the inputs. With [`PaddingSide::Left`] only
/// the first (sequence) axis is left-aligned; inner axes stay right-padded.
///
/// # Example
/// ```ignore
/// // lengths [3, 5, 2] -> shape (3, 5)
/// let out = pad_sequence(&[&a, &b, &c], 0, PaddingSide::Right)?;
/// ```
pub fn pad_sequence(arrays: &[&ArrayD<i64>], pad: i64, side: PaddingSide) -> Result<ArrayD<i64>> {
    ensure!(!arrays.is_empty(), "Cannot pad an empty list of arrays");

    let rank = arrays[0].ndim();
    let mut max_shape = vec![0usize; rank];
    for (i, array) in arrays.iter().enumerate() {
        ensure!(
            array.ndim() == rank,
            "Rank mismatch in sample {}: expected {} dims, got {}",
            i,
            rank,
            array.ndim()
        );
        for (max, &dim) in max_shape.iter_mut().zip(array.shape()) {
            *max = (*max).max(dim);
        }
    }

    let mut shape = Vec::with_capacity(rank + 1);
    shape.push(arrays.len());
    shape.extend_from_slice(&max_shape);
    let mut out = ArrayD::from_elem(IxDyn(&shape), pad);

    for (i, array) in arrays.iter().enumerate() {
        let mut row = out.index_axis_mut(Axis(0), i);
        let mut target = row.slice_each_axis_mut(|ax| {
            let len = array.len_of(ax.axis);
            if side == PaddingSide::Left && ax.axis.index() == 0 {
                Slice::from(ax.len - len..ax.len)
            } else {
                Slice::from(0..len)
            }
        });
        target.assign(*array);
    }
    Ok(out)
}

/// A `Collator` combines the field values of a batch's samples into a
/// [`MiniBatch`].
///
/// `samples` holds one entry per sample, each with one value per field in
/// field order; `indices` are the samples' dataset indices.
pub trait Collator: Send + Sync {
    fn collate(
        &self,
        fields: &[Arc<dyn Field>],
        samples: Vec<Vec<&FieldValue>>,
        indices: Vec<usize>,
    ) -> Result<MiniBatch>;
}

/// Pads every field to the batch maximum with the field's `pad_index`.
///
/// - [`FieldValue::Array`] columns are padded into one array.
/// - [`FieldValue::Group`] columns are padded per sub-position, one level
///   deep; all samples must carry the same number of sub-arrays.
/// - Any other value shape is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaddingCollator {
    side: PaddingSide,
}

impl PaddingCollator {
    pub fn new(side: PaddingSide) -> Self {
        Self { side }
    }

    pub fn side(&self) -> PaddingSide {
        self.side
    }

    fn pad_column(&self, field: &dyn Field, values: &[&FieldValue]) -> Result<BatchColumn> {
        let name = field.name();
        let pad = field.pad_index();

        match values[0] {
            FieldValue::Array(_) => {
                let arrays = values
                    .iter()
                    .map(|value| match value {
                        FieldValue::Array(array) => Ok(array),
                        other => bail!(
                            "Field '{}' mixes array and {} values in one batch",
                            name,
                            other.shape_class()
                        ),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(BatchColumn::Padded(pad_sequence(&arrays, pad, self.side)?))
            }
            FieldValue::Group(first) => {
                let width = first.len();
                let mut positions: Vec<Vec<&ArrayD<i64>>> =
                    (0..width).map(|_| Vec::with_capacity(values.len())).collect();
                for (i, value) in values.iter().enumerate() {
                    let group = match value {
                        FieldValue::Group(group) => group,
                        other => bail!(
                            "Field '{}' mixes group and {} values in one batch",
                            name,
                            other.shape_class()
                        ),
                    };
                    ensure!(
                        group.len() == width,
                        "Field '{}': sample {} has {} grouped arrays, expected {}",
                        name,
                        i,
                        group.len(),
                        width
                    );
                    for (position, array) in positions.iter_mut().zip(group) {
                        position.push(array);
                    }
                }
                positions
                    .iter()
                    .map(|arrays| pad_sequence(arrays, pad, self.side))
                    .collect::<Result<Vec<_>>>()
                    .map(BatchColumn::Group)
            }
            other => bail!(
                "Unsupported shape for field '{}': expected array or group, got {}",
                name,
                other.shape_class()
            ),
        }
    }
}

impl Collator for PaddingCollator {
    fn collate(
        &self,
        fields: &[Arc<dyn Field>],
        samples: Vec<Vec<&FieldValue>>,
        indices: Vec<usize>,
    ) -> Result<MiniBatch> {
        ensure!(!samples.is_empty(), "Cannot collate empty sample list");
        ensure!(
            samples.iter().all(|s| s.len() == fields.len()),
            "Every sample must carry exactly {} field values",
            fields.len()
        );

        let columns = TextDataset::collate(samples)?;
        let padded = fields
            .iter()
            .zip(&columns)
            .map(|(field, values)| {
                self.pad_column(field.as_ref(), values)
                    .with_context(|| format!("Failed to pad field '{}'", field.name()))
                    .map(|column| (field.name().to_string(), column))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MiniBatch::new(padded, indices))
    }
}
