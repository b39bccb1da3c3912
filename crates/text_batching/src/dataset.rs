use crate::cluster::{Bucket, Clusterer, KMeans};
use crate::corpus::Corpus;
use crate::field::{flatten_fields, Field, FieldSpec, FieldValue};
use anyhow::{anyhow, bail, ensure, Context, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A corpus after field transformation, with per-sample lengths and an
/// optional length-bucket partition.
///
/// All fields are transformed eagerly at construction; the dataset is
/// immutable afterwards and is shared across loader threads behind an `Arc`.
///
/// # Example
/// ```ignore
/// let dataset = TextDataset::builder()
///     .fields(vec![words.into(), FieldSpec::Skip, heads.into()])
///     .buckets(32)
///     .build(&corpus)?;
/// ```
pub struct TextDataset {
    fields: Vec<Arc<dyn Field>>,
    columns: HashMap<String, Vec<FieldValue>>,
    lengths: Vec<usize>,
    buckets: Option<Vec<Bucket>>,
}

impl TextDataset {
    /// Builds a dataset with the default [`KMeans`] clusterer. `n_buckets`
    /// of `None` or `Some(0)` skips bucketing.
    pub fn new(corpus: &Corpus, specs: Vec<FieldSpec>, n_buckets: Option<usize>) -> Result<Self> {
        let builder = Self::builder().fields(specs);
        match n_buckets {
            Some(k) => builder.buckets(k),
            None => builder,
        }
        .build(corpus)
    }

    pub fn builder() -> TextDatasetBuilder {
        TextDatasetBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Retained fields, in flattening order.
    pub fn fields(&self) -> &[Arc<dyn Field>] {
        &self.fields
    }

    /// Transformed values of one field for every sample.
    pub fn column(&self, name: &str) -> Option<&[FieldValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Per-sample lengths, including the beginning-of-sequence element when
    /// the length-defining field has one.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn buckets(&self) -> Option<&[Bucket]> {
        self.buckets.as_deref()
    }

    /// Returns one value per field, in field order.
    pub fn get(&self, index: usize) -> Result<Vec<&FieldValue>> {
        ensure!(
            index < self.len(),
            "Index {} out of bounds for dataset of size {}",
            index,
            self.len()
        );
        self.fields
            .iter()
            .map(|field| {
                self.columns
                    .get(field.name())
                    .map(|column| &column[index])
                    .ok_or_else(|| anyhow!("Column '{}' is missing", field.name()))
            })
            .collect()
    }

    /// Transposes a batch of per-sample value lists into per-field columns.
    ///
    /// Every column has one entry per sample. Rows of different widths are
    /// an error.
    pub fn collate<T>(batch: Vec<Vec<T>>) -> Result<Vec<Vec<T>>> {
        let width = batch.first().map_or(0, Vec::len);
        if let Some((i, row)) = batch.iter().enumerate().find(|(_, row)| row.len() != width) {
            bail!(
                "Sample {} of the batch has {} values, expected {}",
                i,
                row.len(),
                width
            );
        }
        let mut columns: Vec<Vec<T>> = (0..width)
            .map(|_| Vec::with_capacity(batch.len()))
            .collect();
        for sample in batch {
            for (column, value) in columns.iter_mut().zip(sample) {
                column.push(value);
            }
        }
        Ok(columns)
    }
}

impl fmt::Debug for TextDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|field| field.name()).collect();
        f.debug_struct("TextDataset")
            .field("fields", &names)
            .field("len", &self.len())
            .field("buckets", &self.buckets.as_ref().map(Vec::len))
            .finish()
    }
}

/// Builder for [`TextDataset`].
pub struct TextDatasetBuilder {
    specs: Vec<FieldSpec>,
    n_buckets: Option<usize>,
    clusterer: Arc<dyn Clusterer>,
    length_field: Option<String>,
}

impl Default for TextDatasetBuilder {
    fn default() -> Self {
        Self {
            specs: Vec::new(),
            n_buckets: None,
            clusterer: Arc::new(KMeans::default()),
            length_field: None,
        }
    }
}

impl TextDatasetBuilder {
    pub fn fields(mut self, specs: Vec<FieldSpec>) -> Self {
        self.specs = specs;
        self
    }

    /// Partitions samples into `k` length buckets at build time. `k == 0`
    /// leaves the dataset unbucketed.
    pub fn buckets(mut self, k: usize) -> Self {
        self.n_buckets = (k > 0).then_some(k);
        self
    }

    pub fn clusterer(mut self, clusterer: impl Clusterer + 'static) -> Self {
        self.clusterer = Arc::new(clusterer);
        self
    }

    /// Field whose `bos` flag is added to sample lengths. Defaults to the
    /// last retained field.
    pub fn length_field(mut self, name: impl Into<String>) -> Self {
        self.length_field = Some(name.into());
        self
    }

    pub fn build(self, corpus: &Corpus) -> Result<TextDataset> {
        let fields = flatten_fields(&self.specs);
        ensure!(!fields.is_empty(), "TextDataset needs at least one field");

        let mut columns = HashMap::with_capacity(fields.len());
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            let name = field.name();
            ensure!(seen.insert(name), "Duplicate field name '{}'", name);

            let raw = corpus.column(name)?;
            let values = field
                .transform(raw)
                .with_context(|| format!("Failed to transform field '{}'", name))?;
            ensure!(
                values.len() == corpus.len(),
                "Field '{}' produced {} values for {} sentences",
                name,
                values.len(),
                corpus.len()
            );
            columns.insert(name.to_string(), values);
        }

        let length_field = match &self.length_field {
            Some(name) => fields
                .iter()
                .find(|f| f.name() == name)
                .ok_or_else(|| anyhow!("Length field '{}' is not a declared field", name))?,
            None => &fields[fields.len() - 1],
        };
        let bos = usize::from(length_field.bos());
        let lengths: Vec<usize> = corpus.iter().map(|s| s.len() + bos).collect();

        let buckets = match self.n_buckets {
            Some(k) => {
                let buckets = self.clusterer.cluster(&lengths, k)?;
                validate_partition(&buckets, lengths.len())?;
                Some(buckets)
            }
            None => None,
        };

        debug!(
            samples = lengths.len(),
            fields = fields.len(),
            length_field = length_field.name(),
            buckets = buckets.as_ref().map(Vec::len),
            "built text dataset"
        );

        Ok(TextDataset {
            fields,
            columns,
            lengths,
            buckets,
        })
    }
}

/// Checks that bucket members cover `0..n` exactly once.
fn validate_partition(buckets: &[Bucket], n: usize) -> Result<()> {
    let mut seen = vec![false; n];
    for (b, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            warn!(bucket = b, size = bucket.size, "clusterer returned an empty bucket");
        }
        for &index in &bucket.indices {
            ensure!(
                index < n,
                "Bucket {} contains index {} out of bounds for {} samples",
                b,
                index,
                n
            );
            if std::mem::replace(&mut seen[index], true) {
                bail!("Sample {} assigned to more than one bucket", index);
            }
        }
    }
    let missing = seen.iter().filter(|&&s| !s).count();
    ensure!(missing == 0, "{} samples are not assigned to any bucket", missing);
    Ok(())
}
