//! src/dataloader/loader.rs
//!
//! DataLoader constructors.
//!
//! # Constructor Overview
//!
//! - `batchify()` - picks the sampler from the config: contiguous
//!   sequential batches, or token-budget batches over the dataset's length
//!   buckets. Uses the default `PaddingCollator`.
//! - `DataLoader::new()` - user provided batch sampler + default
//!   `PaddingCollator`
//! - `DataLoader::with_collator()` - user provided batch sampler + custom
//!   `Collator`
//!
//! # Epochs
//!
//! Every call to `iter()` advances an internal epoch counter that is passed
//! to the sampler, so shuffled samplers draw a new, reproducible order each
//! time.

use crate::collator::{Collator, PaddingCollator};
use crate::dataset::TextDataset;
use crate::sampler::{BucketsSampler, Sampler, SequentialSampler};
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::config::DataLoaderConfig;
use super::iterator::{DataLoaderIter, IteratorImpl};
use super::workers::prefetch::spawn_prefetch_workers;

/// Coordinates a dataset, a batch sampler and a collator.
///
/// # Thread safety:
/// - `DataLoader` itself is Send + Sync and can be shared across threads.
/// - Each call to `iter()` creates an independent iterator; with workers,
///   each iterator owns its own producer threads.
///
/// # Type parameters:
/// - `C`: Collator type (defaults to PaddingCollator)
pub struct DataLoader<C = PaddingCollator> {
    pub(crate) dataset: Arc<TextDataset>,
    pub(crate) sampler: Arc<dyn Sampler<Item = Vec<usize>>>,
    pub(crate) collator: Arc<C>,
    pub(crate) config: DataLoaderConfig,
    pub(crate) current_epoch: AtomicUsize,
}

impl DataLoader<PaddingCollator> {
    /// Creates a DataLoader with the default padding collator, padding on
    /// `config.padding_side`.
    pub fn new(
        dataset: impl Into<Arc<TextDataset>>,
        sampler: impl Sampler<Item = Vec<usize>> + 'static,
        config: DataLoaderConfig,
    ) -> Result<Self> {
        let collator = PaddingCollator::new(config.padding_side);
        Self::with_collator(dataset, sampler, config, collator)
    }
}

impl<C> DataLoader<C>
where
    C: Collator + 'static,
{
    pub fn with_collator(
        dataset: impl Into<Arc<TextDataset>>,
        sampler: impl Sampler<Item = Vec<usize>> + 'static,
        config: DataLoaderConfig,
        collator: C,
    ) -> Result<Self> {
        Self::from_parts(dataset.into(), Arc::new(sampler), Arc::new(collator), config)
    }

    /// Assembles a DataLoader from already shared parts.
    ///
    /// # Errors
    /// - Returns error if the config fails validation
    pub fn from_parts(
        dataset: Arc<TextDataset>,
        sampler: Arc<dyn Sampler<Item = Vec<usize>>>,
        collator: Arc<C>,
        config: DataLoaderConfig,
    ) -> Result<Self> {
        config.validate().context("Invalid DataLoader config")?;
        debug!(
            samples = dataset.len(),
            batches = sampler.len(),
            num_workers = config.num_workers,
            prefetch_capacity = config.prefetch_capacity,
            "created dataloader"
        );
        Ok(Self {
            dataset,
            sampler,
            collator,
            config,
            current_epoch: AtomicUsize::new(0),
        })
    }

    /// Starts a new epoch and returns an iterator over its batches.
    ///
    /// With `num_workers > 0` this spawns the epoch's producer threads, which
    /// begin filling the prefetch buffer immediately.
    pub fn iter(&self) -> Result<DataLoaderIter<'_, C>> {
        let epoch = self.current_epoch.fetch_add(1, Ordering::Relaxed);
        let total = self.sampler.len();

        let inner = if self.config.num_workers == 0 {
            IteratorImpl::Single {
                dataset: self.dataset.as_ref(),
                collator: self.collator.as_ref(),
                batches: self.sampler.iter(epoch),
            }
        } else {
            let capacity = self.config.prefetch_capacity;
            let num_workers = self.config.num_workers.min(capacity);
            if num_workers < self.config.num_workers {
                warn!(
                    requested = self.config.num_workers,
                    capacity, "more workers than prefetch slots, using {} workers", num_workers
                );
            }
            let pool = spawn_prefetch_workers(
                self.dataset.clone(),
                self.sampler.clone(),
                self.collator.clone(),
                epoch,
                num_workers,
                (capacity / num_workers).max(1),
            )
            .with_context(|| format!("Failed to start epoch {}", epoch))?;

            IteratorImpl::Prefetch {
                pool,
                next_worker: 0,
                timeout: self.config.timeout,
            }
        };

        Ok(DataLoaderIter::new(inner, total))
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        self.sampler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The epoch the next call to `iter()` will use.
    pub fn epoch(&self) -> usize {
        self.current_epoch.load(Ordering::Relaxed)
    }

    /// Sets the epoch the next call to `iter()` will use, e.g. when resuming.
    pub fn set_epoch(&self, epoch: usize) {
        self.current_epoch.store(epoch, Ordering::Relaxed);
    }

    pub fn dataset(&self) -> &Arc<TextDataset> {
        &self.dataset
    }

    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }
}

impl<C> fmt::Debug for DataLoader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("dataset", &self.dataset)
            .field("batches", &self.sampler.len())
            .field("config", &self.config)
            .field("epoch", &self.current_epoch.load(Ordering::Relaxed))
            .finish()
    }
}

/// Builds a DataLoader for `dataset` with the sampler selected by `config`.
///
/// - `sequential_sampler = true`: contiguous batches of `batch_size`
///   sentences in dataset order; `shuffle` is ignored.
/// - otherwise: token-budget batches over the dataset's length buckets,
///   shuffled per epoch when `shuffle` is set.
///
/// # Errors
/// - Returns error if bucketed sampling is requested on a dataset built
///   without buckets
/// - Returns error if the config fails validation
///
/// # Example
/// ```ignore
/// let dataset = TextDataset::builder().fields(specs).buckets(32).build(&corpus)?;
/// let config = DataLoaderConfig::builder().batch_size(5000).shuffle(true).seed(1).build();
/// let loader = batchify(dataset, config)?;
/// for batch in loader.iter()? {
///     let batch = batch?;
/// }
/// ```
pub fn batchify(
    dataset: impl Into<Arc<TextDataset>>,
    config: DataLoaderConfig,
) -> Result<DataLoader<PaddingCollator>> {
    config.validate().context("Invalid DataLoader config")?;
    let dataset = dataset.into();

    let sampler: Arc<dyn Sampler<Item = Vec<usize>>> = if config.sequential_sampler {
        if config.shuffle {
            warn!("shuffle has no effect with the sequential sampler");
        }
        Arc::new(SequentialSampler::batched(dataset.len(), config.batch_size)?)
    } else {
        let buckets = dataset.buckets().ok_or_else(|| {
            anyhow!(
                "Dataset has no length buckets. Build it with `.buckets(k)` \
                or set `sequential_sampler` in the config"
            )
        })?;
        Arc::new(BucketsSampler::new(
            buckets.to_vec(),
            config.batch_size,
            config.shuffle,
            config.seed,
        )?)
    };

    let collator = Arc::new(PaddingCollator::new(config.padding_side));
    DataLoader::from_parts(dataset, sampler, collator, config)
}
