//! src/dataloader/iterator/mod.rs
//!
//! Iterator over the batches of one epoch.
//!
//! # Iterator Variants
//!
//! - `Single`: batches are assembled lazily on the consumer's thread when
//!   `next()` is called. Nothing is buffered.
//! - `Prefetch`: worker threads assemble batches ahead of the consumer into
//!   bounded per-worker channels. `next()` reads the channels round-robin,
//!   so batches arrive in sampler order.
//!
//! Dropping the iterator drops the channels and joins the workers.

use crate::collator::Collator;
use crate::dataset::TextDataset;
use crate::minibatch::MiniBatch;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::RecvTimeoutError;
use std::time::Duration;

use super::workers::pool::WorkerPool;
use super::workers::prefetch::process_batch;

/// Iterator over the padded batches of one epoch.
///
/// Created by calling `dataloader.iter()`. Yields `Result<MiniBatch>`;
/// a failed batch does not end iteration unless the workers are gone.
pub struct DataLoaderIter<'a, C> {
    inner: IteratorImpl<'a, C>,
    yielded: usize,
    total: usize,
}

/// Internal iterator implementation variants.
pub(crate) enum IteratorImpl<'a, C> {
    /// Single-threaded iteration.
    /// - `batches`: the sampler's plan for this epoch
    Single {
        dataset: &'a TextDataset,
        collator: &'a C,
        batches: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
    },

    /// Multi-threaded iteration.
    /// - `next_worker`: whose channel holds the next batch in order
    /// - `timeout`: `None` blocks until a batch or a disconnect
    Prefetch {
        pool: WorkerPool<Result<MiniBatch>>,
        next_worker: usize,
        timeout: Option<Duration>,
    },
}

impl<'a, C> DataLoaderIter<'a, C> {
    pub(crate) fn new(inner: IteratorImpl<'a, C>, total: usize) -> Self {
        Self {
            inner,
            yielded: 0,
            total,
        }
    }

    /// Batches assembled and waiting to be consumed. Always 0 without
    /// workers.
    pub fn buffered(&self) -> usize {
        match &self.inner {
            IteratorImpl::Single { .. } => 0,
            IteratorImpl::Prefetch { pool, .. } => pool.buffered(),
        }
    }

    /// Number of producer threads serving this iterator.
    pub fn num_workers(&self) -> usize {
        match &self.inner {
            IteratorImpl::Single { .. } => 0,
            IteratorImpl::Prefetch { pool, .. } => pool.num_workers(),
        }
    }
}

impl<'a, C> Iterator for DataLoaderIter<'a, C>
where
    C: Collator,
{
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.yielded >= self.total {
            return None;
        }
        let batch_no = self.yielded;

        let item = match &mut self.inner {
            IteratorImpl::Single {
                dataset,
                collator,
                batches,
            } => {
                let indices = batches.next()?;
                process_batch(dataset, indices, *collator)
                    .with_context(|| format!("Failed to assemble batch {}", batch_no))
            }

            IteratorImpl::Prefetch {
                pool,
                next_worker,
                timeout,
            } => {
                let worker = *next_worker;
                let rx = &pool.output_rxs[worker];
                let received = match timeout {
                    Some(timeout) => rx.recv_timeout(*timeout).map_err(|e| match e {
                        RecvTimeoutError::Timeout => anyhow!(
                            "Worker {} timeout after {:?} waiting for batch {}",
                            worker,
                            timeout,
                            batch_no
                        ),
                        RecvTimeoutError::Disconnected => disconnected(worker, batch_no),
                    }),
                    None => rx.recv().map_err(|_| disconnected(worker, batch_no)),
                };
                *next_worker = (worker + 1) % pool.num_workers();

                match received {
                    Ok(result) => result,
                    Err(e) => {
                        // The plan can no longer be completed in order.
                        self.total = self.yielded;
                        return Some(Err(e));
                    }
                }
            }
        };

        self.yielded += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total.saturating_sub(self.yielded);
        (0, Some(remaining))
    }
}

fn disconnected(worker: usize, batch_no: usize) -> anyhow::Error {
    anyhow!(
        "Worker {} disconnected before delivering batch {} - the worker may have panicked",
        worker,
        batch_no
    )
}
