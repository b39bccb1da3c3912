//! src/dataloader/workers/prefetch.rs
//!
//! Producer threads that assemble batches ahead of the consumer.
//!
//! # Architecture:
//! - Workers share the dataset, sampler and collator via `Arc`.
//! - Every worker replays the same deterministic epoch plan
//!   (`sampler.iter(epoch)`) and keeps every `num_workers`-th batch,
//!   starting at its own id.
//! - Worker `w` pushes into its own bounded channel, so reading the
//!   channels round-robin restores the sampler's batch order.

use crate::collator::Collator;
use crate::dataset::TextDataset;
use crate::minibatch::MiniBatch;
use crate::sampler::Sampler;
use anyhow::{ensure, Context, Result};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};

use super::pool::WorkerPool;

/// Fetches the samples of one batch and collates them.
///
/// Shared by the single-threaded iterator and the workers.
pub(crate) fn process_batch<C>(
    dataset: &TextDataset,
    indices: Vec<usize>,
    collator: &C,
) -> Result<MiniBatch>
where
    C: Collator + ?Sized,
{
    ensure!(!indices.is_empty(), "Sampler produced an empty batch");

    let samples = indices
        .iter()
        .map(|&index| {
            dataset.get(index).with_context(|| {
                format!(
                    "Failed to load sample at index {} (dataset size: {})",
                    index,
                    dataset.len()
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let n = samples.len();
    let batch = collator
        .collate(dataset.fields(), samples, indices)
        .with_context(|| format!("Failed to collate batch of {} samples", n))?;
    trace!(batch_size = n, "assembled batch");
    Ok(batch)
}

/// Spawns the producers for one epoch.
///
/// `buffer_size` is the per-worker channel capacity.
pub(crate) fn spawn_prefetch_workers<C>(
    dataset: Arc<TextDataset>,
    sampler: Arc<dyn Sampler<Item = Vec<usize>>>,
    collator: Arc<C>,
    epoch: usize,
    num_workers: usize,
    buffer_size: usize,
) -> Result<WorkerPool<Result<MiniBatch>>>
where
    C: Collator + 'static,
{
    WorkerPool::new(num_workers, buffer_size, move |worker_id, output_tx, shutdown| {
        let batches = sampler
            .iter(epoch)
            .enumerate()
            .skip(worker_id)
            .step_by(num_workers);

        for (batch_no, indices) in batches {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            let result = process_batch(&dataset, indices, collator.as_ref())
                .with_context(|| format!("Worker {} failed on batch {}", worker_id, batch_no));

            // Blocks while the channel is full; errors once the consumer is gone.
            if output_tx.send(result).is_err() {
                break;
            }
        }
        debug!(worker_id, epoch, "prefetch worker finished");
    })
    .context("Failed to start prefetch workers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collator::PaddingCollator;
    use crate::corpus::{Corpus, Sentence};
    use crate::field::NumericField;
    use crate::sampler::SequentialSampler;

    fn dataset(n: usize) -> Result<Arc<TextDataset>> {
        let corpus: Corpus = (0..n)
            .map(|i| Sentence::from_column("x", vec![i.to_string(); i % 3 + 1]))
            .collect();
        Ok(Arc::new(TextDataset::new(
            &corpus,
            vec![NumericField::new("x").into()],
            None,
        )?))
    }

    #[test]
    fn test_process_batch() -> Result<()> {
        let dataset = dataset(4)?;
        let batch = process_batch(&dataset, vec![1, 2], &PaddingCollator::default())?;
        assert_eq!(batch.padded("x")?.shape(), &[2, 3]);
        assert_eq!(batch.indices(), &[1, 2]);

        assert!(process_batch(&dataset, vec![], &PaddingCollator::default()).is_err());
        let err = process_batch(&dataset, vec![0, 9], &PaddingCollator::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("index 9"));
        Ok(())
    }

    #[test]
    fn test_workers_split_plan_round_robin() -> Result<()> {
        let dataset = dataset(10)?;
        let sampler: Arc<dyn Sampler<Item = Vec<usize>>> =
            Arc::new(SequentialSampler::batched(10, 2)?);
        let pool = spawn_prefetch_workers(
            dataset,
            sampler,
            Arc::new(PaddingCollator::default()),
            0,
            2,
            5,
        )?;

        let first: Vec<Vec<usize>> = pool.output_rxs[0]
            .iter()
            .map(|b| b.map(|b| b.indices().to_vec()))
            .collect::<Result<_>>()?;
        let second: Vec<Vec<usize>> = pool.output_rxs[1]
            .iter()
            .map(|b| b.map(|b| b.indices().to_vec()))
            .collect::<Result<_>>()?;

        assert_eq!(first, vec![vec![0, 1], vec![4, 5], vec![8, 9]]);
        assert_eq!(second, vec![vec![2, 3], vec![6, 7]]);
        Ok(())
    }
}
