use crate::cluster::Bucket;
use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// A `Sampler` defines the order in which a dataset is visited.
///
/// # Associated type
/// - `Item`: The handle yielded by the iterator. A sample index (`usize`)
///   for index samplers, or a batch of indices (`Vec<usize>`) for batch
///   samplers.
///
/// # Methods
/// - `iter(epoch)`: returns a finite sequence for that epoch. Samplers that
///   shuffle mix `epoch` into their base seed, so each epoch re-draws its
///   permutations while staying reproducible.
/// - `len()`: number of items `iter` yields, known without iterating.
///
/// Implementations must be `Send + Sync` so one sampler can be shared with
/// loader worker threads.
pub trait Sampler: Send + Sync {
    type Item: Send + Sync;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Derives the RNG for one epoch from a base seed.
#[inline]
fn rng_for_epoch(base_seed: u64, epoch: usize) -> StdRng {
    StdRng::seed_from_u64(base_seed.wrapping_add(epoch as u64))
}

/// ============================================================================
/// Yields indices sequentially in order `(0,1,2,...,dataset_size-1)`.
///
/// # Examples
/// ```ignore
/// let sampler = SequentialSampler::new(5);
/// let indices: Vec<_> = sampler.iter(0).collect();
/// assert_eq!(indices, vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    dataset_size: usize,
}

impl SequentialSampler {
    pub fn new(dataset_size: usize) -> Self {
        Self { dataset_size }
    }

    /// Contiguous batches of `batch_size` indices in dataset order, the last
    /// one possibly shorter.
    pub fn batched(dataset_size: usize, batch_size: usize) -> Result<BatchSampler<Self>> {
        BatchSampler::new(Self::new(dataset_size), batch_size)
    }
}

impl Sampler for SequentialSampler {
    type Item = usize;

    fn iter(&self, _epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        Box::new(0..self.dataset_size)
    }

    fn len(&self) -> usize {
        self.dataset_size
    }
}

/// ============================================================================
/// Groups the items of an underlying sampler into mini-batches of
/// `batch_size`. A final shorter mini-batch is kept.
///
/// # Example
/// ```ignore
/// let batch_sampler = BatchSampler::new(SequentialSampler::new(7), 3)?;
/// let batches: Vec<_> = batch_sampler.iter(0).collect();
/// assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
/// ```
#[derive(Debug, Clone)]
pub struct BatchSampler<S> {
    sampler: S,
    batch_size: usize,
}

impl<S: Sampler> BatchSampler<S> {
    pub fn new(sampler: S, batch_size: usize) -> Result<Self> {
        ensure!(
            batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            batch_size
        );
        Ok(Self {
            sampler,
            batch_size,
        })
    }
}

impl<S: Sampler> Sampler for BatchSampler<S> {
    type Item = Vec<S::Item>;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_> {
        let mut sampler_iter = self.sampler.iter(epoch);
        let batch_size = self.batch_size;

        Box::new(std::iter::from_fn(move || {
            let mini_batch: Vec<_> = sampler_iter.by_ref().take(batch_size).collect();
            (!mini_batch.is_empty()).then_some(mini_batch)
        }))
    }

    fn len(&self) -> usize {
        self.sampler.len().div_ceil(self.batch_size)
    }
}

/// ============================================================================
/// Turns length buckets into batches under a token budget.
///
/// Each bucket of representative size `s` with `m` members is split into
/// `chunks = min(m, max(ceil(s * m / batch_size), 1))` near-equal groups, so a
/// batch holds roughly `batch_size` tokens and never fewer than one sample.
/// Group sizes are `(m - j - 1) / chunks + 1` for `j in 0..chunks`, which
/// makes earlier groups at most one element larger than later ones. Chunk
/// counts are fixed at construction.
///
/// With `shuffle`, both the bucket order and the member order within each
/// bucket are permuted by an RNG seeded with `base_seed + epoch`.
///
/// # Example
/// ```ignore
/// let buckets = dataset.buckets().unwrap().to_vec();
/// let sampler = BucketsSampler::new(buckets, 5000, true, Some(42))?;
/// for batch in sampler.iter(0) {
///     // `batch` is Vec<usize>, all members of one bucket
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BucketsSampler {
    buckets: Vec<Bucket>,
    chunks: Vec<usize>,
    shuffle: bool,
    base_seed: u64,
}

impl BucketsSampler {
    /// `seed` of `None` draws a random base seed.
    pub fn new(
        buckets: Vec<Bucket>,
        batch_size: usize,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Self> {
        ensure!(
            batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            batch_size
        );

        let chunks: Vec<usize> = buckets
            .iter()
            .map(|bucket| chunk_count(bucket.size, bucket.len(), batch_size))
            .collect();
        let base_seed = seed.unwrap_or_else(|| rand::rng().random());

        debug!(
            buckets = buckets.len(),
            batches = chunks.iter().sum::<usize>(),
            batch_size,
            shuffle,
            "created buckets sampler"
        );

        Ok(Self {
            buckets,
            chunks,
            shuffle,
            base_seed,
        })
    }

    /// Number of batches each bucket is split into, in bucket order.
    pub fn chunks(&self) -> &[usize] {
        &self.chunks
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }
}

impl Sampler for BucketsSampler {
    type Item = Vec<usize>;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Vec<usize>> + Send + '_> {
        let mut rng = rng_for_epoch(self.base_seed, epoch);
        let mut order: Vec<usize> = (0..self.buckets.len()).collect();
        if self.shuffle {
            order.shuffle(&mut rng);
        }

        let iter = order.into_iter().flat_map(move |b| {
            let mut members = self.buckets[b].indices.clone();
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            split_into_chunks(members, self.chunks[b])
        });
        Box::new(iter)
    }

    fn len(&self) -> usize {
        self.chunks.iter().sum()
    }
}

/// `min(m, max(ceil(s * m / batch_size), 1))`, or 0 for an empty bucket.
fn chunk_count(size: usize, members: usize, batch_size: usize) -> usize {
    if members == 0 {
        return 0;
    }
    let tokens = size.saturating_mul(members);
    members.min(tokens.div_ceil(batch_size).max(1))
}

/// Splits `members` into `chunks` contiguous groups, larger groups first.
fn split_into_chunks(members: Vec<usize>, chunks: usize) -> Vec<Vec<usize>> {
    if chunks == 0 {
        return Vec::new();
    }
    let m = members.len();
    let mut groups = Vec::with_capacity(chunks);
    let mut rest = members.into_iter();
    for j in 0..chunks {
        let size = (m.saturating_sub(j + 1)) / chunks + 1;
        let group: Vec<usize> = rest.by_ref().take(size).collect();
        if !group.is_empty() {
            groups.push(group);
        }
    }
    groups
}

/// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const TEST_SEED: u64 = 42;

    mod sequential_sampler_tests {
        use super::*;

        #[test]
        fn yields_sequential_indices() {
            let sampler = SequentialSampler::new(100);
            let indices: Vec<usize> = sampler.iter(0).collect();
            assert_eq!(indices, (0..100).collect::<Vec<_>>());
            assert_eq!(sampler.len(), 100);
        }

        #[test]
        fn handles_empty_dataset() {
            let sampler = SequentialSampler::new(0);
            assert_eq!(sampler.iter(0).count(), 0);
            assert!(sampler.is_empty());
        }

        #[test]
        fn batched_keeps_short_tail() -> Result<()> {
            let sampler = SequentialSampler::batched(7, 3)?;
            let batches: Vec<_> = sampler.iter(0).collect();
            assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
            assert_eq!(sampler.len(), 3);
            Ok(())
        }
    }

    mod batch_sampler_tests {
        use super::*;

        #[test]
        fn test_batches_full() -> Result<()> {
            let batch_sampler = BatchSampler::new(SequentialSampler::new(10), 2)?;
            let mini_batches: Vec<_> = batch_sampler.iter(0).collect();
            assert_eq!(
                mini_batches,
                vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7], vec![8, 9]]
            );
            assert_eq!(batch_sampler.len(), 5);
            Ok(())
        }

        #[test]
        fn test_batches_keep_short_tail() -> Result<()> {
            let batch_sampler = BatchSampler::new(SequentialSampler::new(10), 3)?;
            let mini_batches: Vec<_> = batch_sampler.iter(0).collect();
            assert_eq!(
                mini_batches,
                vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9]]
            );
            assert_eq!(batch_sampler.len(), 4);
            Ok(())
        }

        #[test]
        fn rejects_zero_batch_size() {
            assert!(BatchSampler::new(SequentialSampler::new(4), 0).is_err());
        }
    }

    mod buckets_sampler_tests {
        use super::*;

        fn buckets() -> Vec<Bucket> {
            vec![
                Bucket::new(10, (0..7).collect()),
                Bucket::new(3, (7..12).collect()),
                Bucket::new(40, (12..20).collect()),
            ]
        }

        #[test]
        fn chunk_counts_follow_token_budget() -> Result<()> {
            let sampler = BucketsSampler::new(buckets(), 25, false, Some(TEST_SEED))?;
            // 70/25 -> 3, 15/25 -> 1, 320/25 -> 13 capped at 8 members.
            assert_eq!(sampler.chunks(), &[3, 1, 8]);
            assert_eq!(sampler.len(), 12);
            Ok(())
        }

        #[test]
        fn splits_larger_groups_first() -> Result<()> {
            let sampler = BucketsSampler::new(buckets(), 25, false, Some(TEST_SEED))?;
            let batches: Vec<_> = sampler.iter(0).collect();

            assert_eq!(batches[0], vec![0, 1, 2]);
            assert_eq!(batches[1], vec![3, 4]);
            assert_eq!(batches[2], vec![5, 6]);
            assert_eq!(batches[3], (7..12).collect::<Vec<_>>());
            assert!(batches[4..].iter().all(|b| b.len() == 1));
            Ok(())
        }

        #[test]
        fn batch_count_matches_len() -> Result<()> {
            for batch_size in [1, 7, 25, 100, 10_000] {
                for shuffle in [false, true] {
                    let sampler =
                        BucketsSampler::new(buckets(), batch_size, shuffle, Some(TEST_SEED))?;
                    assert_eq!(sampler.iter(3).count(), sampler.len());
                }
            }
            Ok(())
        }

        #[test]
        fn huge_budget_gives_one_batch_per_bucket() -> Result<()> {
            let sampler = BucketsSampler::new(buckets(), usize::MAX, false, None)?;
            assert_eq!(sampler.chunks(), &[1, 1, 1]);
            Ok(())
        }

        #[test]
        fn empty_bucket_yields_nothing() -> Result<()> {
            let mut buckets = buckets();
            buckets.push(Bucket::new(5, vec![]));
            let sampler = BucketsSampler::new(buckets, 25, true, Some(TEST_SEED))?;
            assert_eq!(sampler.chunks()[3], 0);
            assert!(sampler.iter(0).all(|b| !b.is_empty()));
            Ok(())
        }

        #[test]
        fn unshuffled_is_deterministic() -> Result<()> {
            let a = BucketsSampler::new(buckets(), 25, false, Some(1))?;
            let b = BucketsSampler::new(buckets(), 25, false, Some(2))?;
            let first: Vec<_> = a.iter(0).collect();
            assert_eq!(first, a.iter(5).collect::<Vec<_>>());
            assert_eq!(first, b.iter(0).collect::<Vec<_>>());
            Ok(())
        }

        #[test]
        fn shuffled_covers_every_index_once() -> Result<()> {
            let sampler = BucketsSampler::new(buckets(), 25, true, Some(TEST_SEED))?;
            let mut seen: Vec<usize> = sampler.iter(0).flatten().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..20).collect::<Vec<_>>());
            Ok(())
        }

        #[test]
        fn shuffled_batches_stay_within_one_bucket() -> Result<()> {
            let buckets = buckets();
            let sampler = BucketsSampler::new(buckets.clone(), 25, true, Some(TEST_SEED))?;
            let sets: Vec<HashSet<usize>> = buckets
                .iter()
                .map(|b| b.indices.iter().copied().collect())
                .collect();

            for batch in sampler.iter(0) {
                assert!(sets.iter().any(|set| batch.iter().all(|i| set.contains(i))));
            }
            Ok(())
        }

        #[test]
        fn deterministic_shuffling_across_epochs() -> Result<()> {
            let sampler = BucketsSampler::new(buckets(), 25, true, Some(TEST_SEED))?;

            let epoch1: Vec<_> = sampler.iter(1).flatten().collect();
            let epoch1_repeat: Vec<_> = sampler.iter(1).flatten().collect();
            let epoch2: Vec<_> = sampler.iter(2).flatten().collect();

            assert_eq!(
                epoch1, epoch1_repeat,
                "Same epoch should produce identical sequences"
            );
            assert_ne!(
                epoch1, epoch2,
                "Different epochs should produce different sequences"
            );
            Ok(())
        }

        #[test]
        fn rejects_zero_batch_size() {
            assert!(BucketsSampler::new(buckets(), 0, false, None).is_err());
        }
    }
}
