//! Length clustering used to form buckets.

use anyhow::{ensure, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// A group of samples with similar length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Representative length of the bucket's members.
    pub size: usize,
    /// Sample indices belonging to this bucket.
    pub indices: Vec<usize>,
}

impl Bucket {
    pub fn new(size: usize, indices: Vec<usize>) -> Self {
        Self { size, indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Groups sample lengths into at most `k` buckets.
///
/// Implementations must return buckets whose member lists partition
/// `0..lengths.len()`: every sample index appears in exactly one bucket.
pub trait Clusterer: Send + Sync {
    fn cluster(&self, lengths: &[usize], k: usize) -> Result<Vec<Bucket>>;
}

/// One-dimensional k-means over the distinct length values, weighted by how
/// often each length occurs.
///
/// Initial centroids are taken at evenly spaced quantiles of the distinct
/// values, so results are deterministic. `k` is clamped to the number of
/// distinct lengths. The representative size of a bucket is its rounded
/// centroid.
#[derive(Debug, Clone)]
pub struct KMeans {
    max_iterations: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

impl KMeans {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    /// Returns one cluster label per distinct value, plus the centroids.
    fn fit(&self, values: &[f64], weights: &[f64], k: usize) -> (Vec<usize>, Vec<f64>) {
        let n = values.len();
        let mut centroids: Vec<f64> = (0..k).map(|i| values[(2 * i + 1) * n / (2 * k)]).collect();
        let mut labels = vec![0usize; n];

        for _ in 0..self.max_iterations {
            for (j, &x) in values.iter().enumerate() {
                labels[j] = nearest(&centroids, x);
            }
            repair_empty_clusters(values, &centroids, &mut labels, k);

            let mut sums = vec![0.0f64; k];
            let mut totals = vec![0.0f64; k];
            for j in 0..n {
                sums[labels[j]] += values[j] * weights[j];
                totals[labels[j]] += weights[j];
            }
            let updated: Vec<f64> = sums
                .iter()
                .zip(&totals)
                .zip(&centroids)
                .map(|((&s, &t), &old)| if t > 0.0 { s / t } else { old })
                .collect();

            if updated == centroids {
                break;
            }
            centroids = updated;
        }

        (labels, centroids)
    }
}

impl Clusterer for KMeans {
    fn cluster(&self, lengths: &[usize], k: usize) -> Result<Vec<Bucket>> {
        ensure!(k > 0, "Number of buckets must be greater than 0");
        if lengths.is_empty() {
            return Ok(Vec::new());
        }

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for &len in lengths {
            *counts.entry(len).or_default() += 1;
        }
        let k_eff = k.min(counts.len());
        if k_eff < k {
            warn!(
                requested = k,
                distinct = counts.len(),
                "fewer distinct lengths than buckets, clamping bucket count"
            );
        }

        let values: Vec<f64> = counts.keys().map(|&v| v as f64).collect();
        let weights: Vec<f64> = counts.values().map(|&c| c as f64).collect();
        let (labels, centroids) = self.fit(&values, &weights, k_eff);

        let label_of: HashMap<usize, usize> = counts.keys().copied().zip(labels).collect();
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); k_eff];
        for (index, len) in lengths.iter().enumerate() {
            members[label_of[len]].push(index);
        }

        Ok(members
            .into_iter()
            .zip(centroids)
            .filter(|(indices, _)| !indices.is_empty())
            .map(|(indices, centroid)| Bucket::new(centroid.round() as usize, indices))
            .collect())
    }
}

fn nearest(centroids: &[f64], x: f64) -> usize {
    let mut best = 0;
    for (i, c) in centroids.iter().enumerate().skip(1) {
        if (x - c).abs() < (x - centroids[best]).abs() {
            best = i;
        }
    }
    best
}

/// Moves the farthest point of the most populated cluster into each empty
/// cluster until none is empty. Requires `k <= values.len()`.
fn repair_empty_clusters(values: &[f64], centroids: &[f64], labels: &mut [usize], k: usize) {
    loop {
        let mut sizes = vec![0usize; k];
        for &label in labels.iter() {
            sizes[label] += 1;
        }
        let Some(empty) = sizes.iter().position(|&s| s == 0) else {
            return;
        };
        let biggest = (0..k).max_by_key(|&c| sizes[c]).unwrap_or(0);
        if sizes[biggest] < 2 {
            return;
        }

        let farthest = (0..values.len())
            .filter(|&j| labels[j] == biggest)
            .max_by(|&a, &b| {
                let da = (values[a] - centroids[biggest]).abs();
                let db = (values[b] - centroids[biggest]).abs();
                da.total_cmp(&db)
            });
        match farthest {
            Some(j) => labels[j] = empty,
            None => return,
        }
    }
}
