//! src/dataloader/config.rs
//!
//! Configuration for DataLoader behaviour
//!
//! The `DataLoaderConfig` struct stores the parameters that control how
//! batches are planned and delivered. It can be built in code or read from
//! JSON; missing JSON keys take their defaults.
//!
//! Example:
//! ```ignore
//! let config = DataLoaderConfig::builder()
//!     .batch_size(5000)
//!     .shuffle(true)
//!     .seed(42)
//!     .num_workers(2)
//!     .build();
//!
//! let config = DataLoaderConfig::from_json_str(r#"{ "batch_size": 3000, "shuffle": true }"#)?;
//! ```
//!
//! # Performance considerations:
//! - `batch_size`: a token budget for bucketed sampling, a sentence count
//!   for sequential sampling
//! - `prefetch_capacity`: upper bound on assembled batches held in memory
//!   ahead of the consumer
//! - `num_workers`: more workers assemble batches faster but each one
//!   holds its share of the prefetch capacity

use crate::collator::PaddingSide;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default token budget per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5000;
/// Default number of batches buffered ahead of the consumer.
pub const DEFAULT_PREFETCH_CAPACITY: usize = 10;

/// Configuration for DataLoader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataLoaderConfig {
    /// Token budget per batch for bucketed sampling; number of sentences
    /// per batch for sequential sampling.
    pub batch_size: usize,
    /// Whether to permute bucket order and bucket members each epoch
    pub shuffle: bool,
    /// Base seed for shuffling. A random seed is drawn when unset.
    pub seed: Option<u64>,
    /// Use contiguous batches in dataset order instead of length buckets
    pub sequential_sampler: bool,
    /// Number of producer threads (0 = batches are assembled on the
    /// consumer's thread)
    pub num_workers: usize,
    /// Maximum number of assembled batches buffered ahead of the consumer
    pub prefetch_capacity: usize,
    /// Which side of the sequence axis receives padding
    pub padding_side: PaddingSide,
    /// Maximum time to wait for the next batch from workers. `None` waits
    /// indefinitely. Written as `timeout_ms` in JSON.
    #[serde(rename = "timeout_ms", with = "timeout_millis")]
    pub timeout: Option<Duration>,
}

/// `Option<Duration>` as an optional whole number of milliseconds.
mod timeout_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(timeout: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        timeout
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            shuffle: false,
            seed: None,
            sequential_sampler: false,
            num_workers: 0,
            prefetch_capacity: DEFAULT_PREFETCH_CAPACITY,
            padding_side: PaddingSide::Right,
            timeout: None,
        }
    }
}

impl DataLoaderConfig {
    pub fn builder() -> DataLoaderConfigBuilder {
        DataLoaderConfigBuilder::default()
    }

    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse DataLoader config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "Batch size must be greater than 0");
        ensure!(
            self.prefetch_capacity > 0,
            "Prefetch capacity must be greater than 0"
        );
        if let Some(timeout) = self.timeout {
            ensure!(!timeout.is_zero(), "Timeout must be non-zero when set");
        }
        Ok(())
    }
}

/// Builder for DataLoaderConfig with method chaining
#[derive(Debug, Clone, Default)]
pub struct DataLoaderConfigBuilder {
    config: DataLoaderConfig,
}

impl DataLoaderConfigBuilder {
    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set whether to shuffle every epoch
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    /// Set the base seed for reproducible shuffling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn sequential_sampler(mut self, sequential: bool) -> Self {
        self.config.sequential_sampler = sequential;
        self
    }

    /// Set the number of workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    /// Use one worker per available CPU, or none.
    pub fn multiprocess(mut self, enabled: bool) -> Self {
        self.config.num_workers = if enabled {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            0
        };
        self
    }

    pub fn prefetch_capacity(mut self, capacity: usize) -> Self {
        self.config.prefetch_capacity = capacity;
        self
    }

    pub fn padding_side(mut self, side: PaddingSide) -> Self {
        self.config.padding_side = side;
        self
    }

    /// Set the timeout for receiving a batch from workers.
    ///
    /// - Too low: May fail during legitimate heavy processing
    /// - Too high: Delays detection of stuck workers.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> DataLoaderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = DataLoaderConfig::default();
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.prefetch_capacity, 10);
        assert_eq!(config.padding_side, PaddingSide::Right);
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = DataLoaderConfig::builder()
            .batch_size(100)
            .shuffle(true)
            .seed(7)
            .num_workers(3)
            .padding_side(PaddingSide::Left)
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.batch_size, 100);
        assert!(config.shuffle);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.padding_side, PaddingSide::Left);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));

        let serial = DataLoaderConfig::builder().multiprocess(false).build();
        assert_eq!(serial.num_workers, 0);
        assert!(DataLoaderConfig::builder().multiprocess(true).build().num_workers >= 1);
    }

    #[test]
    fn test_json_partial_and_round_trip() -> Result<()> {
        let config = DataLoaderConfig::from_json_str(
            r#"{ "batch_size": 300, "sequential_sampler": true, "padding_side": "left" }"#,
        )?;
        assert_eq!(config.batch_size, 300);
        assert!(config.sequential_sampler);
        assert_eq!(config.padding_side, PaddingSide::Left);
        assert_eq!(config.prefetch_capacity, DEFAULT_PREFETCH_CAPACITY);

        let json = serde_json::to_string(&config)?;
        assert_eq!(DataLoaderConfig::from_json_str(&json)?, config);
        Ok(())
    }

    #[test]
    fn test_json_timeout_in_millis() -> Result<()> {
        let config = DataLoaderConfig::from_json_str(r#"{ "num_workers": 2, "timeout_ms": 1500 }"#)?;
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));

        let json = serde_json::to_value(&config)?;
        assert_eq!(json["timeout_ms"], 1500);
        assert_eq!(DataLoaderConfig::from_json_str(&json.to_string())?, config);

        let unset = serde_json::to_value(DataLoaderConfig::default())?;
        assert!(unset["timeout_ms"].is_null());
        assert!(DataLoaderConfig::from_json_str(r#"{ "timeout_ms": 0 }"#).is_err());
        Ok(())
    }

    #[test]
    fn test_json_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, r#"{{ "shuffle": true, "seed": 11 }}"#)?;
        let config = DataLoaderConfig::from_json_file(file.path())?;
        assert!(config.shuffle);
        assert_eq!(config.seed, Some(11));
        Ok(())
    }

    #[test]
    fn test_validation() {
        assert!(DataLoaderConfig::from_json_str(r#"{ "batch_size": 0 }"#).is_err());
        assert!(DataLoaderConfig::builder()
            .prefetch_capacity(0)
            .build()
            .validate()
            .is_err());
        assert!(DataLoaderConfig::builder()
            .timeout(Duration::ZERO)
            .build()
            .validate()
            .is_err());
        assert!(DataLoaderConfig::from_json_str("not json").is_err());
    }
}
