//! src/dataloader/mod.rs
//!
//! This module implements the `DataLoader`.
//!
//! The `DataLoader` coordinates the `TextDataset`, a batch `Sampler`, and a
//! `Collator` to stream padded batches with bounded prefetching.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌─────────────┐
//!                   │ TextDataset │ (fields, lengths, buckets)
//!                   └──────┬──────┘
//!                          │ buckets / length
//!                          ↓
//!                     ┌─────────┐
//!                     │ Sampler │ (Buckets or Sequential; one plan per epoch)
//!                     └────┬────┘
//!                          │ Vec<usize> per batch
//!                          ↓
//!                   ┌──────────────┐
//!                   │  DataLoader  │ ←───── Config (batch_size, workers, capacity)
//!                   └──────┬───────┘
//!                          │
//!                   [Worker Threads] (optional, bounded per-worker channels)
//!                          │
//!                          ↓
//!                    ┌──────────┐
//!                    │ Collator │ (transpose + pad per field)
//!                    └────┬─────┘
//!                         ↓
//!                   ┌───────────┐
//!                   │ MiniBatch │
//!                   └───────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/dataloader/
//! ├── mod.rs             # Public API exports + module-level architecture docs
//! ├── config.rs          # DataLoaderConfig, builder, JSON loading, validation
//! ├── loader.rs          # DataLoader struct, constructors and `batchify`
//! ├── iterator/
//! │   └── mod.rs         # DataLoaderIter (single-threaded and prefetching)
//! └── workers/
//!     ├── mod.rs
//!     ├── pool.rs        # Generic `WorkerPool<Output>` with per-worker channels
//!     └── prefetch.rs    # Batch assembly and epoch producers
//! ```
//!
//! # Example Usage
//!
//! ## Bucketed, shuffled, single-threaded:
//! ```ignore
//! let dataset = TextDataset::builder().fields(specs).buckets(32).build(&corpus)?;
//! let config = DataLoaderConfig::builder()
//!     .batch_size(5000)
//!     .shuffle(true)
//!     .seed(42)
//!     .build();
//!
//! let dataloader = batchify(dataset, config)?;
//! for batch in dataloader.iter()? {
//!     let batch: MiniBatch = batch?;
//!     let words = batch.padded("word")?;
//! }
//! ```
//!
//! ## With producer threads
//! ```ignore
//! let config = DataLoaderConfig::builder()
//!     .num_workers(4)
//!     .prefetch_capacity(16)
//!     .build();
//! ```
//!
//! # Memory Usage
//! - `num_workers = 0`: one batch at a time
//! - `num_workers > 0`: at most `prefetch_capacity` assembled batches plus
//!   one in progress per worker

mod config;
mod iterator;
mod loader;
mod workers;

// Public re-exports
pub use config::{
    DataLoaderConfig, DataLoaderConfigBuilder, DEFAULT_BATCH_SIZE, DEFAULT_PREFETCH_CAPACITY,
};
pub use iterator::DataLoaderIter;
pub use loader::{batchify, DataLoader};
