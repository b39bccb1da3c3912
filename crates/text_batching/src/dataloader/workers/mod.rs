//! Worker management for parallel batch assembly.
//!
//! - `pool`: Worker pool with one bounded output channel per worker
//! - `prefetch`: Producers that assemble batches of one epoch

pub(crate) mod pool;
pub(crate) mod prefetch;
