//! Worker pool implementation for parallel batch assembly.
//!
//! Each worker owns one bounded output channel. The consumer reads the
//! channels in a fixed round-robin order, which keeps batch order
//! deterministic no matter how fast individual workers run.
//!
//! # Key features
//! - Bounded channels cap memory and block producers when full
//! - Graceful shutdown on drop
//! - Generic over output type

use anyhow::{ensure, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Thread pool with one bounded output channel per worker.
///
/// - Output channels: Workers -> Main thread (one per worker)
/// - Shutdown flag: checked by workers between batches
pub(crate) struct WorkerPool<Output> {
    workers: Vec<thread::JoinHandle<()>>,
    pub(crate) output_rxs: Vec<Receiver<Output>>,
    shutdown: Arc<AtomicBool>,
}

impl<Output> WorkerPool<Output>
where
    Output: Send + 'static,
{
    /// Spawns `num_workers` threads running `worker_fn(worker_id, output_tx, shutdown)`.
    /// Each output channel holds at most `buffer_size` items.
    pub(crate) fn new<F>(num_workers: usize, buffer_size: usize, worker_fn: F) -> Result<Self>
    where
        F: Fn(usize, Sender<Output>, Arc<AtomicBool>) + Send + Sync + 'static,
    {
        ensure!(
            num_workers > 0,
            "Cannot create WorkerPool with 0 workers. \
            Either set num_workers > 0 or use single-threaded mode."
        );
        ensure!(
            buffer_size > 0,
            "Cannot create WorkerPool with buffer_size 0. \
            Buffer size must be > 0 to prevent deadlocks."
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_fn = Arc::new(worker_fn);
        let mut workers = Vec::with_capacity(num_workers);
        let mut output_rxs = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (output_tx, output_rx) = bounded(buffer_size);
            let shutdown_clone = shutdown.clone();
            let worker_fn_clone = worker_fn.clone();

            let handle = thread::Builder::new()
                .name(format!("dataloader-worker-{}", worker_id))
                .spawn(move || worker_fn_clone(worker_id, output_tx, shutdown_clone))
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            workers.push(handle);
            output_rxs.push(output_rx);
        }
        debug!(num_workers, buffer_size, "spawned worker pool");

        Ok(Self {
            workers,
            output_rxs,
            shutdown,
        })
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.output_rxs.len()
    }

    /// Items currently waiting in all output channels.
    pub(crate) fn buffered(&self) -> usize {
        self.output_rxs.iter().map(Receiver::len).sum()
    }
}

impl<Output> Drop for WorkerPool<Output> {
    fn drop(&mut self) {
        // Signal shutdown to all workers
        self.shutdown.store(true, Ordering::Relaxed);

        // Dropping the receivers unblocks workers stuck on a full channel
        self.output_rxs.clear();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
