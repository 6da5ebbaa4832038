//! Bounded worker pool for per-symbol tasks.
//!
//! A private rayon pool runs one task per input. Each finished task stores
//! its result in a shared slot table and signals on an mpsc channel. The
//! collector waits up to `task_timeout` for each completion; once a wait
//! expires, every task still outstanding is abandoned and its slot stays
//! `None`. Abandoned tasks may keep running in the background; their late
//! results are discarded once the collector has taken the slot table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use trendscan_core::data::FetchConfig;

use crate::config::PipelineConfig;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// min(max_parallel, max(2, cpus)).
pub fn default_threads(max_parallel: usize) -> usize {
    let cpus = std::thread::available_parallelism().map_or(2, |n| n.get());
    max_parallel.min(cpus.max(2)).max(1)
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    task_timeout: Duration,
    panics: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(threads: usize, task_timeout: Duration) -> Result<Self, PoolError> {
        let panics = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&panics);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("trendscan-worker-{i}"))
            .panic_handler(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                warn!("worker task panicked; its result is dropped");
            })
            .build()?;
        Ok(Self {
            pool,
            task_timeout,
            panics,
        })
    }

    pub fn from_config(fetch: &FetchConfig, pipeline: &PipelineConfig) -> Result<Self, PoolError> {
        let threads = pipeline
            .threads
            .unwrap_or_else(|| default_threads(fetch.max_parallel));
        Self::new(threads, Duration::from_secs(pipeline.task_timeout_secs))
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Tasks that panicked over the lifetime of this pool.
    pub fn panicked(&self) -> usize {
        self.panics.load(Ordering::Relaxed)
    }

    /// Run `task` over every item. The returned slots line up with `items`;
    /// `None` marks a task that was abandoned or panicked.
    pub fn run<I, T, F>(&self, items: Vec<I>, task: F) -> Vec<Option<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> T + Send + Sync + 'static,
    {
        let total = items.len();
        let slots: Arc<Mutex<Vec<Option<T>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));
        let task = Arc::new(task);
        let (done_tx, done_rx) = mpsc::channel::<usize>();

        for (index, item) in items.into_iter().enumerate() {
            let slots = Arc::clone(&slots);
            let task = Arc::clone(&task);
            let done_tx = done_tx.clone();
            self.pool.spawn(move || {
                let result = task(item);
                let mut guard = slots.lock().unwrap_or_else(PoisonError::into_inner);
                // The table is empty once the collector has given up on us.
                if let Some(slot) = guard.get_mut(index) {
                    *slot = Some(result);
                }
                drop(guard);
                let _ = done_tx.send(index);
            });
        }
        // Only the tasks hold senders now; disconnect means none are left.
        drop(done_tx);

        let mut completed = 0;
        while completed < total {
            match done_rx.recv_timeout(self.task_timeout) {
                Ok(_) => completed += 1,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        outstanding = total - completed,
                        timeout_secs = self.task_timeout.as_secs(),
                        "abandoning tasks that did not finish in time"
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let mut guard = slots.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}
