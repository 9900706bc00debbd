use crate::error::PoolError;
use crate::pool::PoolTrait;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

/// Bounded pool of worker threads
///
/// A fresh rayon pool is built per batch so that the bound holds regardless of the global pool.
/// When several tasks fail, which of their errors is returned is unspecified.
#[derive(Clone, Copy, Debug)]
pub struct MultiPool {
    processes: NonZeroUsize,
}

impl MultiPool {
    pub fn new(processes: NonZeroUsize) -> Self {
        Self { processes }
    }
}

impl PoolTrait for MultiPool {
    fn size(&self) -> usize {
        self.processes.get()
    }

    fn map<T, R, E, F>(&self, worker: F, tasks: Vec<T>) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send + From<PoolError>,
        F: Fn(T) -> Result<R, E> + Sync,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.processes.get())
            .thread_name(|i| format!("torus-worker-{i}"))
            .build()
            .map_err(PoolError::from)?;
        pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| {
                    panic::catch_unwind(AssertUnwindSafe(|| worker(task))).unwrap_or_else(|_| {
                        let rank = rayon::current_thread_index().map_or(0, |i| i + 1);
                        tracing::error!("worker thread {rank} panicked");
                        Err(PoolError::WorkerLost(rank).into())
                    })
                })
                .collect()
        })
    }
}
