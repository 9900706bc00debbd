use crate::error::PoolError;
use crate::pool::PoolTrait;

use std::panic::{self, AssertUnwindSafe};

/// Run tasks one by one in the calling thread
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialPool;

impl PoolTrait for SerialPool {
    fn size(&self) -> usize {
        1
    }

    fn map<T, R, E, F>(&self, worker: F, tasks: Vec<T>) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send + From<PoolError>,
        F: Fn(T) -> Result<R, E> + Sync,
    {
        tasks
            .into_iter()
            .map(|task| {
                panic::catch_unwind(AssertUnwindSafe(|| worker(task))).unwrap_or_else(|_| {
                    tracing::error!("serial worker panicked");
                    Err(PoolError::WorkerLost(1).into())
                })
            })
            .collect()
    }
}
