use crate::error::PoolError;
use crate::pool::PoolTrait;

use std::env;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

/// Environment variables carrying the world size of an MPI-style launch
const WORLD_SIZE_VARS: [&str; 2] = ["OMPI_COMM_WORLD_SIZE", "PMI_SIZE"];

/// Controller plus worker ranks exchanging messages over channels
///
/// The calling thread acts as the controller: it hands one task to every idle worker, waits for a
/// result and refills that worker until no tasks remain. Workers never talk to each other.
#[derive(Clone, Copy, Debug)]
pub struct MessagePassingPool {
    workers: NonZeroUsize,
}

enum Message<R, E> {
    Done {
        rank: usize,
        index: usize,
        result: Result<R, E>,
    },
    Lost {
        rank: usize,
    },
}

impl MessagePassingPool {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    /// Size the pool from the launcher's world size, or from the machine if not launched as a job
    ///
    /// One rank of the world is the controller, the rest are workers.
    pub fn from_env() -> Self {
        let world_size = WORLD_SIZE_VARS
            .iter()
            .find_map(|var| env::var(var).ok()?.trim().parse().ok());
        let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::new(worker_count(world_size, available))
    }
}

fn worker_count(world_size: Option<usize>, available_parallelism: usize) -> NonZeroUsize {
    let world_size = world_size.unwrap_or(available_parallelism);
    NonZeroUsize::new(world_size.saturating_sub(1)).unwrap_or(NonZeroUsize::MIN)
}

impl PoolTrait for MessagePassingPool {
    fn size(&self) -> usize {
        self.workers.get()
    }

    fn map<T, R, E, F>(&self, worker: F, tasks: Vec<T>) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send + From<PoolError>,
        F: Fn(T) -> Result<R, E> + Sync,
    {
        let n_tasks = tasks.len();
        let n_workers = self.workers.get().min(n_tasks);
        if n_workers == 0 {
            return Ok(vec![]);
        }

        thread::scope(|scope| -> Result<Vec<R>, E> {
            let (result_tx, result_rx) = mpsc::channel();
            let task_txs: Vec<_> = (0..n_workers)
                .map(|rank| {
                    let (task_tx, task_rx) = mpsc::channel::<(usize, T)>();
                    let result_tx = result_tx.clone();
                    let worker = &worker;
                    thread::Builder::new()
                        .name(format!("torus-rank-{}", rank + 1))
                        .spawn_scoped(scope, move || {
                            for (index, task) in task_rx {
                                let message =
                                    match panic::catch_unwind(AssertUnwindSafe(|| worker(task))) {
                                        Ok(result) => Message::Done {
                                            rank,
                                            index,
                                            result,
                                        },
                                        Err(_) => Message::Lost { rank },
                                    };
                                let lost = matches!(message, Message::Lost { .. });
                                if result_tx.send(message).is_err() || lost {
                                    break;
                                }
                            }
                        })
                        .map(|_| task_tx)
                        .map_err(|_| PoolError::WorkerLost(rank + 1))
                })
                .collect::<Result<_, _>>()?;
            drop(result_tx);

            let mut pending = tasks.into_iter().enumerate();
            let mut results: Vec<Option<R>> = (0..n_tasks).map(|_| None).collect();
            let mut in_flight = 0;
            for task_tx in &task_txs {
                if let Some(task) = pending.next() {
                    // Workers only hang up after the controller does
                    let _ = task_tx.send(task);
                    in_flight += 1;
                }
            }

            while in_flight > 0 {
                let message = result_rx
                    .recv()
                    .map_err(|_| PoolError::WorkerLost(0))?;
                in_flight -= 1;
                match message {
                    Message::Done {
                        rank,
                        index,
                        result,
                    } => {
                        results[index] = Some(result?);
                        if let Some(task) = pending.next() {
                            task_txs[rank]
                                .send(task)
                                .map_err(|_| PoolError::WorkerLost(rank + 1))?;
                            in_flight += 1;
                        }
                    }
                    Message::Lost { rank } => {
                        tracing::error!("worker rank {} panicked", rank + 1);
                        return Err(PoolError::WorkerLost(rank + 1).into());
                    }
                }
            }
            drop(task_txs);

            results
                .into_iter()
                .enumerate()
                .map(|(index, result)| {
                    result.ok_or_else(|| PoolError::WorkerLost(index % n_workers + 1).into())
                })
                .collect()
        })
    }
}
