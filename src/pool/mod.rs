//! Execution backends for independent batch tasks
//!
//! All backends share one contract: results come back in task order, and the first task error
//! is fatal to the whole batch. A panicking task is reported as [PoolError::WorkerLost]. No task is retried or cancelled once dispatched.

use crate::error::PoolError;

use enum_dispatch::enum_dispatch;
use std::num::NonZeroUsize;

mod message_passing;
pub use message_passing::MessagePassingPool;

mod multi;
pub use multi::MultiPool;

mod serial;
pub use serial::SerialPool;

#[enum_dispatch]
pub trait PoolTrait {
    /// Number of tasks that may run at the same time
    fn size(&self) -> usize;

    /// Apply `worker` to every task and collect results in task order
    fn map<T, R, E, F>(&self, worker: F, tasks: Vec<T>) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send + From<PoolError>,
        F: Fn(T) -> Result<R, E> + Sync;
}

#[enum_dispatch(PoolTrait)]
#[derive(Clone, Debug)]
pub enum Pool {
    Serial(SerialPool),
    Multi(MultiPool),
    MessagePassing(MessagePassingPool),
}

impl Pool {
    /// Message passing if `mpi` is set, a thread pool for more than one process, serial otherwise
    pub fn select(procs: NonZeroUsize, mpi: bool) -> Self {
        let pool: Self = if mpi {
            MessagePassingPool::from_env().into()
        } else if procs.get() > 1 {
            MultiPool::new(procs).into()
        } else {
            SerialPool.into()
        };
        tracing::info!("using {pool:?} with {} worker(s)", pool.size());
        pool
    }
}

impl Default for Pool {
    fn default() -> Self {
        SerialPool.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TaskError {
        Odd(u32),
        Pool(String),
    }

    impl From<PoolError> for TaskError {
        fn from(value: PoolError) -> Self {
            Self::Pool(value.to_string())
        }
    }

    fn pools() -> Vec<Pool> {
        vec![
            SerialPool.into(),
            MultiPool::new(NonZeroUsize::new(3).unwrap()).into(),
            MessagePassingPool::new(NonZeroUsize::new(3).unwrap()).into(),
        ]
    }

    #[test]
    fn results_in_task_order() {
        for pool in pools() {
            let squares = pool
                .map(|x: u32| Ok::<_, TaskError>(x * x), (0..50).collect())
                .unwrap();
            assert_eq!(squares, (0..50).map(|x| x * x).collect::<Vec<_>>(), "{pool:?}");
        }
    }

    #[test]
    fn empty_batch() {
        for pool in pools() {
            let results: Vec<u32> = pool.map(Ok::<_, TaskError>, vec![]).unwrap();
            assert!(results.is_empty());
        }
    }

    #[test]
    fn task_error_is_fatal() {
        for pool in pools() {
            let err = pool
                .map(
                    |x: u32| {
                        if x == 7 {
                            Err(TaskError::Odd(x))
                        } else {
                            Ok(x)
                        }
                    },
                    (0..20).collect(),
                )
                .unwrap_err();
            assert_eq!(err, TaskError::Odd(7), "{pool:?}");
        }
    }

    #[test]
    fn panicking_task_loses_worker() {
        for pool in pools() {
            let err = pool
                .map(
                    |x: u32| -> Result<u32, TaskError> {
                        if x == 5 {
                            panic!("task {x} panicked");
                        }
                        Ok(x)
                    },
                    (0..20).collect(),
                )
                .unwrap_err();
            assert!(
                matches!(err, TaskError::Pool(ref msg) if msg.contains("stopped before returning")),
                "{pool:?}: {err:?}"
            );
        }
    }

    #[test]
    fn selection() {
        let one = NonZeroUsize::MIN;
        let four = NonZeroUsize::new(4).unwrap();
        assert!(matches!(Pool::select(one, false), Pool::Serial(_)));
        assert!(matches!(Pool::select(four, false), Pool::Multi(p) if p.size() == 4));
        assert!(matches!(Pool::select(one, true), Pool::MessagePassing(_)));
    }
}
