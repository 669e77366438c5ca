//! Worker pools and the concurrency gate used by async join groups.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{MqlError, MqlResult};

/// A unit of work submitted to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs join tasks. Callers may supply their own per join, e.g. an inline
/// executor for deterministic tests.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task);
}

impl<F> TaskExecutor for F
where
    F: Fn(Task) + Send + Sync,
{
    fn execute(&self, task: Task) {
        self(task)
    }
}

/// Engine-owned default pool backed by rayon.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize, thread_name_prefix: &str) -> MqlResult<Self> {
        let prefix = thread_name_prefix.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .panic_handler(|_| tracing::error!("Join task panicked on worker pool"))
            .build()
            .map_err(|e| MqlError::WorkerPool(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl TaskExecutor for WorkerPool {
    fn execute(&self, task: Task) {
        self.pool.spawn(task);
    }
}

/// Counting gate bounding the number of in-flight tasks of one join group.
///
/// A permit is acquired on the dispatching thread before a task is submitted
/// and released when the task's [`GatePermit`] drops. The single dispatcher
/// acquires in row order, so waiting tasks are admitted FIFO.
pub struct ConcurrencyGate {
    limit: usize,
    in_flight: Mutex<usize>,
    released: Condvar,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit: limit.max(1),
            in_flight: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    /// Block until a slot is free.
    pub fn acquire(self: &Arc<Self>) -> GatePermit {
        let mut in_flight = self.in_flight.lock();
        while *in_flight >= self.limit {
            self.released.wait(&mut in_flight);
        }
        *in_flight += 1;

        GatePermit {
            gate: Arc::clone(self),
        }
    }
}

pub struct GatePermit {
    gate: Arc<ConcurrencyGate>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let mut in_flight = self.gate.in_flight.lock();
        *in_flight -= 1;
        self.gate.released.notify_one();
    }
}
