//! Fixed-size worker pool for index construction.
//!
//! Workers pull boxed tasks from a shared queue guarded by a mutex and sleep on
//! a condition variable while it is empty. The pool moves through
//! `Running -> Draining -> Stopped`; draining workers finish whatever is still
//! queued (graceful) or find the queue already emptied (immediate) and exit.

use crate::error::{IndexError, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Accepting tasks
    Running,
    /// No new tasks; workers exit once the queue is empty
    Draining,
    /// All workers joined
    Stopped,
}

/// How [`BuildPool::shutdown`] treats queued tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Run every queued task, then stop
    Graceful,
    /// Drop tasks that have not started; in-flight tasks still finish
    Immediate,
}

struct Queue {
    tasks: VecDeque<Task>,
    state: PoolState,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

impl Shared {
    // Tasks never run under the lock, so a poisoned guard still holds a
    // consistent queue.
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Worker pool that runs one build task per k value.
pub struct BuildPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    /// Id handed to the next spawned worker; ids are never reused
    next_id: usize,
}

impl BuildPool {
    /// Start a pool of `size` workers (0 = available parallelism).
    ///
    /// Fails atomically: if any worker cannot be spawned the ones already
    /// started are joined before the error is returned.
    pub fn new(size: usize) -> Result<Self> {
        let mut pool = Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    tasks: VecDeque::new(),
                    state: PoolState::Running,
                }),
                available: Condvar::new(),
            }),
            workers: Vec::new(),
            next_id: 0,
        };
        pool.spawn_workers(effective_size(size))?;
        info!(workers = pool.size(), "build pool started");
        Ok(pool)
    }

    /// Number of live workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn state(&self) -> PoolState {
        self.shared.lock().state
    }

    /// Tasks waiting for a worker
    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    /// Queue a task. Fails with [`IndexError::PoolStopped`] once shutdown began.
    pub fn execute<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.lock();
        if queue.state != PoolState::Running {
            return Err(IndexError::PoolStopped);
        }
        queue.tasks.push_back(Box::new(task));
        drop(queue);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Stop the pool and join every worker. Returns the number of queued tasks
    /// that were discarded (always 0 for a graceful shutdown).
    pub fn shutdown(&mut self, mode: ShutdownMode) -> usize {
        let discarded = {
            let mut queue = self.shared.lock();
            if queue.state == PoolState::Stopped {
                return 0;
            }
            queue.state = PoolState::Draining;
            match mode {
                ShutdownMode::Graceful => 0,
                ShutdownMode::Immediate => {
                    let n = queue.tasks.len();
                    queue.tasks.clear();
                    n
                }
            }
        };
        if discarded > 0 {
            warn!(discarded, "immediate shutdown dropped queued build tasks");
        }
        self.join_workers();
        self.shared.lock().state = PoolState::Stopped;
        info!(?mode, discarded, "build pool stopped");
        discarded
    }

    /// Replace the worker set with `size` fresh workers (0 = available
    /// parallelism). Queued tasks run to completion on the old workers first.
    ///
    /// On spawn failure the pool ends up stopped.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        let size = effective_size(size);
        {
            let mut queue = self.shared.lock();
            if queue.state != PoolState::Running {
                return Err(IndexError::PoolStopped);
            }
            queue.state = PoolState::Draining;
        }
        let old = self.size();
        self.join_workers();

        self.shared.lock().state = PoolState::Running;
        self.spawn_workers(size)?;
        info!(from = old, to = size, "build pool resized");
        Ok(())
    }

    fn spawn_workers(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            let id = self.next_id;
            self.next_id += 1;
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("kmx-build-{}", id))
                .spawn(move || worker_loop(id, &shared));
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    error!(worker = id, error = %e, "failed to spawn build worker");
                    self.shared.lock().state = PoolState::Draining;
                    self.join_workers();
                    self.shared.lock().state = PoolState::Stopped;
                    return Err(IndexError::Spawn(e));
                }
            }
        }
        Ok(())
    }

    fn join_workers(&mut self) {
        self.shared.available.notify_all();
        for handle in self.workers.drain(..) {
            // worker_loop catches task panics, so join only fails if the
            // loop itself panicked
            if handle.join().is_err() {
                error!("build worker exited abnormally");
            }
        }
    }
}

impl Drop for BuildPool {
    fn drop(&mut self) {
        self.shutdown(ShutdownMode::Graceful);
    }
}

impl std::fmt::Debug for BuildPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPool")
            .field("workers", &self.size())
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish()
    }
}

fn effective_size(size: usize) -> usize {
    if size == 0 {
        thread::available_parallelism().map_or(1, |n| n.get())
    } else {
        size
    }
}

fn worker_loop(id: usize, shared: &Shared) {
    debug!(worker = id, "build worker started");
    loop {
        let task = {
            let mut queue = shared.lock();
            loop {
                if let Some(task) = queue.tasks.pop_front() {
                    break Some(task);
                }
                if queue.state != PoolState::Running {
                    break None;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        let Some(task) = task else {
            break;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(worker = id, panic = %message, "build task panicked");
        }
    }
    debug!(worker = id, "build worker exited");
}
