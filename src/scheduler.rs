//! Bounded task scheduler.
//!
//! Work items run on worker threads, at most `max_parallel` at a time.
//! Submitting starts a worker when a slot is free; a worker that finishes
//! an item takes the next queued one itself, in submission order, and exits
//! when the queue is empty. Every queue and counter change happens under one
//! mutex, so concurrent completions can never start more workers than the
//! limit allows.
//!
//! A panicking work item does not take the scheduler down: the panic is
//! caught and logged, the worker moves on, and [`Scheduler::join`] reports
//! every panic once all work is done.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Default concurrency limit.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static IN_TASK: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is running a scheduled work item.
///
/// Panics raised while this is true are caught by the scheduler.
pub fn in_task() -> bool {
    IN_TASK.with(Cell::get)
}

/// Errors reported by the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// One or more work items panicked
    #[error("{count} task(s) panicked: {}", .messages.join("; "))]
    TasksPanicked { count: usize, messages: Vec<String> },

    /// A worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Default)]
struct State {
    queue: VecDeque<Job>,
    running: usize,
    completed: usize,
    workers: Vec<JoinHandle<()>>,
    panics: Vec<String>,
}

struct Inner {
    max_parallel: usize,
    state: Mutex<State>,
    idle: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs submitted closures with a fixed concurrency ceiling.
///
/// Cloning gives another handle to the same scheduler, so work items may
/// submit further work.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARALLEL)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Scheduler")
            .field("max_parallel", &self.inner.max_parallel)
            .field("running", &state.running)
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler running at most `max_parallel` items at once.
    /// A limit of 0 is treated as 1.
    pub fn new(max_parallel: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_parallel: max_parallel.max(1),
                state: Mutex::new(State::default()),
                idle: Condvar::new(),
            }),
        }
    }

    /// Queue `work` and start it right away if a slot is free.
    ///
    /// # Errors
    /// Returns [`SchedulerError::Spawn`] if a needed worker thread couldn't
    /// be started. The item stays queued and is picked up by the next free
    /// worker or by [`join`](Self::join).
    pub fn submit<F>(&self, work: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.lock();
        state.queue.push_back(Box::new(work));
        if state.running < self.inner.max_parallel {
            self.launch(&mut state)?;
        }
        Ok(())
    }

    /// Block until every submitted item has finished and all worker threads
    /// have exited. Never times out.
    ///
    /// # Errors
    /// Returns [`SchedulerError::TasksPanicked`] if any item panicked since
    /// the last join.
    pub fn join(&self) -> Result<(), SchedulerError> {
        let (workers, panics) = loop {
            let mut state = self.inner.lock();
            while state.running > 0 {
                state = self
                    .inner
                    .idle
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            // Only possible if a worker failed to spawn earlier
            if !state.queue.is_empty() {
                let wanted = state.queue.len().min(self.inner.max_parallel);
                for _ in 0..wanted {
                    self.launch(&mut state)?;
                }
                continue;
            }

            break (
                std::mem::take(&mut state.workers),
                std::mem::take(&mut state.panics),
            );
        };

        for worker in workers {
            // Work items are unwound inside the worker, so this can't fail
            let _ = worker.join();
        }

        if panics.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::TasksPanicked {
                count: panics.len(),
                messages: panics,
            })
        }
    }

    /// Concurrency limit.
    pub fn max_parallel(&self) -> usize {
        self.inner.max_parallel
    }

    /// Number of live workers, each running at most one item.
    pub fn running(&self) -> usize {
        self.inner.lock().running
    }

    /// Number of items waiting for a worker.
    pub fn queued(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Number of items that have finished, panicked or not.
    pub fn completed(&self) -> usize {
        self.inner.lock().completed
    }

    fn launch(&self, state: &mut State) -> Result<(), SchedulerError> {
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("parallax-worker".into())
            .spawn(move || run_worker(inner))
            .map_err(SchedulerError::Spawn)?;
        state.running += 1;
        state.workers.push(handle);
        Ok(())
    }
}

fn run_worker(inner: Arc<Inner>) {
    loop {
        let job = {
            let mut state = inner.lock();
            match state.queue.pop_front() {
                Some(job) => job,
                None => {
                    state.running -= 1;
                    inner.idle.notify_all();
                    return;
                }
            }
        };

        IN_TASK.with(|flag| flag.set(true));
        let outcome = panic::catch_unwind(AssertUnwindSafe(job));
        IN_TASK.with(|flag| flag.set(false));

        let mut state = inner.lock();
        state.completed += 1;
        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            log::error!("task panicked: {}", message);
            state.panics.push(message);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
