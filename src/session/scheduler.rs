//! Deferred and background execution for the capture protocol.
//!
//! The fallback timer and the persist worker both run through a
//! [`Scheduler`]. Production code uses plain threads; tests drive a
//! [`ManualScheduler`] whose clock only moves when told to.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay or on a worker context.
pub trait Scheduler: Send + Sync {
    /// Runs `task` once `delay` has elapsed. There is no cancellation.
    fn schedule(&self, delay: Duration, task: Task);

    /// Runs `task` on a worker context, off the calling thread.
    fn spawn(&self, task: Task);
}

/// Scheduler backed by OS threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let spawned = thread::Builder::new()
            .name("capture-timer".into())
            .spawn(move || {
                thread::sleep(delay);
                task();
            });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "Failed to spawn timer thread");
        }
    }

    fn spawn(&self, task: Task) {
        if let Err(e) = thread::Builder::new()
            .name("capture-persist".into())
            .spawn(task)
        {
            tracing::error!(error = %e, "Failed to spawn persist worker");
        }
    }
}

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: Vec<Pending>,
}

/// Virtual-time scheduler for deterministic tests.
///
/// Nothing runs until [`advance`](Self::advance) or
/// [`run_pending`](Self::run_pending) is called. Tasks run in due-time
/// order (ties in submission order) on the calling thread, and tasks
/// scheduled by running tasks are picked up in the same call if due.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks not yet run.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Moves the clock forward by `by`, running every task due on the way.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;
        while let Some(task) = self.pop_due(target) {
            task();
        }
        let mut state = self.lock();
        if state.now < target {
            state.now = target;
        }
    }

    /// Runs every task due at the current time without moving the clock.
    pub fn run_pending(&self) {
        self.advance(Duration::ZERO);
    }

    fn pop_due(&self, target: Duration) -> Option<Task> {
        let mut state = self.lock();
        let position = state
            .queue
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(i, _)| i)?;
        let pending = state.queue.swap_remove(position);
        if pending.due > state.now {
            state.now = pending.due;
        }
        Some(pending.task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut state = self.lock();
        let pending = Pending {
            due: state.now + delay,
            seq: state.next_seq,
            task,
        };
        state.next_seq += 1;
        state.queue.push(pending);
    }

    fn spawn(&self, task: Task) {
        self.schedule(Duration::ZERO, task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}
