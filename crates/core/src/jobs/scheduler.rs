// crates/core/src/jobs/scheduler.rs
//! Deferred task execution for the job driver.
//!
//! `TokioScheduler` runs tasks on timers in the current Tokio runtime.
//! `ManualScheduler` keeps a virtual clock that only moves when told to,
//! so a whole job schedule can be stepped through without waiting.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once `delay` has elapsed. Must not block the caller.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Spawns one timer task per scheduled item. Needs a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task();
        });
    }
}

#[derive(Default)]
struct VirtualClock {
    now: Duration,
    seq: u64,
    /// Keyed by (due time, insertion order) so equal deadlines run FIFO.
    queue: BTreeMap<(Duration, u64), Task>,
}

/// Scheduler on a virtual clock. Tasks run inside [`advance`](Self::advance)
/// on the calling thread, and may schedule further tasks.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<VirtualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock(&self) -> MutexGuard<'_, VirtualClock> {
        self.clock.lock().unwrap_or_else(|poisoned| {
            tracing::error!("ManualScheduler mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.clock().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.clock().queue.len()
    }

    /// Move the clock forward by `by`, running every task that falls due,
    /// in deadline order. Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock().now + by;
        let mut ran = 0;
        loop {
            // The lock is released before running the task so it can
            // schedule follow-ups.
            let task = {
                let mut clock = self.clock();
                let next_due = clock.queue.first_key_value().map(|(&(due, _), _)| due);
                match next_due {
                    Some(due) if due <= target => {
                        clock.now = due;
                        clock.queue.pop_first().map(|(_, task)| task)
                    }
                    _ => {
                        clock.now = target;
                        None
                    }
                }
            };
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Advance until no tasks remain. Returns how many tasks ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next_due = {
                let clock = self.clock();
                clock
                    .queue
                    .first_key_value()
                    .map(|(&(due, _), _)| due.saturating_sub(clock.now))
            };
            match next_due {
                Some(wait) => ran += self.advance(wait),
                None => return ran,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut clock = self.clock();
        let due = clock.now + delay;
        let seq = clock.seq;
        clock.seq += 1;
        clock.queue.insert((due, seq), task);
    }
}
