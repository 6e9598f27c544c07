/// Task group and status channel for fan-out/fan-in work.
///
/// A `TaskGroup` counts in-flight tasks. Each task holds a `TaskGuard` for its
/// lifetime; dropping the last guard wakes everyone blocked in `wait()`.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use crate::models::StatusMessage;

/// Producer side of the status channel. Cloned into every fetch task.
pub type StatusSink = mpsc::UnboundedSender<StatusMessage>;

/// Consumer side of the status channel. Owned by the coordinator.
pub type StatusStream = mpsc::UnboundedReceiver<StatusMessage>;

/// Create the multi-producer, single-consumer status channel.
///
/// The stream yields `None` once every sink clone has been dropped.
pub fn status_channel() -> (StatusSink, StatusStream) {
    mpsc::unbounded_channel()
}

struct Inner {
    /// Tasks added but not yet finished.
    in_flight: AtomicUsize,
    /// Signalled when `in_flight` drops to zero.
    idle: Notify,
}

/// Wait-group over a dynamic set of tasks.
#[derive(Clone)]
pub struct TaskGroup {
    inner: Arc<Inner>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Register one more task. The slot is released when the guard drops.
    pub fn add(&self) -> TaskGuard {
        let now = self.inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Task group: {} in flight", now);
        TaskGuard {
            inner: self.inner.clone(),
        }
    }

    /// Number of tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Block until no tasks are in flight. Returns immediately if none were added.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a release between the
            // check and the await is not lost.
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of membership in a `TaskGroup`.
pub struct TaskGuard {
    inner: Arc<Inner>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("Task group drained");
            self.inner.idle.notify_waiters();
        }
    }
}
