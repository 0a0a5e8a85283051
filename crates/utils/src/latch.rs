//! One-shot readiness latch.
//!
//! Marks the moment a project's baseline context is known. Waiters block (or
//! await) with a bound and learn whether readiness arrived in time.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Default)]
pub struct ReadyLatch {
    ready: Mutex<bool>,
    condvar: Condvar,
    notify: Notify,
}

impl ReadyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the latch. Later calls are no-ops.
    pub fn mark_ready(&self) {
        let mut ready = self.ready.lock();
        if !*ready {
            *ready = true;
            self.condvar.notify_all();
            self.notify.notify_waiters();
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    /// Block the current thread until ready or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ready = self.ready.lock();
        while !*ready {
            if self.condvar.wait_until(&mut ready, deadline).timed_out() {
                return *ready;
            }
        }
        true
    }

    /// Await readiness for at most `timeout`.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_ready() {
            return true;
        }
        tokio::time::timeout(timeout, notified).await.is_ok() || self.is_ready()
    }
}
