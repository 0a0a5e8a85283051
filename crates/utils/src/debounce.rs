//! Trailing debouncer.
//!
//! Each `queue` call restarts a fixed quiet period. Only the most recently
//! queued action runs, once, after the period elapses without another call.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Default)]
struct DebounceState {
    generation: u64,
    pending: Option<JoinHandle<()>>,
    disposed: bool,
}

pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    handle: Handle,
    state: Arc<Mutex<DebounceState>>,
}

impl Debouncer {
    /// Create a debouncer whose timers run on `handle`
    pub fn new(name: &'static str, delay: Duration, handle: Handle) -> Self {
        Self {
            name,
            delay,
            handle,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action`, replacing anything queued before it.
    pub fn queue<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let delay = self.delay;
        let name = self.name;

        state.pending = Some(self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = shared.lock();
                if state.disposed || state.generation != generation {
                    return;
                }
                state.pending = None;
            }
            trace!(debouncer = name, "Running debounced action");
            action();
        }));
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Cancel pending work and refuse new work.
    pub fn dispose(&self) {
        self.cancel();
        self.state.lock().disposed = true;
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.dispose();
    }
}
