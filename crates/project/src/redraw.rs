//! Debounced redraw requests.
//!
//! `TaskCacheRefreshed` means "data changed, redraw", not "data is stale".
//! Bursts of refreshes collapse into one callback.

use misebridge_core::{ProjectEvent, ProjectEventKind, REDRAW_DEBOUNCE};
use misebridge_utils::Debouncer;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

pub type RedrawCallback = Arc<dyn Fn() + Send + Sync>;

pub struct RedrawTrigger {
    debouncer: Debouncer,
    callback: RedrawCallback,
}

impl RedrawTrigger {
    pub fn new(callback: RedrawCallback, handle: Handle) -> Self {
        Self::with_delay(callback, REDRAW_DEBOUNCE, handle)
    }

    pub fn with_delay(callback: RedrawCallback, delay: Duration, handle: Handle) -> Self {
        Self {
            debouncer: Debouncer::new("redraw", delay, handle),
            callback,
        }
    }

    pub fn handle_event(&self, event: &ProjectEvent) {
        if event.kind != ProjectEventKind::TaskCacheRefreshed {
            return;
        }
        let callback = Arc::clone(&self.callback);
        self.debouncer.queue(move || {
            debug!("Redrawing after task cache refresh");
            callback();
        });
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn dispose(&self) {
        self.debouncer.dispose();
    }
}
