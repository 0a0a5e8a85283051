//! Dispatch-thread marker and the modal progress seam.
//!
//! An embedding application marks its UI thread with
//! [`mark_dispatch_thread`]. Synchronous cache misses on that thread block
//! behind [`ProgressHost::run_modal`] instead of freezing silently.

use std::cell::Cell;
use tracing::{debug, info};

thread_local! {
    static DISPATCH_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Mark the current thread as the application's dispatch thread.
pub fn mark_dispatch_thread() {
    DISPATCH_THREAD.with(|flag| flag.set(true));
}

pub fn unmark_dispatch_thread() {
    DISPATCH_THREAD.with(|flag| flag.set(false));
}

pub fn is_dispatch_thread() -> bool {
    DISPATCH_THREAD.with(Cell::get)
}

/// Shows a modal progress indicator while a blocking wait runs.
pub trait ProgressHost: Send + Sync {
    /// Display `title`, call `wait` (which blocks until the result arrives or
    /// the bounded wait expires), then dismiss. Returning without calling
    /// `wait` counts as the user cancelling.
    fn run_modal(&self, title: &str, wait: &mut dyn FnMut());
}

/// Host without a UI: logs the title and blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressHost for LogProgress {
    fn run_modal(&self, title: &str, wait: &mut dyn FnMut()) {
        info!("{title}...");
        wait();
        debug!("{title} finished");
    }
}
