use misebridge_core::{Error, Result};
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Runtime handle a project schedules its background work on.
///
/// Inside an existing multi-threaded runtime the ambient handle is reused;
/// otherwise a dedicated runtime is built and owned.
pub struct AsyncRuntime {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl AsyncRuntime {
    /// Reuse the ambient multi-threaded runtime, or build one
    pub fn current_or_owned() -> Result<Self> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                Ok(Self::from_handle(handle))
            }
            _ => Self::owned(),
        }
    }

    /// Build a dedicated multi-threaded runtime
    pub fn owned() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("misebridge-worker")
            .enable_all()
            .build()
            .map_err(|e| Error::runtime(format!("failed to create tokio runtime: {e}")))?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    /// Check if we're already in an async context
    #[must_use]
    pub fn is_in_async_context() -> bool {
        Handle::try_current().is_ok()
    }
}

impl Drop for AsyncRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Helper function to run async code from sync context safely
pub fn run_async<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if AsyncRuntime::is_in_async_context() {
        return Err(Error::runtime(
            "cannot use block_on from within an async runtime",
        ));
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::runtime(format!("failed to create tokio runtime: {e}")))?;
    runtime.block_on(future)
}

/// Run blocking work, moving off a runtime worker first when on one.
///
/// On a multi-threaded worker the worker hands its queue to another thread
/// before `f` blocks. On a current-thread runtime `f` simply blocks.
pub fn block_outside_runtime<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_runtime_outside_async_context() {
        let runtime = AsyncRuntime::current_or_owned().unwrap();
        assert!(runtime.owns_runtime());
        let value = runtime.handle().block_on(async { 21 * 2 });
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reuses_ambient_multi_thread_runtime() {
        let runtime = AsyncRuntime::current_or_owned().unwrap();
        assert!(!runtime.owns_runtime());
        let doubled = runtime.handle().spawn(async { 4 * 2 }).await.unwrap();
        assert_eq!(doubled, 8);
        assert_eq!(block_outside_runtime(|| 7), 7);
    }

    #[test]
    fn test_run_async_from_sync_context() {
        let value = run_async(async { Ok::<_, Error>(5) }).unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_run_async_refuses_nested_runtime() {
        assert!(run_async(async { Ok::<_, Error>(()) }).is_err());
    }
}
