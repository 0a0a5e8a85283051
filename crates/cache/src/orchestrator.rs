//! Command cache orchestrator
//!
//! Wraps [`CacheService`] with the calling-context rules of a project:
//!
//! - a hit is returned synchronously with no thread hop;
//! - a miss waits (bounded) for the project's baseline context, then computes
//!   through the compute-once store;
//! - every miss is bounded by the stuck-command timeout, and expiry surfaces
//!   as [`Cancelled`], never as a [`misebridge_core::CommandError`];
//! - synchronous callers on the dispatch thread block behind a modal progress
//!   host, other synchronous callers block on a channel.
//!
//! Lifecycle events invalidate command results and trigger re-warming.

use crate::progress::{is_dispatch_thread, LogProgress, ProgressHost};
use crate::service::CacheService;
use crate::warming::CacheWarmer;
use misebridge_core::{
    CacheKey, Cancelled, CommandResult, ProjectEvent, ProjectEventKind, PROJECT_READY_TIMEOUT,
    STUCK_COMMAND_TIMEOUT,
};
use misebridge_utils::{block_outside_runtime, ReadyLatch};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Outcome of an orchestrated lookup: cancellation outside, command result inside.
pub type CachedResult<T> = Result<CommandResult<T>, Cancelled>;

struct Inner {
    project: String,
    service: Arc<CacheService>,
    ready: Arc<ReadyLatch>,
    handle: Handle,
    progress: RwLock<Arc<dyn ProgressHost>>,
    warmer: RwLock<Option<Arc<dyn CacheWarmer>>>,
    warm_task: Mutex<Option<JoinHandle<()>>>,
    stuck_timeout: Duration,
    ready_timeout: Duration,
    disposed: AtomicBool,
}

/// Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct CommandCache {
    inner: Arc<Inner>,
}

impl CommandCache {
    pub fn new(
        project: impl Into<String>,
        service: Arc<CacheService>,
        ready: Arc<ReadyLatch>,
        handle: Handle,
    ) -> Self {
        Self::with_timeouts(
            project,
            service,
            ready,
            handle,
            STUCK_COMMAND_TIMEOUT,
            PROJECT_READY_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        project: impl Into<String>,
        service: Arc<CacheService>,
        ready: Arc<ReadyLatch>,
        handle: Handle,
        stuck_timeout: Duration,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                project: project.into(),
                service,
                ready,
                handle,
                progress: RwLock::new(Arc::new(LogProgress)),
                warmer: RwLock::new(None),
                warm_task: Mutex::new(None),
                stuck_timeout,
                ready_timeout,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_progress_host(&self, host: Arc<dyn ProgressHost>) {
        *self.inner.progress.write() = host;
    }

    pub fn attach_warmer(&self, warmer: Arc<dyn CacheWarmer>) {
        *self.inner.warmer.write() = Some(warmer);
    }

    pub fn service(&self) -> &Arc<CacheService> {
        &self.inner.service
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn stuck_timeout(&self) -> Duration {
        self.inner.stuck_timeout
    }

    pub fn get_if_cached<K: CacheKey>(&self, key: &K) -> Option<K::Output> {
        self.inner.service.get_if_cached_command(key)
    }

    /// Cached value for `key`, or compute it within the stuck-command limit.
    ///
    /// Dropping the returned future cancels the computation.
    pub async fn get_cached<K, F, Fut>(&self, key: &K, compute: F) -> CachedResult<K::Output>
    where
        K: CacheKey,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CommandResult<K::Output>>,
    {
        if let Some(value) = self.get_if_cached(key) {
            trace!(key = %key.key(), "Command cache hit");
            return Ok(Ok(value));
        }
        if self.is_disposed() {
            return Err(Cancelled::disposed(key.key()));
        }

        let ready = self.inner.ready.clone();
        let ready_timeout = self.inner.ready_timeout;
        let work = self.inner.service.get_cached_command(key, || async move {
            if !ready.wait(ready_timeout).await {
                warn!(
                    "Project context not ready after {ready_timeout:?}, computing without it"
                );
            }
            compute().await
        });

        match tokio::time::timeout(self.inner.stuck_timeout, work).await {
            Ok(result) => Ok(result),
            Err(_) => {
                warn!(
                    key = %key.key(),
                    "Command did not finish within {:?}, cancelling",
                    self.inner.stuck_timeout
                );
                Err(Cancelled::timed_out(key.key(), self.inner.stuck_timeout))
            }
        }
    }

    /// Synchronous [`Self::get_cached`], safe to call from any plain thread.
    ///
    /// A miss runs on the project runtime. On the dispatch thread the wait
    /// happens inside [`ProgressHost::run_modal`]. On timeout or interruption
    /// the background work is aborted before `Cancelled` is returned. Must not
    /// be called from a current-thread runtime.
    pub fn get_cached_with_progress<K, F, Fut>(&self, key: &K, compute: F) -> CachedResult<K::Output>
    where
        K: CacheKey + Clone + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CommandResult<K::Output>> + Send + 'static,
    {
        if let Some(value) = self.get_if_cached(key) {
            trace!(key = %key.key(), "Command cache hit");
            return Ok(Ok(value));
        }
        if self.is_disposed() {
            return Err(Cancelled::disposed(key.key()));
        }

        let operation = key.key();
        let title = key.progress_title();
        debug!(key = %operation, "Command cache miss, computing in background");

        let (tx, rx) = mpsc::sync_channel(1);
        let this = self.clone();
        let owned_key = key.clone();
        let task = self.inner.handle.spawn(async move {
            let outcome = this.get_cached(&owned_key, compute).await;
            let _ = tx.send(outcome);
        });

        let deadline = self.inner.stuck_timeout;
        let mut received = None;
        {
            let mut wait = || received = Some(rx.recv_timeout(deadline));
            if is_dispatch_thread() {
                trace!(key = %operation, "Dispatch thread, using modal progress");
                let host = self.inner.progress.read().clone();
                host.run_modal(&title, &mut wait);
            } else {
                block_outside_runtime(wait);
            }
        }

        match received {
            Some(Ok(outcome)) => outcome,
            Some(Err(RecvTimeoutError::Timeout)) => {
                task.abort();
                warn!(key = %operation, "Gave up waiting after {deadline:?}");
                Err(Cancelled::timed_out(operation, deadline))
            }
            Some(Err(RecvTimeoutError::Disconnected)) | None => {
                task.abort();
                if self.is_disposed() {
                    Err(Cancelled::disposed(operation))
                } else {
                    Err(Cancelled::interrupted(operation))
                }
            }
        }
    }

    /// Reaction to a project event.
    ///
    /// Invalidation completes before this returns; re-warming is spawned.
    pub fn handle_event(&self, event: &ProjectEvent) {
        if self.is_disposed() {
            return;
        }
        match event.kind {
            ProjectEventKind::Startup => self.warm(),
            kind if kind.invalidates_commands() => {
                info!(
                    project = %self.inner.project,
                    "Project event {kind} ({}), invalidating entire cache",
                    event.reason
                );
                self.inner.service.invalidate_all_commands();
                self.warm();
            }
            _ => {}
        }
    }

    /// Spawn the attached warmer, replacing any warm still running.
    pub fn warm(&self) {
        if self.is_disposed() {
            return;
        }
        let Some(warmer) = self.inner.warmer.read().clone() else {
            return;
        };
        let this = self.clone();
        let task = self.inner.handle.spawn(async move {
            if this.is_disposed() {
                return;
            }
            debug!(project = %this.inner.project, "Warming command cache");
            warmer.warm().await;
            debug!(project = %this.inner.project, "Command cache warmed");
        });
        if let Some(previous) = self.inner.warm_task.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Stop warming and refuse new misses. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.warmer.write().take();
        if let Some(task) = self.inner.warm_task.lock().take() {
            task.abort();
        }
        debug!(project = %self.inner.project, "Command cache disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{mark_dispatch_thread, unmark_dispatch_thread};
    use async_trait::async_trait;
    use misebridge_core::{CancelReason, CommandError};
    use misebridge_utils::AsyncRuntime;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Debug, Clone)]
    struct TestKey(&'static str);

    impl CacheKey for TestKey {
        type Output = String;

        fn key(&self) -> String {
            format!("test:{}", self.0)
        }

        fn progress_title(&self) -> String {
            format!("Loading {}", self.0)
        }
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn ready_cache(handle: Handle, stuck: Duration) -> CommandCache {
        let ready = Arc::new(ReadyLatch::new());
        ready.mark_ready();
        CommandCache::with_timeouts(
            "test",
            Arc::new(CacheService::new()),
            ready,
            handle,
            stuck,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let cache = ready_cache(Handle::current(), Duration::from_secs(5));
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_cached(&TestKey("env"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("vars".to_string())
                })
                .await
                .unwrap()
                .unwrap();
            assert_eq!(value, "vars");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_a_value_not_cancellation() {
        let cache = ready_cache(Handle::current(), Duration::from_secs(5));
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let outcome = cache
                .get_cached(&TestKey("ls"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CommandError::not_trusted("mise ls", "/work/mise.toml"))
                })
                .await;
            assert!(matches!(outcome, Ok(Err(CommandError::NotTrusted { .. }))));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_compute_is_cancelled() {
        let cache = ready_cache(Handle::current(), Duration::from_secs(10));
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = dropped.clone();

        let outcome = cache
            .get_cached(&TestKey("stuck"), || async move {
                let _guard = DropFlag(flag);
                std::future::pending::<CommandResult<String>>().await
            })
            .await;

        let cancelled = outcome.unwrap_err();
        assert_eq!(cancelled.reason, CancelReason::TimedOut(Duration::from_secs(10)));
        assert!(dropped.load(Ordering::SeqCst));
        assert!(cache.get_if_cached(&TestKey("stuck")).is_none());
    }

    #[tokio::test]
    async fn test_unready_project_still_computes() {
        let cache = CommandCache::with_timeouts(
            "test",
            Arc::new(CacheService::new()),
            Arc::new(ReadyLatch::new()),
            Handle::current(),
            Duration::from_secs(5),
            Duration::from_millis(20),
        );
        let value = cache
            .get_cached(&TestKey("early"), || async { Ok("ok".to_string()) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[test]
    fn test_sync_caller_off_runtime() {
        let runtime = AsyncRuntime::owned().unwrap();
        let cache = ready_cache(runtime.handle().clone(), Duration::from_secs(5));

        let value = cache
            .get_cached_with_progress(&TestKey("tasks"), || async { Ok("tasks".to_string()) })
            .unwrap()
            .unwrap();
        assert_eq!(value, "tasks");
        assert_eq!(cache.get_if_cached(&TestKey("tasks")).as_deref(), Some("tasks"));
    }

    #[test]
    fn test_sync_timeout_aborts_background_work() {
        let runtime = AsyncRuntime::owned().unwrap();
        let cache = ready_cache(runtime.handle().clone(), Duration::from_millis(100));
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = dropped.clone();

        let outcome = cache.get_cached_with_progress(&TestKey("hang"), move || async move {
            let _guard = DropFlag(flag);
            std::future::pending::<CommandResult<String>>().await
        });
        assert!(outcome.unwrap_err().is_timeout());

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !dropped.load(Ordering::SeqCst) && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    struct RecordingHost(parking_lot::Mutex<Vec<String>>);

    impl ProgressHost for RecordingHost {
        fn run_modal(&self, title: &str, wait: &mut dyn FnMut()) {
            self.0.lock().push(title.to_string());
            wait();
        }
    }

    #[test]
    fn test_dispatch_thread_uses_modal_progress() {
        let runtime = AsyncRuntime::owned().unwrap();
        let cache = ready_cache(runtime.handle().clone(), Duration::from_secs(5));
        let host = Arc::new(RecordingHost(parking_lot::Mutex::new(Vec::new())));
        cache.set_progress_host(host.clone());

        mark_dispatch_thread();
        let value = cache
            .get_cached_with_progress(&TestKey("tools"), || async { Ok("node".to_string()) })
            .unwrap()
            .unwrap();
        // Hits never show progress
        cache
            .get_cached_with_progress(&TestKey("tools"), || async { Ok("other".to_string()) })
            .unwrap()
            .unwrap();
        unmark_dispatch_thread();

        assert_eq!(value, "node");
        assert_eq!(*host.0.lock(), vec!["Loading tools".to_string()]);
    }

    struct CountingWarmer {
        cache: CommandCache,
        calls: Arc<AtomicUsize>,
        done: Arc<Notify>,
    }

    #[async_trait]
    impl CacheWarmer for CountingWarmer {
        async fn warm(&self) {
            let calls = self.calls.clone();
            let _ = self
                .cache
                .get_cached(&TestKey("env"), || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(format!("v{n}"))
                })
                .await;
            self.done.notify_one();
        }
    }

    #[tokio::test]
    async fn test_invalidate_then_rewarm() {
        let cache = ready_cache(Handle::current(), Duration::from_secs(5));
        let calls = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Notify::new());
        cache.attach_warmer(Arc::new(CountingWarmer {
            cache: cache.clone(),
            calls: calls.clone(),
            done: done.clone(),
        }));

        cache.handle_event(&ProjectEvent::new(ProjectEventKind::Startup, "opened"));
        done.notified().await;
        assert_eq!(cache.get_if_cached(&TestKey("env")).as_deref(), Some("v1"));

        cache.handle_event(&ProjectEvent::new(
            ProjectEventKind::ConfigChanged,
            "mise.toml changed",
        ));
        assert!(cache.get_if_cached(&TestKey("env")).is_none());

        done.notified().await;
        assert_eq!(cache.get_if_cached(&TestKey("env")).as_deref(), Some("v2"));
        cache.dispose();
    }

    #[tokio::test]
    async fn test_startup_and_redraw_events_keep_entries() {
        let cache = ready_cache(Handle::current(), Duration::from_secs(5));
        cache
            .get_cached(&TestKey("env"), || async { Ok("kept".to_string()) })
            .await
            .unwrap()
            .unwrap();

        cache.handle_event(&ProjectEvent::new(ProjectEventKind::Startup, "opened"));
        cache.handle_event(&ProjectEvent::new(
            ProjectEventKind::TaskCacheRefreshed,
            "tasks",
        ));
        assert_eq!(cache.get_if_cached(&TestKey("env")).as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_disposed_cache_refuses_misses() {
        let cache = ready_cache(Handle::current(), Duration::from_secs(5));
        cache
            .get_cached(&TestKey("env"), || async { Ok("hit".to_string()) })
            .await
            .unwrap()
            .unwrap();
        cache.dispose();

        let hit = cache
            .get_cached(&TestKey("env"), || async { Ok("unused".to_string()) })
            .await;
        assert_eq!(hit.unwrap().unwrap(), "hit");

        let miss = cache
            .get_cached(&TestKey("ls"), || async { Ok("unused".to_string()) })
            .await;
        assert_eq!(miss.unwrap_err().reason, CancelReason::Disposed);
    }
}
