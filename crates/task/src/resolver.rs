//! Background task cache
//!
//! Readers never block: they get the last computed list (or nothing) and a
//! refresh is queued when the entry is missing or stale. At most one refresh
//! runs at a time; requests that arrive meanwhile collapse into one follow-up
//! run for the most recently requested environment.

use crate::sources::TaskSources;
use async_trait::async_trait;
use dashmap::DashMap;
use misebridge_command::MiseHelper;
use misebridge_config::ConfigFileResolver;
use misebridge_core::{same_ui_content, EventBus, MiseTask, ProjectEvent, ProjectEventKind};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace, warn};

/// Inputs the resolver needs from the rest of the project.
#[async_trait]
pub trait TaskEnvironment: Send + Sync {
    /// The configured `MISE_ENV`, if any.
    fn configured_environment(&self) -> Option<String>;

    /// Output of `mise config --tracked-configs`, or `None` when unavailable.
    async fn tracked_config_paths(&self) -> Option<Vec<String>>;
}

#[async_trait]
impl TaskEnvironment for MiseHelper {
    fn configured_environment(&self) -> Option<String> {
        MiseHelper::configured_environment(self)
    }

    async fn tracked_config_paths(&self) -> Option<Vec<String>> {
        match self.tracked_configs().await {
            Ok(Ok(paths)) => Some(paths),
            Ok(Err(e)) => {
                debug!(error = %e, "Tracked configs unavailable, using fallback discovery");
                None
            }
            Err(cancelled) => {
                debug!(%cancelled, "Tracked configs unavailable, using fallback discovery");
                None
            }
        }
    }
}

type TaskList = Arc<Vec<MiseTask>>;

struct Inner {
    base_dir: PathBuf,
    environment: Arc<dyn TaskEnvironment>,
    configs: Arc<ConfigFileResolver>,
    events: EventBus,
    handle: Handle,
    cache: DashMap<Option<String>, TaskList>,
    stale: DashMap<Option<String>, bool>,
    in_flight: AtomicBool,
    pending: AtomicBool,
    pending_environment: Mutex<Option<String>>,
    refresh_task: Mutex<Option<AbortHandle>>,
    disposed: AtomicBool,
}

#[derive(Clone)]
pub struct TaskResolver {
    inner: Arc<Inner>,
}

impl TaskResolver {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        environment: Arc<dyn TaskEnvironment>,
        configs: Arc<ConfigFileResolver>,
        events: EventBus,
        handle: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_dir: base_dir.into(),
                environment,
                configs,
                events,
                handle,
                cache: DashMap::new(),
                stale: DashMap::new(),
                in_flight: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                pending_environment: Mutex::new(None),
                refresh_task: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    fn environment_key(&self, config_environment: Option<&str>) -> Option<String> {
        match config_environment {
            Some(env) => Some(env.to_string()).filter(|env| !env.trim().is_empty()),
            None => self
                .inner
                .environment
                .configured_environment()
                .filter(|env| !env.trim().is_empty()),
        }
    }

    /// Last computed tasks for the environment (the configured one when
    /// `None`). Queues a refresh when nothing is cached or the entry is stale.
    pub fn cached_tasks_or_empty(&self, config_environment: Option<&str>) -> TaskList {
        let env = self.environment_key(config_environment);
        let cached = self.inner.cache.get(&env).map(|entry| Arc::clone(entry.value()));
        if cached.is_none() || self.is_stale(&env) {
            trace!(environment = ?env, "Task cache miss or stale, queueing refresh");
            self.queue_refresh(env);
        }
        cached.unwrap_or_default()
    }

    fn is_stale(&self, env: &Option<String>) -> bool {
        self.inner.stale.get(env).map(|flag| *flag).unwrap_or(false)
    }

    /// Flag cached lists for recomputation. `None` flags every cached
    /// environment plus the configured one.
    pub fn mark_stale(&self, config_environment: Option<&str>) {
        match config_environment {
            Some(_) => {
                let env = self.environment_key(config_environment);
                self.inner.stale.insert(env, true);
            }
            None => {
                let mut envs: Vec<Option<String>> =
                    self.inner.cache.iter().map(|entry| entry.key().clone()).collect();
                envs.push(self.environment_key(None));
                for env in envs {
                    self.inner.stale.insert(env, true);
                }
            }
        }
    }

    /// Queue a background refresh for the environment (configured one when
    /// `None`). Returns the spawned task, or `None` when the request was
    /// folded into the running refresh.
    pub fn refresh(&self, config_environment: Option<&str>) -> Option<JoinHandle<()>> {
        self.queue_refresh(self.environment_key(config_environment))
    }

    fn queue_refresh(&self, env: Option<String>) -> Option<JoinHandle<()>> {
        if self.is_disposed() {
            return None;
        }
        // Recorded before claiming the slot, so a refresh finishing in
        // between still sees it.
        *self.inner.pending_environment.lock() = env;
        self.inner.pending.store(true, Ordering::SeqCst);
        self.start_pending()
    }

    /// Run the pending request if no refresh holds the slot.
    fn start_pending(&self) -> Option<JoinHandle<()>> {
        loop {
            if self
                .inner
                .in_flight
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                trace!("Task refresh already running, deferring");
                return None;
            }
            if self.inner.pending.swap(false, Ordering::SeqCst) {
                break;
            }
            self.inner.in_flight.store(false, Ordering::SeqCst);
            if !self.inner.pending.load(Ordering::SeqCst) {
                return None;
            }
        }
        if self.is_disposed() {
            self.inner.in_flight.store(false, Ordering::SeqCst);
            return None;
        }

        let env = self.inner.pending_environment.lock().take();
        let this = self.clone();
        let task = self.inner.handle.spawn(async move {
            if this.compute_tasks(env.as_deref()).await.is_none() {
                warn!(environment = ?env, "Failed to refresh task cache");
            }
            this.finish_refresh();
        });
        *self.inner.refresh_task.lock() = Some(task.abort_handle());
        Some(task)
    }

    /// Release the slot and pick up whatever was requested meanwhile.
    fn finish_refresh(&self) -> Option<JoinHandle<()>> {
        self.inner.in_flight.store(false, Ordering::SeqCst);
        self.start_pending()
    }

    /// Read every task source now, store the result and announce it if the
    /// visible content changed. `None` when the blocking read failed.
    pub async fn compute_tasks(&self, config_environment: Option<&str>) -> Option<TaskList> {
        let env = self.environment_key(config_environment);
        let tracked = self.inner.environment.tracked_config_paths().await;

        let base_dir = self.inner.base_dir.clone();
        let configs = Arc::clone(&self.inner.configs);
        let lookup_env = env.clone();
        let collected = self.inner.handle.spawn_blocking(move || {
            let env = lookup_env.as_deref();
            let all = configs.resolve(&base_dir, env, tracked.as_deref(), true);
            let local = configs.resolve(&base_dir, env, tracked.as_deref(), false);
            TaskSources::new(base_dir, all.to_vec(), local.to_vec()).collect()
        })
        .await;

        let tasks = match collected {
            Ok(tasks) => Arc::new(tasks),
            Err(e) => {
                warn!(error = %e, "Task discovery did not complete");
                return None;
            }
        };
        debug!(environment = ?env, count = tasks.len(), "Computed mise tasks");
        self.write_cache(env.clone(), Arc::clone(&tasks));
        self.inner.stale.insert(env, false);
        Some(tasks)
    }

    fn write_cache(&self, env: Option<String>, tasks: TaskList) {
        let previous = self.inner.cache.insert(env.clone(), Arc::clone(&tasks));
        let previous = previous.as_deref().map(Vec::as_slice).unwrap_or_default();
        if !same_ui_content(previous, &tasks) && !self.is_disposed() {
            self.inner.events.broadcast(ProjectEvent::new(
                ProjectEventKind::TaskCacheRefreshed,
                format!(
                    "mise task cache was refreshed for {}",
                    env.as_deref().unwrap_or("default environment")
                ),
            ));
        }
    }

    pub fn handle_event(&self, event: &ProjectEvent) {
        match event.kind {
            ProjectEventKind::Startup => {
                self.refresh(None);
            }
            ProjectEventKind::ConfigChanged | ProjectEventKind::SettingsChanged => {
                self.inner.configs.clear();
                self.mark_stale(None);
                self.refresh(None);
            }
            _ => {}
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.inner.refresh_task.lock().take() {
            task.abort();
        }
        self.inner.cache.clear();
        self.inner.stale.clear();
    }
}
