//! One open project and everything wired to its event bus.

use crate::listener::ConfigFileListener;
use crate::options::ProjectOptions;
use crate::redraw::RedrawTrigger;
use crate::watcher::ConfigWatcher;
use misebridge_cache::{CacheService, CommandCache};
use misebridge_command::{
    CommandContext, ExecutableDetector, ExecutableManager, HelperWarmer, MiseHelper,
    ProcessExecutor, TokioProcessExecutor,
};
use misebridge_config::{ConfigFileResolver, EffectiveSettings};
use misebridge_core::{EventBus, ProjectEvent, ProjectEventKind, Result, Subscription};
use misebridge_shell::ProjectInfo;
use misebridge_task::{TaskEnvironment, TaskResolver};
use misebridge_utils::{AsyncRuntime, ReadyLatch};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

static NEXT_PROJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying an open project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u64);

impl ProjectId {
    fn next() -> Self {
        Self(NEXT_PROJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project-{}", self.0)
    }
}

pub struct Project {
    id: ProjectId,
    name: String,
    info: Arc<ProjectInfo>,
    runtime: AsyncRuntime,
    events: EventBus,
    ready: Arc<ReadyLatch>,
    helper: Arc<MiseHelper>,
    tasks: TaskResolver,
    listener: Arc<ConfigFileListener>,
    redraw: Option<Arc<RedrawTrigger>>,
    watcher: Mutex<Option<Arc<ConfigWatcher>>>,
    subscriptions: Mutex<Vec<Subscription>>,
    disposed: AtomicBool,
}

impl Project {
    /// Detect the host, build the project's services, wire them to the bus
    /// and broadcast `Startup`.
    pub fn open(
        work_dir: impl Into<PathBuf>,
        settings: EffectiveSettings,
        options: ProjectOptions,
    ) -> Result<Arc<Self>> {
        let work_dir = work_dir.into();
        let runtime = match options.handle {
            Some(handle) => AsyncRuntime::from_handle(handle),
            None => AsyncRuntime::current_or_owned()?,
        };
        let handle = runtime.handle().clone();
        let id = ProjectId::next();
        let name = work_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| work_dir.display().to_string());

        let info = Arc::new(
            options
                .project_info
                .unwrap_or_else(|| ProjectInfo::detect(work_dir.clone())),
        );
        let executor: Arc<dyn ProcessExecutor> = options
            .executor
            .unwrap_or_else(|| Arc::new(TokioProcessExecutor));

        let events = EventBus::new(name.clone());
        let ready = Arc::new(ReadyLatch::new());
        let service = Arc::new(CacheService::new());
        let cache = CommandCache::new(
            name.clone(),
            Arc::clone(&service),
            Arc::clone(&ready),
            handle.clone(),
        );
        let executables = ExecutableManager::new(
            service,
            ExecutableDetector::new(Arc::clone(&executor), Arc::clone(&info)),
            settings,
            events.clone(),
            handle.clone(),
        );
        let helper = Arc::new(MiseHelper::new(
            cache.clone(),
            executables.clone(),
            CommandContext::new(executor, Arc::clone(&info)),
        ));
        cache.attach_warmer(Arc::new(HelperWarmer::new(Arc::downgrade(&helper))));

        let configs = Arc::new(ConfigFileResolver::new());
        let tasks = TaskResolver::new(
            work_dir.clone(),
            Arc::clone(&helper) as Arc<dyn TaskEnvironment>,
            Arc::clone(&configs),
            events.clone(),
            handle.clone(),
        );
        let listener = Arc::new(ConfigFileListener::new(
            work_dir.clone(),
            Arc::clone(&helper),
            configs,
            events.clone(),
            handle.clone(),
        ));
        let redraw = options
            .on_redraw
            .map(|callback| Arc::new(RedrawTrigger::new(callback, handle.clone())));

        let mut subscriptions = vec![
            events.subscribe(move |event| executables.handle_event(event)),
            events.subscribe(move |event| cache.handle_event(event)),
        ];
        {
            let tasks = tasks.clone();
            subscriptions.push(events.subscribe(move |event| tasks.handle_event(event)));
        }
        if let Some(redraw) = &redraw {
            let redraw = Arc::clone(redraw);
            subscriptions.push(events.subscribe(move |event| redraw.handle_event(event)));
        }

        let watcher = if options.watch_files {
            match ConfigWatcher::start(&work_dir, Arc::clone(&listener)) {
                Ok(watcher) => Some(Arc::new(watcher)),
                Err(e) => {
                    warn!(project = %name, error = %e, "Config files will not be watched");
                    None
                }
            }
        } else {
            None
        };
        if let Some(watcher) = &watcher {
            let helper = Arc::downgrade(&helper);
            let watcher = Arc::downgrade(watcher);
            let handle = handle.clone();
            subscriptions.push(events.subscribe(move |event| {
                if event.kind == ProjectEventKind::ExecutableChanged {
                    watch_executable(&handle, helper.clone(), watcher.clone());
                }
            }));
        }

        let project = Arc::new(Self {
            id,
            name,
            info,
            runtime,
            events,
            ready,
            helper,
            tasks,
            listener,
            redraw,
            watcher: Mutex::new(watcher),
            subscriptions: Mutex::new(subscriptions),
            disposed: AtomicBool::new(false),
        });

        project.ready.mark_ready();
        info!(project = %project.name, id = %project.id, "Project opened");
        project
            .events
            .broadcast(ProjectEvent::new(ProjectEventKind::Startup, "project opened"));
        if let Some(watcher) = project.watcher.lock().as_ref() {
            watch_executable(
                project.runtime.handle(),
                Arc::downgrade(&project.helper),
                Arc::downgrade(watcher),
            );
        }
        Ok(project)
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn work_dir(&self) -> &Path {
        self.info.work_dir()
    }

    pub fn info(&self) -> &Arc<ProjectInfo> {
        &self.info
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn helper(&self) -> &Arc<MiseHelper> {
        &self.helper
    }

    pub fn tasks(&self) -> &TaskResolver {
        &self.tasks
    }

    pub fn listener(&self) -> &Arc<ConfigFileListener> {
        &self.listener
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    pub fn settings(&self) -> EffectiveSettings {
        self.helper.executables().settings()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Apply new settings. Returns whether they differed, in which case
    /// `SettingsChanged` was broadcast.
    pub fn reload_settings(&self, settings: EffectiveSettings) -> bool {
        if self.is_disposed() || self.settings() == settings {
            return false;
        }
        self.helper.executables().update_settings(settings);
        self.events
            .broadcast(ProjectEvent::new(ProjectEventKind::SettingsChanged, "settings reloaded"));
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Stop watching, cancel background work and drop every subscriber.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.subscriptions.lock().clear();
        self.watcher.lock().take();
        self.listener.dispose();
        if let Some(redraw) = &self.redraw {
            redraw.dispose();
        }
        self.tasks.dispose();
        self.helper.cache().dispose();
        self.helper.executables().dispose();
        self.events.dispose();
        info!(project = %self.name, id = %self.id, "Project disposed");
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("work_dir", &self.info.work_dir)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Watch the directory of the resolved executable so replacing the binary
/// re-runs detection.
fn watch_executable(handle: &Handle, helper: Weak<MiseHelper>, watcher: Weak<ConfigWatcher>) {
    handle.spawn(async move {
        let Some(helper) = helper.upgrade() else {
            return;
        };
        let path = PathBuf::from(helper.executables().executable_path().await);
        if !path.is_absolute() {
            debug!(path = %path.display(), "Executable is not an absolute path, not watching");
            return;
        }
        let Some(watcher) = watcher.upgrade() else {
            return;
        };
        if let Err(e) = watcher.watch_parent_of(&path) {
            warn!(error = %e, "Could not watch mise executable");
        }
    });
}
