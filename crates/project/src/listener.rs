//! Coalesces file changes into `ConfigChanged` events.
//!
//! Changes to files mise reads are marked dirty and a short debounce is
//! (re)started. When it fires, one event covers everything dirty at that
//! moment. Changes to the cached mise binary go to the executable manager
//! instead.
//!
//! The set of files loaded by the resolved configs is kept until the next
//! flush, as long as the tracked configs and environment it was built from
//! are unchanged.

use crate::dirty::DirtySet;
use misebridge_command::MiseHelper;
use misebridge_config::{external_tracked_files, is_mise_config_file, ConfigFileResolver};
use misebridge_core::{
    EventBus, ProjectEvent, ProjectEventKind, TrackedConfigsKey, CONFIG_CHANGE_DEBOUNCE,
    DEFAULT_TASK_DIRECTORIES,
};
use misebridge_utils::{normalize_path, relative_to, Debouncer};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// What a file change turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// Marked dirty; a `ConfigChanged` broadcast is queued.
    Config,
    /// The cached mise binary; handed to the executable manager.
    Executable,
    Ignored,
}

/// Files loaded by the resolved configs and the inputs they came from.
struct TrackedFiles {
    environment: Option<String>,
    tracked: Option<Vec<String>>,
    files: Arc<HashSet<String>>,
}

type TrackedCache = Arc<Mutex<Option<TrackedFiles>>>;

pub struct ConfigFileListener {
    base_dir: PathBuf,
    helper: Arc<MiseHelper>,
    configs: Arc<ConfigFileResolver>,
    events: EventBus,
    dirty: Arc<DirtySet>,
    tracked: TrackedCache,
    debouncer: Debouncer,
    disposed: AtomicBool,
}

impl ConfigFileListener {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        helper: Arc<MiseHelper>,
        configs: Arc<ConfigFileResolver>,
        events: EventBus,
        handle: Handle,
    ) -> Self {
        Self::with_delay(base_dir, helper, configs, events, CONFIG_CHANGE_DEBOUNCE, handle)
    }

    pub fn with_delay(
        base_dir: impl Into<PathBuf>,
        helper: Arc<MiseHelper>,
        configs: Arc<ConfigFileResolver>,
        events: EventBus,
        delay: Duration,
        handle: Handle,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            helper,
            configs,
            events,
            dirty: Arc::new(DirtySet::new()),
            tracked: Arc::new(Mutex::new(None)),
            debouncer: Debouncer::new("config-files", delay, handle),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn on_file_change(&self, path: &Path) -> FileChange {
        if self.disposed.load(Ordering::SeqCst) {
            return FileChange::Ignored;
        }
        let file = normalize_path(path);

        if self.helper.executables().on_file_changed(&file).is_some() {
            debug!(path = %file, "Cached mise executable changed on disk");
            return FileChange::Executable;
        }
        if !self.is_relevant(path, &file) {
            trace!(path = %file, "Ignoring unrelated file change");
            return FileChange::Ignored;
        }

        if self.dirty.insert(file.clone()) {
            debug!(path = %file, "Mise config marked dirty");
        }
        let dirty = Arc::clone(&self.dirty);
        let tracked = Arc::clone(&self.tracked);
        let events = self.events.clone();
        self.debouncer.queue(move || flush(&dirty, &tracked, &events));
        FileChange::Config
    }

    fn is_relevant(&self, path: &Path, normalized: &str) -> bool {
        is_mise_config_file(&self.base_dir, path)
            || self.in_task_directory(path)
            || self.tracked_files().contains(normalized)
    }

    fn in_task_directory(&self, path: &Path) -> bool {
        DEFAULT_TASK_DIRECTORIES
            .iter()
            .any(|dir| relative_to(&self.base_dir.join(dir), path).is_some())
    }

    /// Resolved config files plus the env files and scripts they load.
    fn tracked_files(&self) -> Arc<HashSet<String>> {
        let tracked = self
            .helper
            .cache()
            .get_if_cached(&TrackedConfigsKey::new(self.helper.context().work_dir_key()));
        let environment = self.helper.configured_environment();

        if let Some(cached) = self.tracked.lock().as_ref() {
            if cached.environment == environment && cached.tracked == tracked {
                return Arc::clone(&cached.files);
            }
        }

        let configs = self.configs.resolve(
            &self.base_dir,
            environment.as_deref(),
            tracked.as_deref(),
            true,
        );
        let mut files: HashSet<String> = configs.iter().map(normalize_path).collect();
        files.extend(
            external_tracked_files(&self.base_dir, &configs)
                .iter()
                .map(normalize_path),
        );
        let files = Arc::new(files);
        trace!(count = files.len(), "Rebuilt tracked file set");

        *self.tracked.lock() = Some(TrackedFiles {
            environment,
            tracked,
            files: Arc::clone(&files),
        });
        files
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.debouncer.dispose();
    }
}

fn flush(dirty: &DirtySet, tracked: &Mutex<Option<TrackedFiles>>, events: &EventBus) {
    let snapshot = dirty.snapshot();
    if snapshot.is_empty() {
        return;
    }
    let reason = match snapshot.paths().collect::<Vec<_>>().as_slice() {
        [single] => format!("{single} changed"),
        files => format!("{} mise config files changed", files.len()),
    };
    tracked.lock().take();
    events.broadcast(ProjectEvent::new(ProjectEventKind::ConfigChanged, reason));
    dirty.remove_all(&snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use misebridge_cache::{CacheService, CommandCache};
    use misebridge_command::fake::ScriptedExecutor;
    use misebridge_command::{CommandContext, ExecutableDetector, ExecutableManager};
    use misebridge_config::EffectiveSettings;
    use misebridge_core::Subscription;
    use misebridge_shell::{HostPlatform, ProjectInfo};
    use misebridge_utils::ReadyLatch;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// A helper whose subprocess layer answers nothing.
    fn quiet_helper(work_dir: &Path, events: &EventBus) -> Arc<MiseHelper> {
        let handle = Handle::current();
        let executor = ScriptedExecutor::new();
        let info = Arc::new(ProjectInfo {
            work_dir: work_dir.to_path_buf(),
            user_home: work_dir.join("home"),
            shell_path: None,
            platform: HostPlatform::Unix,
        });
        let service = Arc::new(CacheService::new());
        let ready = Arc::new(ReadyLatch::new());
        ready.mark_ready();
        let cache = CommandCache::new("test", service.clone(), ready, handle.clone());
        let executables = ExecutableManager::new(
            service,
            ExecutableDetector::new(executor.clone(), info.clone()),
            EffectiveSettings::default(),
            events.clone(),
            handle,
        );
        Arc::new(MiseHelper::new(
            cache,
            executables,
            CommandContext::new(executor, info),
        ))
    }

    struct Fixture {
        dir: TempDir,
        configs: Arc<ConfigFileResolver>,
        listener: ConfigFileListener,
        changes: Arc<Mutex<Vec<String>>>,
        _subscription: Subscription,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mise.toml"), "env_file = \".env\"\n").unwrap();
        fs::write(dir.path().join(".env"), "A=1\n").unwrap();

        let events = EventBus::new("listener");
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let subscription = events.subscribe(move |event| {
            if event.kind == ProjectEventKind::ConfigChanged {
                sink.lock().push(event.reason.clone());
            }
        });
        let helper = quiet_helper(dir.path(), &events);
        let configs = Arc::new(ConfigFileResolver::new());
        let listener = ConfigFileListener::new(
            dir.path(),
            helper,
            configs.clone(),
            events,
            Handle::current(),
        );
        Fixture {
            dir,
            configs,
            listener,
            changes,
            _subscription: subscription,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_broadcasts_once() {
        let f = fixture();
        let config = f.dir.path().join("mise.toml");

        for _ in 0..5 {
            assert_eq!(f.listener.on_file_change(&config), FileChange::Config);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;

        let changes = f.changes.lock().clone();
        assert_eq!(changes, [format!("{} changed", normalize_path(&config))]);
        assert!(f.listener.dirty().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_changes_broadcast_separately() {
        let f = fixture();
        let config = f.dir.path().join("mise.toml");

        f.listener.on_file_change(&config);
        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;
        f.listener.on_file_change(&config);
        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;

        assert_eq!(f.changes.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_several_files_share_one_event() {
        let f = fixture();
        f.listener.on_file_change(&f.dir.path().join("mise.toml"));
        f.listener.on_file_change(&f.dir.path().join(".env"));
        f.listener.on_file_change(&f.dir.path().join("mise-tasks/build"));
        assert_eq!(f.listener.dirty().len(), 3);

        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;
        assert_eq!(*f.changes.lock(), ["3 mise config files changed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_files_ignored() {
        let f = fixture();
        assert_eq!(
            f.listener.on_file_change(&f.dir.path().join("src/main.rs")),
            FileChange::Ignored
        );
        assert_eq!(
            f.listener.on_file_change(Path::new("/elsewhere/mise.toml")),
            FileChange::Ignored
        );

        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;
        assert!(f.changes.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_listener_drops_pending_change() {
        let f = fixture();
        f.listener.on_file_change(&f.dir.path().join("mise.toml"));
        f.listener.dispose();

        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;
        assert!(f.changes.lock().is_empty());
        assert_eq!(
            f.listener.on_file_change(&f.dir.path().join("mise.toml")),
            FileChange::Ignored
        );
    }

    #[test]
    fn test_flush_keeps_late_arrivals() {
        let dirty = Arc::new(DirtySet::new());
        let tracked = Mutex::new(None);
        let events = EventBus::new("flush");
        dirty.insert("/p/mise.toml");

        let during = dirty.clone();
        let _subscription = events.subscribe(move |_| {
            during.insert("/p/.env");
        });
        flush(&dirty, &tracked, &events);

        assert_eq!(dirty.files(), ["/p/.env"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_broadcast_is_announced_again() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("mise.toml");
        fs::write(&config, "").unwrap();

        let events = EventBus::new("listener");
        let listener = Arc::new(ConfigFileListener::new(
            dir.path(),
            quiet_helper(dir.path(), &events),
            Arc::new(ConfigFileResolver::new()),
            events.clone(),
            Handle::current(),
        ));

        let broadcasts = Arc::new(AtomicUsize::new(0));
        let counter = broadcasts.clone();
        let editor = Arc::downgrade(&listener);
        let edited = config.clone();
        let subscription = events.subscribe(move |event| {
            if event.kind != ProjectEventKind::ConfigChanged {
                return;
            }
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(listener) = editor.upgrade() {
                    listener.on_file_change(&edited);
                }
            }
        });

        listener.on_file_change(&config);
        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 5).await;

        assert_eq!(broadcasts.load(Ordering::SeqCst), 2);
        assert!(listener.dirty().is_empty());
        drop(subscription);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracked_files_reused_until_config_change() {
        let f = fixture();
        let env2 = f.dir.path().join(".env2");
        fs::write(&env2, "B=2\n").unwrap();
        assert_eq!(f.listener.on_file_change(&env2), FileChange::Ignored);

        fs::write(f.dir.path().join("mise.toml"), "env_file = \".env2\"\n").unwrap();
        f.configs.clear();
        assert_eq!(f.listener.on_file_change(&env2), FileChange::Ignored);

        f.listener.on_file_change(&f.dir.path().join("mise.toml"));
        tokio::time::sleep(CONFIG_CHANGE_DEBOUNCE * 2).await;
        f.configs.clear();

        assert_eq!(f.listener.on_file_change(&env2), FileChange::Config);
    }
}
