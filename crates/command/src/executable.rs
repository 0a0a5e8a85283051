//! The project's single source of truth for which `mise` to run.
//!
//! Resolution order: project setting, application setting, auto-detection.
//! The outcome is cached in the executable store until settings change or the
//! cached binary changes on disk.

use crate::detect::ExecutableDetector;
use misebridge_cache::CacheService;
use misebridge_config::EffectiveSettings;
use misebridge_core::{
    EventBus, ExecutableInfo, MiseVersion, ProjectEvent, ProjectEventKind, AUTO_DETECTED_KEY,
    DEFAULT_EXECUTABLE, EXECUTABLE_KEY,
};
use misebridge_utils::normalize_path;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct Inner {
    service: Arc<CacheService>,
    detector: ExecutableDetector,
    settings: RwLock<EffectiveSettings>,
    events: EventBus,
    handle: Handle,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

#[derive(Clone)]
pub struct ExecutableManager {
    inner: Arc<Inner>,
}

impl ExecutableManager {
    pub fn new(
        service: Arc<CacheService>,
        detector: ExecutableDetector,
        settings: EffectiveSettings,
        events: EventBus,
        handle: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                detector,
                settings: RwLock::new(settings),
                events,
                handle,
                refresh_task: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn settings(&self) -> EffectiveSettings {
        self.inner.settings.read().clone()
    }

    /// Replace the settings snapshot. Callers broadcast `SettingsChanged`.
    pub fn update_settings(&self, settings: EffectiveSettings) {
        *self.inner.settings.write() = settings;
    }

    pub async fn executable_info(&self) -> ExecutableInfo {
        let service = &self.inner.service;
        service
            .get_or_compute_executable(EXECUTABLE_KEY, || self.resolve())
            .await
    }

    async fn resolve(&self) -> ExecutableInfo {
        let settings = self.settings();
        if let Some(path) = settings.project_executable() {
            debug!(path, "Using project-configured executable");
            return self.inner.detector.detect_executable_info(path).await;
        }
        if let Some(path) = settings.app_executable() {
            debug!(path, "Using app-configured executable");
            return self.inner.detector.detect_executable_info(path).await;
        }
        self.auto_detected_info().await
    }

    /// Auto-detected executable, cached on its own so settings that stop
    /// pointing somewhere explicit fall back without a new probe.
    pub async fn auto_detected_info(&self) -> ExecutableInfo {
        self.inner
            .service
            .get_or_compute_executable(AUTO_DETECTED_KEY, || async {
                let detected = self
                    .inner
                    .detector
                    .detect_executable_info(DEFAULT_EXECUTABLE)
                    .await;
                if detected.version.is_some() {
                    info!(
                        path = %detected.path,
                        version = ?detected.version,
                        "Auto-detected mise executable"
                    );
                    detected
                } else {
                    info!("Could not auto-detect mise executable, using 'mise' as fallback");
                    ExecutableInfo::fallback()
                }
            })
            .await
    }

    pub async fn executable_path(&self) -> String {
        self.executable_info().await.path
    }

    pub async fn executable_version(&self) -> Option<MiseVersion> {
        self.executable_info().await.version
    }

    pub async fn executable_parts(&self) -> Vec<String> {
        self.executable_info().await.parts()
    }

    /// Whether `command_line` runs the resolved executable.
    pub async fn matches_executable_path(&self, command_line: &[String]) -> bool {
        self.executable_info()
            .await
            .matches_command_line(command_line)
    }

    /// Resolve again (through the cache) and return the path.
    pub async fn refresh(&self) -> String {
        debug!("Warming executable path cache");
        let path = self.executable_path().await;
        debug!(path = %path, "Executable path cache warmed");
        path
    }

    /// Drop the cached executable, resolve again in the background, and
    /// announce `ExecutableChanged` if the path moved or `force` is set.
    pub fn handle_executable_change(&self, reason: &str, force: bool) -> Option<JoinHandle<()>> {
        if self.is_disposed() {
            return None;
        }
        let previous = self
            .inner
            .service
            .get_cached_executable(EXECUTABLE_KEY)
            .map(|info| info.path);
        self.inner.service.invalidate_all_executables();

        let this = self.clone();
        let reason = reason.to_string();
        let task = self.inner.handle.spawn(async move {
            let current = this.refresh().await;
            if this.is_disposed() {
                return;
            }
            if force || previous.as_deref() != Some(current.as_str()) {
                info!("Mise executable changed ({reason}), notifying listeners");
                this.inner
                    .events
                    .broadcast(ProjectEvent::new(ProjectEventKind::ExecutableChanged, reason));
            }
        });
        Some(task)
    }

    /// Resolve in the background so the first real command finds a warm entry.
    pub fn warm(&self) {
        if self.is_disposed() {
            return;
        }
        let this = self.clone();
        let task = self.inner.handle.spawn(async move {
            this.refresh().await;
        });
        if let Some(previous) = self.inner.refresh_task.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn handle_event(&self, event: &ProjectEvent) {
        match event.kind {
            ProjectEventKind::Startup => self.warm(),
            ProjectEventKind::SettingsChanged => {
                self.handle_executable_change("settings changed", false);
            }
            _ => {}
        }
    }

    /// React to an on-disk change. Only the cached binary itself matters.
    pub fn on_file_changed(&self, path: &str) -> Option<JoinHandle<()>> {
        let cached = self.inner.service.get_cached_executable(EXECUTABLE_KEY)?;
        if normalize_path(&cached.path) != normalize_path(path) {
            return None;
        }
        self.handle_executable_change(&format!("file changed: {path}"), true)
    }

    /// The cached path, if resolved, without triggering a probe.
    pub fn cached_path(&self) -> Option<String> {
        self.inner
            .service
            .get_cached_executable(EXECUTABLE_KEY)
            .map(|info| info.path)
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::tests::{LINUX_BANNER, LINUX_TRACE, WINDOWS_BANNER, WINDOWS_TRACE};
    use crate::executor::ProcessOutput;
    use crate::fake::{ScriptedExecutor, ScriptedResponse};
    use misebridge_config::Settings;
    use misebridge_shell::{HostPlatform, ProjectInfo};
    use misebridge_utils::expand_home;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    struct Fixture {
        manager: ExecutableManager,
        service: Arc<CacheService>,
        events: EventBus,
        executor: Arc<ScriptedExecutor>,
        home: TempDir,
    }

    fn fixture(settings: EffectiveSettings) -> Fixture {
        let home = TempDir::new().unwrap();
        let executor = ScriptedExecutor::new();
        let info = Arc::new(ProjectInfo {
            work_dir: PathBuf::from("/work"),
            user_home: home.path().to_path_buf(),
            shell_path: Some("/bin/bash".to_string()),
            platform: HostPlatform::Unix,
        });
        let service = Arc::new(CacheService::new());
        let events = EventBus::new("test");
        let manager = ExecutableManager::new(
            service.clone(),
            ExecutableDetector::new(executor.clone(), info),
            settings,
            events.clone(),
            Handle::current(),
        );
        Fixture {
            manager,
            service,
            events,
            executor,
            home,
        }
    }

    fn project_path(path: &str) -> EffectiveSettings {
        EffectiveSettings::new(
            Settings {
                executable_path: Some(path.to_string()),
                ..Settings::default()
            },
            Settings::default(),
        )
    }

    async fn seed(service: &CacheService, info: ExecutableInfo) {
        service.invalidate_all_executables();
        service
            .get_or_compute_executable(EXECUTABLE_KEY, || async move { info })
            .await;
    }

    #[tokio::test]
    async fn test_parts_and_matching_use_cached_path() {
        let f = fixture(EffectiveSettings::default());
        seed(&f.service, ExecutableInfo::new("/usr/bin/mise", None)).await;

        assert_eq!(f.manager.executable_parts().await, ["/usr/bin/mise"]);
        let env = vec!["/usr/bin/mise".to_string(), "env".to_string()];
        assert!(f.manager.matches_executable_path(&env).await);
        let bare = vec!["mise".to_string(), "env".to_string()];
        assert!(!f.manager.matches_executable_path(&bare).await);
        assert_eq!(f.executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cached_version() {
        let f = fixture(EffectiveSettings::default());
        seed(&f.service, ExecutableInfo::new("mise", Some(MiseVersion::new(1, 2, 3)))).await;
        assert_eq!(f.manager.executable_version().await, Some(MiseVersion::new(1, 2, 3)));
    }

    #[tokio::test]
    async fn test_configured_path_with_probe_samples() {
        let configured = "/opt/mise/bin/mise";
        let f = fixture(project_path(configured));

        let samples = [
            (WINDOWS_BANNER, MiseVersion::new(2026, 1, 2), None),
            (
                WINDOWS_TRACE,
                MiseVersion::new(2026, 1, 2),
                Some(r"C:\Users\jdx\scoop\apps\mise\current\bin\mise.exe"),
            ),
            (LINUX_BANNER, MiseVersion::new(2025, 12, 1), None),
            (LINUX_TRACE, MiseVersion::new(2025, 12, 1), Some("~/.local/bin/mise")),
        ];

        for (output, version, resolved) in samples {
            f.service.invalidate_all_executables();
            // One probe without a MISE_BIN line, two with one
            let probes = if resolved.is_some() { 2 } else { 1 };
            f.executor.on_contains_times(
                "version -vv",
                probes,
                ScriptedResponse::Output(ProcessOutput::success(output)),
            );

            let info = f.manager.executable_info().await;
            assert_eq!(MiseVersion::find_in_output(output), Some(version));
            match resolved {
                Some(path) => {
                    assert_eq!(info.path, expand_home(path, f.home.path()));
                    assert_eq!(info.version, Some(version));
                }
                None => {
                    assert_eq!(info.path, configured);
                    assert_eq!(info.version, None);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_auto_detect_without_version_is_fallback() {
        let f = fixture(EffectiveSettings::default());
        f.executor.on_contains(
            "version -vv",
            ScriptedResponse::Output(ProcessOutput::success("MISE_BIN: /opt/mise\nno version here")),
        );

        let info = f.manager.executable_info().await;
        assert_eq!(info, ExecutableInfo::fallback());
        assert_eq!(f.service.get_cached_executable(AUTO_DETECTED_KEY), Some(info.clone()));
        assert_eq!(f.service.get_cached_executable(EXECUTABLE_KEY), Some(info));
    }

    #[tokio::test]
    async fn test_app_setting_used_when_project_unset() {
        let f = fixture(EffectiveSettings::new(
            Settings::default(),
            Settings {
                executable_path: Some("/usr/local/bin/mise".to_string()),
                ..Settings::default()
            },
        ));
        f.executor.on_contains(
            "/usr/local/bin/mise version -vv",
            ScriptedResponse::Output(ProcessOutput::success(
                "MISE_BIN: /usr/local/bin/mise\n2025.3.0 macos-arm64",
            )),
        );

        let info = f.manager.executable_info().await;
        assert_eq!(info, ExecutableInfo::new("/usr/local/bin/mise", Some(MiseVersion::new(2025, 3, 0))));
    }

    fn count_changes(events: &EventBus) -> (Arc<AtomicUsize>, misebridge_core::Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let subscription = events.subscribe(move |event| {
            if event.kind == ProjectEventKind::ExecutableChanged {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, subscription)
    }

    #[tokio::test]
    async fn test_change_broadcast_only_when_path_differs() {
        let f = fixture(project_path("/opt/mise/bin/mise"));
        let (count, _subscription) = count_changes(&f.events);

        // Resolves to the configured path again: no broadcast
        f.manager.executable_info().await;
        f.manager
            .handle_executable_change("settings changed", false)
            .unwrap()
            .await
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        f.manager.update_settings(project_path("/opt/other/mise"));
        f.manager
            .handle_executable_change("settings changed", false)
            .unwrap()
            .await
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(f.manager.cached_path().as_deref(), Some("/opt/other/mise"));
    }

    #[tokio::test]
    async fn test_file_change_of_cached_binary_forces_broadcast() {
        let f = fixture(project_path("/opt/mise/bin/mise"));
        let (count, _subscription) = count_changes(&f.events);

        assert!(f.manager.on_file_changed("/opt/mise/bin/mise").is_none());
        f.manager.executable_info().await;

        assert!(f.manager.on_file_changed("/work/mise.toml").is_none());
        f.manager
            .on_file_changed("/opt/mise/bin/mise")
            .unwrap()
            .await
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disposed_manager_ignores_changes() {
        let f = fixture(EffectiveSettings::default());
        f.manager.dispose();
        assert!(f.manager.handle_executable_change("settings changed", true).is_none());
    }
}
