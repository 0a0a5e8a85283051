use crate::redraw::RedrawCallback;
use misebridge_command::ProcessExecutor;
use misebridge_shell::ProjectInfo;
use std::sync::Arc;
use tokio::runtime::Handle;

/// How a project is opened. The defaults run real `mise` processes, detect
/// the host, and watch the project directory.
#[derive(Clone)]
pub struct ProjectOptions {
    pub(crate) executor: Option<Arc<dyn ProcessExecutor>>,
    pub(crate) project_info: Option<ProjectInfo>,
    pub(crate) handle: Option<Handle>,
    pub(crate) on_redraw: Option<RedrawCallback>,
    pub(crate) watch_files: bool,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            executor: None,
            project_info: None,
            handle: None,
            on_redraw: None,
            watch_files: true,
        }
    }
}

impl ProjectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run subprocesses through `executor` instead of spawning them.
    pub fn executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Skip host detection.
    pub fn project_info(mut self, info: ProjectInfo) -> Self {
        self.project_info = Some(info);
        self
    }

    /// Schedule background work on `handle` rather than the ambient runtime.
    pub fn runtime_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Called (debounced) after the task list visibly changed.
    pub fn on_redraw<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_redraw = Some(Arc::new(callback));
        self
    }

    pub fn watch_files(mut self, watch: bool) -> Self {
        self.watch_files = watch;
        self
    }
}
