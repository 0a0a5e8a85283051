//! Task sources on disk
//!
//! Tasks come from three places, collected in this order:
//!
//! 1. `[tasks.<name>]` tables in the resolved config files
//! 2. task TOML files listed in `[task_config] includes`
//! 3. executable files under the task directories
//!
//! A name seen earlier shadows later definitions.

use misebridge_config::{read_task_file, MiseTomlFile};
use misebridge_core::{MiseTask, TaskKind, DEFAULT_TASK_DIRECTORIES};
use misebridge_utils::{is_executable_file, relative_to};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Everything needed to read tasks for one project directory.
#[derive(Debug, Clone)]
pub struct TaskSources {
    base_dir: PathBuf,
    /// Config files including ones outside the project (global config).
    config_files: Vec<PathBuf>,
    /// Config files inside the project. Only these may add task directories.
    local_config_files: Vec<PathBuf>,
}

impl TaskSources {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        config_files: Vec<PathBuf>,
        local_config_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            config_files,
            local_config_files,
        }
    }

    /// Read every source and return the deduplicated task list.
    pub fn collect(&self) -> Vec<MiseTask> {
        let configs: Vec<MiseTomlFile> = self
            .config_files
            .iter()
            .filter_map(|path| read_config(path))
            .collect();

        let mut tasks = Vec::new();
        for config in &configs {
            tasks.extend(config.tasks.iter().cloned());
        }
        for config in &configs {
            tasks.extend(self.included_task_files(config));
        }
        for dir in self.task_directories() {
            tasks.extend(script_tasks(&dir));
        }

        dedupe_by_name(tasks)
    }

    fn included_task_files(&self, config: &MiseTomlFile) -> Vec<MiseTask> {
        config
            .task_includes
            .iter()
            .map(|include| self.base_dir.join(include))
            .filter(|path| path.is_file())
            .flat_map(|path| match read_task_file(&path) {
                Ok(tasks) => tasks,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable task file");
                    Vec::new()
                }
            })
            .collect()
    }

    /// Default task directories that exist, then directory includes from the
    /// project's own config files.
    pub fn task_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = DEFAULT_TASK_DIRECTORIES
            .iter()
            .map(|dir| self.base_dir.join(dir))
            .filter(|dir| dir.is_dir())
            .collect();

        for config in self.local_config_files.iter().filter_map(|path| read_config(path)) {
            dirs.extend(
                config
                    .task_includes
                    .iter()
                    .map(|include| self.base_dir.join(include))
                    .filter(|path| path.is_dir()),
            );
        }
        dirs
    }
}

fn read_config(path: &Path) -> Option<MiseTomlFile> {
    match MiseTomlFile::read(path) {
        Ok(file) => Some(file),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping unreadable config");
            None
        }
    }
}

/// Executable leaf files under `dir`, named by their relative path with `:`
/// between components.
pub fn script_tasks(dir: &Path) -> Vec<MiseTask> {
    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_executable_file(entry.path()))
        .filter_map(|entry| {
            let relative = relative_to(dir, entry.path())?;
            let name = relative.split('/').collect::<Vec<_>>().join(":");
            trace!(task = %name, "Found script task");
            Some(MiseTask::new(name, TaskKind::ShellScript).with_source(relative))
        })
        .collect()
}

/// Keep the first task for each name.
pub fn dedupe_by_name(tasks: Vec<MiseTask>) -> Vec<MiseTask> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| seen.insert(task.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_script(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let tasks = vec![
            MiseTask::new("build", TaskKind::Toml).with_source("mise.toml"),
            MiseTask::new("test", TaskKind::Toml),
            MiseTask::new("build", TaskKind::ShellScript).with_source("build"),
        ];
        let tasks = dedupe_by_name(tasks);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].kind, TaskKind::Toml);
        assert_eq!(tasks[0].source.as_deref(), Some("mise.toml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_names_follow_nested_paths() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("mise-tasks");
        write_script(&dir.join("lint"));
        write_script(&dir.join("db/migrate/up"));
        fs::write(dir.join("README.md"), "not a task").unwrap();

        let tasks = script_tasks(&dir);
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["db:migrate:up", "lint"]);
        assert_eq!(tasks[0].source.as_deref(), Some("db/migrate/up"));
        assert_eq!(tasks[0].kind, TaskKind::ShellScript);
    }

    #[test]
    fn test_missing_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".mise/tasks")).unwrap();
        let sources = TaskSources::new(temp.path(), Vec::new(), Vec::new());
        assert_eq!(sources.task_directories(), [temp.path().join(".mise/tasks")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_includes_add_task_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("mise.toml");
        fs::write(
            &config,
            "[task_config]\nincludes = [\"tasks.toml\", \"scripts\", \"missing\"]\n\n[tasks.ci]\nrun = \"make ci\"\n",
        )
        .unwrap();
        fs::write(temp.path().join("tasks.toml"), "[deploy]\nrun = \"./deploy\"\n").unwrap();
        write_script(&temp.path().join("scripts/release"));

        let sources = TaskSources::new(temp.path(), vec![config.clone()], vec![config]);
        let names: Vec<_> = sources.collect().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["ci", "deploy", "release"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_external_configs_do_not_add_directories() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(&global, "[task_config]\nincludes = [\"scripts\"]\n").unwrap();
        write_script(&temp.path().join("scripts/release"));

        let sources = TaskSources::new(temp.path(), vec![global], Vec::new());
        assert!(sources.collect().is_empty());
    }
}
