//! Task discovery across config tables, included files and script directories.

#![cfg(unix)]

use async_trait::async_trait;
use misebridge_config::ConfigFileResolver;
use misebridge_core::{EventBus, TaskKind};
use misebridge_task::{TaskEnvironment, TaskResolver};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Handle;

struct NoTrackedConfigs;

#[async_trait]
impl TaskEnvironment for NoTrackedConfigs {
    fn configured_environment(&self) -> Option<String> {
        None
    }

    async fn tracked_config_paths(&self) -> Option<Vec<String>> {
        None
    }
}

fn script(path: &Path, mode: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[tokio::test]
async fn test_tasks_merged_from_every_source() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    fs::write(
        root.join("mise.toml"),
        r#"
[task_config]
includes = ["ci/tasks.toml", "tools"]

[tasks.foo]
description = "From the config"
run = "echo foo"
"#,
    )
    .unwrap();
    fs::create_dir_all(root.join("ci")).unwrap();
    fs::write(root.join("ci/tasks.toml"), "[lint]\nrun = \"cargo clippy\"\n").unwrap();
    script(&root.join("mise-tasks/foo"), 0o755);
    script(&root.join("mise-tasks/bar"), 0o755);
    script(&root.join("mise-tasks/nested/baz"), 0o755);
    script(&root.join("mise-tasks/notes"), 0o644);
    script(&root.join("tools/format"), 0o755);

    let resolver = TaskResolver::new(
        root,
        Arc::new(NoTrackedConfigs),
        Arc::new(ConfigFileResolver::new()),
        EventBus::new("integration"),
        Handle::current(),
    );
    let tasks = resolver.compute_tasks(None).await.unwrap();

    let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["foo", "lint", "bar", "nested:baz", "format"]);

    assert_eq!(tasks[0].kind, TaskKind::Toml);
    assert_eq!(tasks[0].description.as_deref(), Some("From the config"));
    assert_eq!(tasks[3].kind, TaskKind::ShellScript);
    assert_eq!(tasks[3].source.as_deref(), Some("nested/baz"));
    assert_eq!(tasks[4].source.as_deref(), Some("format"));

    assert_eq!(resolver.cached_tasks_or_empty(None).len(), 5);
}
