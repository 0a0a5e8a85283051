//! Reading the parts of mise TOML files the engine cares about: tasks, task
//! includes and references to external env files.

use misebridge_core::{Error, MiseTask, Result, TaskKind};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Relevant content of one mise config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiseTomlFile {
    pub path: PathBuf,
    pub tasks: Vec<MiseTask>,
    /// `[task_config] includes`: task TOML files or task directories.
    pub task_includes: Vec<String>,
    /// `env_file`, `[env._] file/source`, `[vars._] file/source`.
    pub external_files: Vec<String>,
}

impl MiseTomlFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read mise config", e))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let table: Table = text
            .parse()
            .map_err(|e: toml::de::Error| Error::toml(path, e.message().to_string()))?;
        let source = path.to_string_lossy().into_owned();

        let tasks = match table.get("tasks") {
            Some(Value::Table(tasks)) => tasks
                .iter()
                .filter_map(|(name, value)| task_from_value(name, value, &source))
                .collect(),
            _ => Vec::new(),
        };

        let task_includes = table
            .get("task_config")
            .and_then(Value::as_table)
            .and_then(|config| config.get("includes"))
            .map(strings)
            .unwrap_or_default();

        let mut external_files = Vec::new();
        if let Some(value) = table.get("env_file") {
            external_files.extend(strings(value));
        }
        if let Some(value) = table
            .get("settings")
            .and_then(Value::as_table)
            .and_then(|settings| settings.get("env_file"))
        {
            external_files.extend(strings(value));
        }
        for section in ["env", "vars"] {
            let directives = table
                .get(section)
                .and_then(Value::as_table)
                .and_then(|t| t.get("_"))
                .and_then(Value::as_table);
            if let Some(directives) = directives {
                for key in ["file", "source"] {
                    if let Some(value) = directives.get(key) {
                        external_files.extend(strings(value));
                    }
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            tasks,
            task_includes,
            external_files,
        })
    }
}

/// Tasks of an included task file: every top-level table is one task.
pub fn parse_task_file(path: &Path, text: &str) -> Result<Vec<MiseTask>> {
    let table: Table = text
        .parse()
        .map_err(|e: toml::de::Error| Error::toml(path, e.message().to_string()))?;
    let source = path.to_string_lossy().into_owned();
    Ok(table
        .iter()
        .filter(|(_, value)| value.is_table())
        .filter_map(|(name, value)| task_from_value(name, value, &source))
        .collect())
}

pub fn read_task_file(path: &Path) -> Result<Vec<MiseTask>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read task file", e))?;
    parse_task_file(path, &text)
}

fn task_from_value(name: &str, value: &Value, source: &str) -> Option<MiseTask> {
    let mut task = MiseTask::new(name, TaskKind::Toml).with_source(source);
    match value {
        Value::String(command) => task.run = vec![command.clone()],
        Value::Array(_) => task.run = strings(value),
        Value::Table(table) => {
            task.description = table
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            task.aliases = table.get("alias").map(strings).unwrap_or_default();
            task.depends = table.get("depends").map(strings).unwrap_or_default();
            task.wait_for = table.get("wait_for").map(strings).unwrap_or_default();
            task.depends_post = table.get("depends_post").map(strings).unwrap_or_default();
            task.run = table.get("run").map(strings).unwrap_or_default();
            task.hide = table.get("hide").and_then(Value::as_bool).unwrap_or(false);
        }
        _ => return None,
    }
    Some(task)
}

/// A string or a list of strings; anything else is ignored.
fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
