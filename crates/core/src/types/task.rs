use super::one_or_many;
use serde::{Deserialize, Serialize};

/// Where a task definition was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// A `[tasks.<name>]` table or an included task file.
    Toml,
    /// An executable file in a task directory.
    ShellScript,
    /// Reported by `mise task ls --json`.
    #[default]
    Cli,
}

/// A runnable mise task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiseTask {
    pub name: String,
    #[serde(deserialize_with = "one_or_many", alias = "alias")]
    pub aliases: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub depends: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub wait_for: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub depends_post: Vec<String>,
    pub description: Option<String>,
    pub hide: bool,
    /// Defining file. Script tasks use the path relative to their directory.
    pub source: Option<String>,
    #[serde(deserialize_with = "one_or_many", alias = "command")]
    pub run: Vec<String>,
    #[serde(skip_deserializing)]
    pub kind: TaskKind,
}

impl MiseTask {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn ui_content(&self) -> (&str, Option<&str>, &[String], Option<&str>, &[String]) {
        (
            &self.name,
            self.source.as_deref(),
            &self.depends,
            self.description.as_deref(),
            &self.aliases,
        )
    }
}

/// Whether two task lists render identically: same names, sources,
/// dependencies, descriptions and aliases, in the same order.
pub fn same_ui_content(previous: &[MiseTask], next: &[MiseTask]) -> bool {
    previous.len() == next.len()
        && previous
            .iter()
            .zip(next)
            .all(|(a, b)| a.ui_content() == b.ui_content())
}
