//! Typed cache keys.
//!
//! A key names one invocation shape of `mise` and encodes every input that
//! changes its result, so two different invocations never share an entry. The
//! associated `Output` type lets the type-erased command store hand values back
//! with their real type.

use crate::types::{DevTools, DevToolsScope, EnvVars, EnvVarsExtended, MiseTask};

pub trait CacheKey: Send + Sync {
    type Output: Clone + Send + Sync + 'static;

    /// Stable string identity of this invocation.
    fn key(&self) -> String;

    /// Label shown while a miss is being computed.
    fn progress_title(&self) -> String;
}

fn env_segment(config_environment: &Option<String>) -> &str {
    config_environment.as_deref().unwrap_or("null")
}

/// `mise env --json` for a directory and config environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvVarsKey {
    pub work_dir: String,
    pub config_environment: Option<String>,
}

impl EnvVarsKey {
    pub fn new(work_dir: impl Into<String>, config_environment: Option<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            config_environment,
        }
    }
}

impl CacheKey for EnvVarsKey {
    type Output = EnvVars;

    fn key(&self) -> String {
        format!("env:{}:{}", self.work_dir, env_segment(&self.config_environment))
    }

    fn progress_title(&self) -> String {
        "Loading Mise Environment Variables".to_string()
    }
}

/// `mise env --json-extended` with redaction flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvVarsExtendedKey {
    pub work_dir: String,
    pub config_environment: Option<String>,
}

impl EnvVarsExtendedKey {
    pub fn new(work_dir: impl Into<String>, config_environment: Option<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            config_environment,
        }
    }
}

impl CacheKey for EnvVarsExtendedKey {
    type Output = EnvVarsExtended;

    fn key(&self) -> String {
        format!(
            "env-extended:{}:{}",
            self.work_dir,
            env_segment(&self.config_environment)
        )
    }

    fn progress_title(&self) -> String {
        "Loading Mise Environment Details".to_string()
    }
}

/// `mise ls --json` for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DevToolsKey {
    pub work_dir: String,
    pub config_environment: Option<String>,
    pub scope: DevToolsScope,
}

impl DevToolsKey {
    pub fn new(
        work_dir: impl Into<String>,
        config_environment: Option<String>,
        scope: DevToolsScope,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            config_environment,
            scope,
        }
    }
}

impl CacheKey for DevToolsKey {
    type Output = DevTools;

    fn key(&self) -> String {
        format!(
            "ls:{}:{}:{}",
            self.scope.cache_key_segment(),
            self.work_dir,
            env_segment(&self.config_environment)
        )
    }

    fn progress_title(&self) -> String {
        self.scope.progress_title().to_string()
    }
}

/// `mise which <bin>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhichBinKey {
    pub bin: String,
    pub work_dir: String,
    pub config_environment: Option<String>,
}

impl WhichBinKey {
    pub fn new(
        bin: impl Into<String>,
        work_dir: impl Into<String>,
        config_environment: Option<String>,
    ) -> Self {
        Self {
            bin: bin.into(),
            work_dir: work_dir.into(),
            config_environment,
        }
    }
}

impl CacheKey for WhichBinKey {
    type Output = String;

    fn key(&self) -> String {
        format!(
            "which:{}:{}:{}",
            self.bin,
            self.work_dir,
            env_segment(&self.config_environment)
        )
    }

    fn progress_title(&self) -> String {
        format!("Finding {}", self.bin)
    }
}

/// `mise task ls --json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TasksKey {
    pub work_dir: String,
    pub config_environment: Option<String>,
}

impl TasksKey {
    pub fn new(work_dir: impl Into<String>, config_environment: Option<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            config_environment,
        }
    }
}

impl CacheKey for TasksKey {
    type Output = Vec<MiseTask>;

    fn key(&self) -> String {
        format!("tasks:{}:{}", self.work_dir, env_segment(&self.config_environment))
    }

    fn progress_title(&self) -> String {
        "Loading Mise Tasks".to_string()
    }
}

/// `mise config --tracked-configs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedConfigsKey {
    pub work_dir: String,
}

impl TrackedConfigsKey {
    pub fn new(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl CacheKey for TrackedConfigsKey {
    type Output = Vec<String>;

    fn key(&self) -> String {
        format!("tracked-configs:{}", self.work_dir)
    }

    fn progress_title(&self) -> String {
        "Loading Mise Tracked Configs".to_string()
    }
}

/// `mise config get <key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigValueKey {
    pub key: String,
    pub work_dir: String,
    pub config_environment: Option<String>,
}

impl ConfigValueKey {
    pub fn new(
        key: impl Into<String>,
        work_dir: impl Into<String>,
        config_environment: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            work_dir: work_dir.into(),
            config_environment,
        }
    }
}

impl CacheKey for ConfigValueKey {
    type Output = String;

    fn key(&self) -> String {
        format!(
            "config:{}:{}:{}",
            self.key,
            self.work_dir,
            env_segment(&self.config_environment)
        )
    }

    fn progress_title(&self) -> String {
        "Reading Mise Config".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_strings() {
        assert_eq!(EnvVarsKey::new("/work", None).key(), "env:/work:null");
        assert_eq!(
            EnvVarsExtendedKey::new("/work", Some("ci".into())).key(),
            "env-extended:/work:ci"
        );
        assert_eq!(
            DevToolsKey::new("/work", None, DevToolsScope::Global).key(),
            "ls:global:/work:null"
        );
        assert_eq!(
            WhichBinKey::new("node", "/work", Some("dev".into())).key(),
            "which:node:/work:dev"
        );
    }

    #[test]
    fn test_distinct_invocations_never_collide() {
        let keys: Vec<String> = vec![
            EnvVarsKey::new("/work", None).key(),
            EnvVarsKey::new("/work", Some("dev".into())).key(),
            EnvVarsKey::new("/other", None).key(),
            EnvVarsExtendedKey::new("/work", None).key(),
            DevToolsKey::new("/work", None, DevToolsScope::Local).key(),
            DevToolsKey::new("/work", None, DevToolsScope::Global).key(),
            DevToolsKey::new("/work", None, DevToolsScope::Combined).key(),
            WhichBinKey::new("node", "/work", None).key(),
            WhichBinKey::new("python", "/work", None).key(),
            TasksKey::new("/work", None).key(),
            TrackedConfigsKey::new("/work").key(),
            ConfigValueKey::new("settings.experimental", "/work", None).key(),
        ];
        let unique: HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_progress_titles() {
        assert_eq!(
            DevToolsKey::new("/w", None, DevToolsScope::Local).progress_title(),
            "Loading Mise Dev Tools (Local)"
        );
        assert_eq!(
            DevToolsKey::new("/w", None, DevToolsScope::Combined).progress_title(),
            "Loading Mise Dev Tools"
        );
        assert_eq!(WhichBinKey::new("go", "/w", None).progress_title(), "Finding go");
    }
}
