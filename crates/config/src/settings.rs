//! User settings at project and application level.

use serde::{Deserialize, Serialize};

/// One settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Path or command used to run mise. Blank means unset.
    pub executable_path: Option<String>,
    /// Value passed as `--env` (or `--profile` on older mise).
    pub config_environment: Option<String>,
    /// Pass `--offline` to `mise ls` when mise supports it.
    pub offline: bool,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Settings {
    pub fn executable_path(&self) -> Option<&str> {
        non_blank(&self.executable_path)
    }

    pub fn config_environment(&self) -> Option<&str> {
        non_blank(&self.config_environment)
    }
}

/// Project settings layered over application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub project: Settings,
    pub app: Settings,
}

impl EffectiveSettings {
    pub fn new(project: Settings, app: Settings) -> Self {
        Self { project, app }
    }

    /// Executable configured for this project.
    pub fn project_executable(&self) -> Option<&str> {
        self.project.executable_path()
    }

    /// Executable configured for every project.
    pub fn app_executable(&self) -> Option<&str> {
        self.app.executable_path()
    }

    pub fn config_environment(&self) -> Option<&str> {
        self.project
            .config_environment()
            .or_else(|| self.app.config_environment())
    }

    pub fn offline(&self) -> bool {
        self.project.offline || self.app.offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_overrides_app() {
        let settings = EffectiveSettings::new(
            Settings {
                executable_path: Some("/opt/mise".into()),
                config_environment: Some("  ".into()),
                offline: false,
            },
            Settings {
                executable_path: Some("/usr/bin/mise".into()),
                config_environment: Some("staging".into()),
                offline: true,
            },
        );
        assert_eq!(settings.project_executable(), Some("/opt/mise"));
        assert_eq!(settings.app_executable(), Some("/usr/bin/mise"));
        assert_eq!(settings.config_environment(), Some("staging"));
        assert!(settings.offline());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings {
            executable_path: Some("".into()),
            ..Settings::default()
        };
        assert_eq!(settings.executable_path(), None);
        assert_eq!(EffectiveSettings::default().config_environment(), None);
    }
}
