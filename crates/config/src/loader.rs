//! Settings loader
//!
//! Reads the project and application settings files, applies environment
//! overrides and explicit overrides, and returns the layered result.

use crate::settings::{EffectiveSettings, Settings};
use misebridge_core::{
    constants::{
        APP_CONFIG_DIR, APP_SETTINGS_FILE, CONFIG_ENVIRONMENT_ENV_VAR, EXECUTABLE_ENV_VAR,
        PROJECT_SETTINGS_FILE,
    },
    Error, Result,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builder that loads [`EffectiveSettings`]
pub struct SettingsLoader {
    /// Directory holding the project settings file
    project_dir: Option<PathBuf>,
    /// Application settings file (defaults to the user config directory)
    app_config_path: Option<PathBuf>,
    /// Whether `MISEBRIDGE_*` variables override the files
    use_env: bool,
    /// Explicit overrides, applied last
    overrides: Settings,
}

impl SettingsLoader {
    /// Create a new settings loader
    pub fn new() -> Self {
        Self {
            project_dir: None,
            app_config_path: default_app_config_path(),
            use_env: true,
            overrides: Settings::default(),
        }
    }

    /// Set the project directory
    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// Set the application settings file, or disable it with `None`
    pub fn app_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.app_config_path = path;
        self
    }

    /// Set whether environment variables override the files
    pub fn use_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    /// Override the executable path
    pub fn executable_path(mut self, path: Option<String>) -> Self {
        if path.is_some() {
            self.overrides.executable_path = path;
        }
        self
    }

    /// Override the config environment
    pub fn config_environment(mut self, env: Option<String>) -> Self {
        if env.is_some() {
            self.overrides.config_environment = env;
        }
        self
    }

    /// Load the settings
    pub fn load(self) -> Result<EffectiveSettings> {
        let app = match &self.app_config_path {
            Some(path) => read_settings(path)?,
            None => Settings::default(),
        };

        let mut project = match &self.project_dir {
            Some(dir) => read_settings(&dir.join(PROJECT_SETTINGS_FILE))?,
            None => Settings::default(),
        };

        if self.use_env {
            if let Ok(path) = std::env::var(EXECUTABLE_ENV_VAR) {
                debug!("Using executable from {EXECUTABLE_ENV_VAR}");
                project.executable_path = Some(path);
            }
            if let Ok(env) = std::env::var(CONFIG_ENVIRONMENT_ENV_VAR) {
                project.config_environment = Some(env);
            }
        }

        if self.overrides.executable_path.is_some() {
            project.executable_path = self.overrides.executable_path;
        }
        if self.overrides.config_environment.is_some() {
            project.config_environment = self.overrides.config_environment;
        }

        Ok(EffectiveSettings::new(project, app))
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// `<config dir>/misebridge/config.toml`
pub fn default_app_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_CONFIG_DIR).join(APP_SETTINGS_FILE))
}

/// Read one settings file. A missing file yields defaults.
pub fn read_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read settings", e))?;
    let settings = toml::from_str(&text).map_err(|e| Error::toml(path, e.to_string()))?;
    debug!(path = %path.display(), "Loaded settings file");
    Ok(settings)
}
