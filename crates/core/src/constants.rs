//! Shared constants: environment variable names, cache sizes and timeouts.

use std::time::Duration;

/// Name of the external tool when nothing better is known.
pub const DEFAULT_EXECUTABLE: &str = "mise";

/// Arguments of the version probe. `-vv` makes mise print `MISE_BIN:`.
pub const VERSION_PROBE_ARGS: [&str; 2] = ["version", "-vv"];

/// Environment variable carrying the per-session cache token.
pub const SESSION_CACHE_KEY_VAR: &str = "__MISE_ENV_CACHE_KEY";

/// Marker telling environment customizers whether they already ran.
pub const ENV_CUSTOMIZATION_VAR: &str = "_MISE_PLUGIN_ENV_VARS_CUSTOMIZATION";
pub const ENV_CUSTOMIZATION_DONE: &str = "done";
pub const ENV_CUSTOMIZATION_SKIPPED: &str = "skipped";

/// Environment variable mise reads an extra dotenv file from.
pub const MISE_ENV_FILE_VAR: &str = "MISE_ENV_FILE";

/// Overrides for the effective settings.
pub const EXECUTABLE_ENV_VAR: &str = "MISEBRIDGE_EXECUTABLE";
pub const CONFIG_ENVIRONMENT_ENV_VAR: &str = "MISEBRIDGE_ENV";
pub const LOG_ENV_VAR: &str = "MISEBRIDGE_LOG";

/// Settings file names.
pub const PROJECT_SETTINGS_FILE: &str = ".misebridge.toml";
pub const APP_CONFIG_DIR: &str = "misebridge";
pub const APP_SETTINGS_FILE: &str = "config.toml";

/// Executable store keys.
pub const EXECUTABLE_KEY: &str = "executable-path";
pub const AUTO_DETECTED_KEY: &str = "auto-detected-path";

pub const COMMAND_CACHE_CAPACITY: usize = 500;
pub const EXECUTABLE_CACHE_CAPACITY: usize = 10;

/// Upper bound for a cache miss before the caller gets `Cancelled`.
pub const STUCK_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for waiting on the project ready latch.
pub const PROJECT_READY_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-invocation subprocess limit.
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(5000);
/// Per-invocation limit for version probes.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

pub const CONFIG_CHANGE_DEBOUNCE: Duration = Duration::from_millis(200);
pub const REDRAW_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Directories scanned for executable task scripts, relative to the project.
pub const DEFAULT_TASK_DIRECTORIES: [&str; 5] = [
    "mise-tasks",
    ".mise-tasks",
    "mise/tasks",
    ".mise/tasks",
    ".config/mise/tasks",
];
