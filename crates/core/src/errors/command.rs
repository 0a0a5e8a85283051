//! Failures of a single `mise` invocation.
//!
//! These are values, not exceptions: the cache layer inspects the `Err` arm to
//! decide that an outcome must not be stored, and callers degrade to empty
//! results. Cancellation lives in [`super::Cancelled`] and never appears here.

use std::time::Duration;

/// Outcome of one `mise` invocation.
pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The executable could not be started at all.
    #[error("failed to execute '{command}': {message}")]
    NotFound { command: String, message: String },

    /// A config file must be trusted before mise reads it.
    #[error("Config file {config_path} is not trusted. Trust it with `mise trust`.")]
    NotTrusted { command: String, config_path: String },

    /// A config file could not be parsed by mise.
    #[error("error parsing config file: {config_path}")]
    ConfigParse { command: String, config_path: String },

    /// The per-invocation subprocess limit expired.
    #[error("command '{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    /// The subprocess was terminated without an exit code.
    #[error("command '{command}' was cancelled")]
    Cancelled { command: String },

    /// Nonzero exit with an unrecognised stderr shape.
    #[error("{stderr}")]
    Failed { command: String, stderr: String },

    /// Stdout could not be decoded.
    #[error("failed to decode output of '{command}': {message}")]
    Decode { command: String, message: String },
}

impl CommandError {
    #[must_use]
    pub fn not_found(command: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError::NotFound {
            command: command.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_trusted(command: impl Into<String>, config_path: impl Into<String>) -> Self {
        CommandError::NotTrusted {
            command: command.into(),
            config_path: config_path.into(),
        }
    }

    #[must_use]
    pub fn config_parse(command: impl Into<String>, config_path: impl Into<String>) -> Self {
        CommandError::ConfigParse {
            command: command.into(),
            config_path: config_path.into(),
        }
    }

    #[must_use]
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        CommandError::Failed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn decode(command: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError::Decode {
            command: command.into(),
            message: message.into(),
        }
    }

    /// The command line this error belongs to.
    pub fn command(&self) -> &str {
        match self {
            CommandError::NotFound { command, .. }
            | CommandError::NotTrusted { command, .. }
            | CommandError::ConfigParse { command, .. }
            | CommandError::TimedOut { command, .. }
            | CommandError::Cancelled { command }
            | CommandError::Failed { command, .. }
            | CommandError::Decode { command, .. } => command,
        }
    }

    /// Tool-not-found is expected in many environments and stays quiet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CommandError::NotFound { .. })
    }

    /// The offending config file for trust and parse errors.
    pub fn config_path(&self) -> Option<&str> {
        match self {
            CommandError::NotTrusted { config_path, .. }
            | CommandError::ConfigParse { config_path, .. } => Some(config_path),
            _ => None,
        }
    }
}
