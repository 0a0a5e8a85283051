//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a TOML parse error
    #[must_use]
    pub fn toml(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Toml {
            path: path.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn watcher(message: impl Into<String>) -> Self {
        Error::Watcher {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime {
            message: message.into(),
        }
    }

    /// Create an unsupported feature error
    #[must_use]
    pub fn unsupported(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unsupported {
            feature: feature.into(),
            message: message.into(),
        }
    }
}
