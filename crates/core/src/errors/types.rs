use std::path::PathBuf;

/// Result type alias for misebridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Workspace error type for everything that is not a `mise` invocation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML documents that could not be read
    #[error("failed to parse TOML file '{path}': {message}")]
    Toml { path: PathBuf, message: String },

    /// File watcher setup or delivery failures
    #[error("file watcher error: {message}")]
    Watcher { message: String },

    /// Async runtime errors
    #[error("runtime error: {message}")]
    Runtime { message: String },

    /// Unsupported operation errors
    #[error("unsupported feature '{feature}': {message}")]
    Unsupported { feature: String, message: String },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}
