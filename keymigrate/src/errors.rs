/// Error types for the migration pipeline.
///
/// Only two kinds of failure stop a run: problems with the inputs handed to
/// the pipeline (missing paths, unreadable key list, bad configuration) and
/// failures writing destination files. Unreadable source files and walk
/// errors are reported through [`crate::results::ScanOutcome`] and the
/// run summary instead of through this type.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors that can occur during a migration run
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("{0} does not exist")]
    SourceNotFound(PathBuf),
    #[error("Destination is not a directory: {0}")]
    DestinationNotDirectory(PathBuf),
    #[error("Failed to read key list {path}: {source}")]
    KeyListRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    DestinationWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid UTF-8 in file {path}: {source}")]
    Encoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),
    #[error("Migration cancelled")]
    Cancelled,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    pub fn source_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SourceNotFound(path.into())
    }

    pub fn destination_not_directory(path: impl Into<PathBuf>) -> Self {
        Self::DestinationNotDirectory(path.into())
    }

    pub fn key_list_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::KeyListRead {
            path: path.into(),
            source,
        }
    }

    pub fn destination_write(path: &Path, source: std::io::Error) -> Self {
        Self::DestinationWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn encoding(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        Self::Encoding {
            path: path.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn thread_pool(msg: impl Into<String>) -> Self {
        Self::ThreadPool(msg.into())
    }
}

impl From<config::ConfigError> for MigrateError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
