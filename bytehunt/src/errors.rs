/// Error types for bytehunt.
///
/// Only a small part of this enum ever reaches a caller as a failure. The
/// validation class (`RootNotFound`, `RootNotDirectory`, `EmptyQuery`,
/// `InvalidNamePattern`) ends a submission with a failed `JobResult`.
/// Per-file and per-directory I/O errors are absorbed inside the background
/// job: an unreadable file counts as "no match" and an unreadable directory
/// is skipped. Cancellation is not an error at all.
///
/// ```rust,ignore
/// match job.try_submit(request) {
///     Ok(job_id) => // wait for events tagged with job_id,
///     Err(SearchError::JobBusy) => // another search is still running,
///     Err(e) if e.is_validation() => // a failed JobResult was emitted too,
///     Err(e) => // unexpected
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while preparing or running a search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("The directory {} does not exist.", .0.display())]
    RootNotFound(PathBuf),
    #[error("{} is not a directory.", .0.display())]
    RootNotDirectory(PathBuf),
    #[error("Search field can not be empty.")]
    EmptyQuery,
    #[error("Invalid file name pattern '{pattern}': {message}")]
    InvalidNamePattern { pattern: String, message: String },
    #[error("A search is already running")]
    JobBusy,
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unknown encoding: {0}")]
    InvalidEncoding(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RootNotFound(path.into())
    }

    pub fn root_not_directory(path: impl Into<PathBuf>) -> Self {
        Self::RootNotDirectory(path.into())
    }

    pub fn invalid_name_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNamePattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_encoding(name: impl Into<String>) -> Self {
        Self::InvalidEncoding(name.into())
    }

    /// Maps an I/O error on `path` to the most specific variant
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// True for errors that reject a request before any job starts
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound(_)
                | Self::RootNotDirectory(_)
                | Self::EmptyQuery
                | Self::InvalidNamePattern { .. }
        )
    }
}
