//! Errors raised while managing database files on disk.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong with the data directory or a file in it.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The database file, or the data directory, is missing
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The process may not read or write the data directory
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path is not absolute, is not a directory, or escapes the root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Name does not follow the database naming scheme
    #[display("invalid database name: {_0}")]
    InvalidName(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind as IoErrorKind;

    #[test]
    fn test_only_io_is_retryable() {
        assert!(ErrorKind::from(IoError::from(IoErrorKind::Interrupted)).is_retryable());
        assert!(!ErrorKind::InvalidName("dbip-city-lite.mmdb".into()).is_retryable());
        assert!(!ErrorKind::NotFound(PathBuf::from("/srv/ipgeo")).is_retryable());
    }
}
