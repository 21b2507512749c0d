//! Registry Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A registry error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file is missing, unreadable, or not a valid database. Keep using
    /// whatever was active before.
    #[display("failed to open database: {}", _0.display())]
    Open(#[error(not(source))] PathBuf),
    /// The database name can't be resolved to a path inside the root.
    #[display("invalid database path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The database is open but the lookup failed (corrupt record).
    #[display("lookup failed for {_0}")]
    Lookup(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Opening the same bytes twice gives the same answer.
        false
    }
}
