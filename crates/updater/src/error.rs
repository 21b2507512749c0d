//! Updater Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. The underlying fetch, storage or registry error is
//! kept as a child in the tree.

use derive_more::{Display, Error};

/// An update error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an update attempt was aborted.
///
/// Every variant aborts only the current attempt; the previously active
/// database (if any) stays active.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No valid artifact URL could be determined.
    #[display("failed to resolve the remote database")]
    Resolution,
    /// The transfer failed: network, HTTP status, timeout or cancellation.
    #[display("failed to download the database")]
    Download,
    /// The downloaded body was not a valid gzip stream.
    #[display("downloaded database is not a valid gzip stream")]
    Format,
    /// Writing the database locally failed.
    #[display("failed to write the database locally")]
    Io,
    /// The new database could not be opened.
    #[display("failed to open the database")]
    Open,
    /// The runtime directory could not be listed.
    #[display("failed to scan installed databases")]
    Inventory,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Resolution | Self::Download)
    }
}
