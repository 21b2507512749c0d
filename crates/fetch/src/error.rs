//! Fetch Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The URL (explicit, configured, or scraped) can't be parsed.
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The URL does not point at a `.gz` artifact.
    #[display("not a gzip artifact: {_0}")]
    UnsupportedArtifact(#[error(not(source))] String),
    /// The publisher page has no download link for the database.
    #[display("no database download link found on {_0}")]
    NoMatchingLink(#[error(not(source))] String),
    /// The artifact would decompress to a name outside the naming scheme.
    #[display("artifact would be installed under an unrecognised name: {_0}")]
    InvalidName(#[error(not(source))] String),
    /// Connection failure, or the connection dropped mid-transfer.
    #[display("network error")]
    Network,
    #[display("request timed out")]
    Timeout,
    /// The server answered with a non-success status code.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The body is not a valid gzip stream, or fails to decode part way.
    #[display("artifact is not a valid gzip stream")]
    Format,
    /// Writing the downloaded file locally failed.
    #[display("local storage error")]
    Storage,
    /// Shutdown was requested while a transfer was in flight.
    #[display("download cancelled")]
    Cancelled,
    /// The HTTP client could not be built from the given options.
    #[display("invalid HTTP client configuration")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Timeout => true,
            Self::Status(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network, true)]
    #[case(ErrorKind::Timeout, true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(404), false)]
    #[case(ErrorKind::Format, false)]
    #[case(ErrorKind::Cancelled, false)]
    #[case(ErrorKind::NoMatchingLink("https://db-ip.com".to_string()), false)]
    fn test_is_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::Status(404).to_string(), "unexpected HTTP status 404");
        assert_eq!(
            ErrorKind::UnsupportedArtifact("https://x/db.mmdb".to_string()).to_string(),
            "not a gzip artifact: https://x/db.mmdb"
        );
    }
}
