//! Errors raised while loading and validating configuration.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every configuration error is fatal at startup.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested config file does not exist.
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The config file extension isn't one of `toml`, `yaml`, `yml`, `json`.
    #[display("unsupported config format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A source could not be parsed, or has values of the wrong type.
    #[display("malformed configuration")]
    Malformed,
    /// A value parsed fine but is not acceptable.
    #[display("invalid configuration value for {field}: {reason}")]
    Invalid {
        #[error(not(source))]
        field: &'static str,
        #[error(not(source))]
        reason: String,
    },
    /// The runtime directory couldn't be determined.
    #[display("cannot determine the database directory")]
    Directory,
}

impl ErrorKind {
    /// Configuration errors need a human to fix them; retrying never helps.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::NotFound(PathBuf::from("/etc/ipgeo/config.toml")))]
    #[case(ErrorKind::UnsupportedFormat("ini".into()))]
    #[case(ErrorKind::Malformed)]
    #[case(ErrorKind::invalid("schedule.interval_secs", "must be greater than zero"))]
    #[case(ErrorKind::Directory)]
    fn test_never_retryable(#[case] kind: ErrorKind) {
        assert!(!kind.is_retryable());
    }
}
