//! Binary Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    /// Building the components from a valid configuration failed.
    #[display("failed to start")]
    Setup,
    #[display("database update failed")]
    Update,
    /// Lookups were requested but no database could be loaded.
    #[display("no geolocation database available")]
    Unavailable,
    #[display("failed to list installed databases")]
    Inventory,
    #[display("failed to write output")]
    Output,
}
