use crate::error::Result;
use crate::record::GeoRecord;
use serde::Serialize;
use std::net::IpAddr;
use std::path::Path;

/// Descriptive metadata embedded in a database file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseMetadata {
    pub database_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Seconds since the Unix epoch.
    pub build_epoch: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<String>,
    pub ip_version: u16,
    pub node_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
}

/// An open, query-ready geolocation database.
///
/// Implementations release their resources on drop; the registry makes sure
/// that only happens once nobody is using them anymore.
pub trait GeoReader: Send + Sync {
    /// Returns `Ok(None)` when the address isn't covered by the database.
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>>;

    fn metadata(&self) -> DatabaseMetadata;
}

/// Opens database files into [`GeoReader`]s.
///
/// Opening is blocking file I/O; async callers should go through
/// [`spawn_blocking`](https://docs.rs/tokio/latest/tokio/task/fn.spawn_blocking.html).
pub trait Opener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn GeoReader>>;
}
