//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults;
//! 2. a config file: the one given explicitly, or `config.toml` in the
//!    platform config directory if it exists (TOML, YAML or JSON by
//!    extension);
//! 3. environment variables prefixed `IPGEO_`, with `__` separating nested
//!    keys (`IPGEO_HTTP__RETRIES=5`).
//!
//! ```toml
//! directory = "/var/lib/ipgeo"
//!
//! [source]
//! url = "https://download.db-ip.com/free/dbip-city-lite-2022-07.mmdb.gz"
//!
//! [schedule]
//! interval_secs = 86400
//! ```

pub mod error;
mod load;
mod model;

pub use crate::load::{ENV_PREFIX, default_config_file};
pub use crate::model::{Config, DatabaseConfig, HttpConfig, ScheduleConfig, SourceConfig};
