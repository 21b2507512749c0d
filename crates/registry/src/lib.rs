//! The active geolocation database, shared between lookups and updates.
//!
//! A [`Registry`] holds at most one open [`Handle`]. Lookups borrow the
//! current handle for the duration of one call; updates open a replacement
//! and publish it with a single atomic pointer swap. A retired handle is
//! closed when its last borrower lets go of it, never while a lookup is
//! still using it.
//!
//! Reading the database format itself is delegated to a [`GeoReader`]
//! produced by an [`Opener`]; [`MmdbOpener`] reads MaxMind DB files such as
//! the db-ip "IP to City Lite" database.

pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod mmdb;
mod reader;
mod record;
mod registry;

#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{MockOpener, MockReader};
pub use crate::mmdb::{MmdbOpener, MmdbReader};
pub use crate::reader::{DatabaseMetadata, GeoReader, Opener};
pub use crate::record::{GeoRecord, Location, Place};
pub use crate::registry::{Handle, HandleStatus, Registry};
