//! Database lifecycle: find what is installed, find what is published,
//! download when they differ, swap the new database in, and clean up.
//!
//! [`Updater::update`] runs one attempt; [`Updater::spawn_periodic`] runs one
//! at startup and then on a fixed interval. Attempts never overlap, and a
//! failed attempt leaves whatever database was active in place.

pub mod error;
mod schedule;
mod updater;

pub use crate::updater::{UpdateOutcome, Updater};
