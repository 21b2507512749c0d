//! Compression handling for downloaded database artifacts.
//!
//! Publishers ship databases gzip-compressed. [`Compression`] detects the
//! format from a file name ([`Compression::from_path`]) or from the leading
//! bytes of a stream ([`Compression::from_magic_bytes`]), and with the
//! `async` feature decodes streams through [`futures::io`](::futures::io)
//! readers, so a download never has to be held in memory.

mod construct;
pub mod error;
#[cfg(feature = "async")]
mod futures;
mod ops;
mod util;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Gzip compression (.gz)
    Gzip,
}
