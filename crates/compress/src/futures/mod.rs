//! Streaming decompression over [`futures::io`] readers.
//!
//! Requires the `async` feature.

pub(crate) mod ops;
