//! Finding and downloading the published database.
//!
//! The [`Resolver`] works out which artifact to download: either an explicit
//! URL, or the download link scraped from the publisher's page. The
//! [`Fetcher`] streams that artifact through a gzip decoder into the local
//! store, publishing the result only once it is complete and on disk.
//!
//! All network access goes through the [`Transport`] trait; [`HttpTransport`]
//! is the `reqwest` implementation with timeouts and retries.

mod consts;
mod download;
pub mod error;
mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod resolve;
mod retry;
mod transport;

pub use crate::consts::DEFAULT_PAGE_URL;
pub use crate::download::Fetcher;
pub use crate::http::{HttpOptions, HttpTransport};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{CallLog, MockTransport};
pub use crate::resolve::{RemoteArtifact, Resolver, find_download_link};
pub use crate::retry::RetryPolicy;
pub use crate::transport::{BoxAsyncRead, Transport};
pub use reqwest::Url;
