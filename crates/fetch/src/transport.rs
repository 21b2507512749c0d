use crate::error::Result;
use async_trait::async_trait;
use futures::io::AsyncRead;
use reqwest::Url;

/// A response body being streamed from the network.
pub type BoxAsyncRead = Box<dyn AsyncRead + Send + Unpin + 'static>;

/// Outbound GET requests, as needed by the resolver and the fetcher.
///
/// Implementations apply their own timeouts and retries; a returned error is
/// final for that call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a page and read its full body as text.
    async fn get_text(&self, url: &Url) -> Result<String>;

    /// Start a download and hand back the body as a stream.
    ///
    /// Only establishing the response is retried; once streaming has begun a
    /// failure surfaces as an I/O error from the reader (`TimedOut` for
    /// timeouts).
    async fn get_stream(&self, url: &Url) -> Result<BoxAsyncRead>;
}
