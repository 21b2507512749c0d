//! `reqwest`-backed [`Transport`].

use crate::error::{Error, ErrorKind, Result};
use crate::retry::RetryPolicy;
use crate::transport::{BoxAsyncRead, Transport};
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use reqwest::{Client, Response, Url};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::time::Duration;
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpOptions {
    pub user_agent: String,
    /// Limit for establishing a connection.
    pub connect_timeout: Duration,
    /// Limit for a whole page request, body included.
    pub page_timeout: Duration,
    /// Limit for a whole download, body included.
    pub download_timeout: Duration,
    pub retry: RetryPolicy,
}
impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("ipgeo/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(600),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    options: HttpOptions,
}
impl HttpTransport {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .connect_timeout(options.connect_timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client, options })
    }

    async fn send(&self, url: &Url, timeout: Duration) -> Result<Response> {
        let response = self.client.get(url.clone()).timeout(timeout).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        Ok(response)
    }
}

fn request_error(err: reqwest::Error) -> Error {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if let Some(status) = err.status() {
        ErrorKind::Status(status.as_u16())
    } else {
        ErrorKind::Network
    };
    exn::Exn::from(err).raise(kind)
}

fn body_error(err: reqwest::Error) -> IoError {
    if err.is_timeout() {
        IoError::new(IoErrorKind::TimedOut, err)
    } else {
        IoError::other(err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self), fields(url = %url, bytes))]
    async fn get_text(&self, url: &Url) -> Result<String> {
        let timeout = self.options.page_timeout;
        let body = self
            .options
            .retry
            .run("page", move || async move {
                let response = self.send(url, timeout).await?;
                response.text().await.map_err(request_error)
            })
            .await?;
        tracing::Span::current().record("bytes", body.len());
        Ok(body)
    }

    #[instrument(skip(self), fields(url = %url, length))]
    async fn get_stream(&self, url: &Url) -> Result<BoxAsyncRead> {
        let timeout = self.options.download_timeout;
        let response = self
            .options
            .retry
            .run("download", move || async move { self.send(url, timeout).await })
            .await?;
        if let Some(length) = response.content_length() {
            tracing::Span::current().record("length", length);
        }
        tracing::debug!("Download started");
        let stream = response.bytes_stream().map_err(body_error);
        Ok(Box::new(Box::pin(stream).into_async_read()))
    }
}
