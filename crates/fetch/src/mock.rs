//! Scripted [`Transport`] for tests.

use crate::error::{ErrorKind, Result};
use crate::transport::{BoxAsyncRead, Transport};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Url;
use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const CHUNK_SIZE: usize = 4096;

/// Record of every request a [`MockTransport`] served.
///
/// Cloning shares the record, so a test can keep one after handing the
/// transport over.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}
impl CallLog {
    /// `"text <url>"` or `"stream <url>"` per request, in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of download requests.
    pub fn downloads(&self) -> usize {
        self.entries().iter().filter(|entry| entry.starts_with("stream ")).count()
    }

    /// Highest number of requests that were ever in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn start(&self, entry: String) -> InFlight {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(Arc::clone(&self.in_flight))
    }
}

struct InFlight(Arc<AtomicUsize>);
impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

enum Body {
    Complete(Vec<u8>),
    /// Sends the bytes, then fails as if the connection dropped.
    Broken(Vec<u8>),
}

/// In-memory [`Transport`] serving scripted pages and artifacts.
///
/// Unknown URLs answer with HTTP 404.
#[derive(Default)]
pub struct MockTransport {
    pages: HashMap<String, String>,
    artifacts: HashMap<String, Body>,
    failures: HashMap<String, ErrorKind>,
    delay: Option<Duration>,
    chunk_size: Option<usize>,
    log: CallLog,
}
impl MockTransport {
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn with_artifact(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.artifacts.insert(url.into(), Body::Complete(bytes.into()));
        self
    }

    /// Serve `bytes`, then break the connection.
    pub fn with_broken_artifact(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.artifacts.insert(url.into(), Body::Broken(bytes.into()));
        self
    }

    /// Fail every request for `url` with `kind`.
    pub fn with_failure(mut self, url: impl Into<String>, kind: ErrorKind) -> Self {
        self.failures.insert(url.into(), kind);
        self
    }

    /// Hold every request open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stream artifact bodies in chunks of `size` bytes.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    async fn begin(&self, kind: &str, url: &Url) -> Result<InFlight> {
        let guard = self.log.start(format!("{kind} {url}"));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(kind) = self.failures.get(url.as_str()) {
            exn::bail!(kind.clone());
        }
        Ok(guard)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_text(&self, url: &Url) -> Result<String> {
        let _guard = self.begin("text", url).await?;
        match self.pages.get(url.as_str()) {
            Some(html) => Ok(html.clone()),
            None => exn::bail!(ErrorKind::Status(404)),
        }
    }

    async fn get_stream(&self, url: &Url) -> Result<BoxAsyncRead> {
        let _guard = self.begin("stream", url).await?;
        let (bytes, broken) = match self.artifacts.get(url.as_str()) {
            Some(Body::Complete(bytes)) => (bytes, false),
            Some(Body::Broken(bytes)) => (bytes, true),
            None => exn::bail!(ErrorKind::Status(404)),
        };
        let chunk_size = self.chunk_size.unwrap_or(CHUNK_SIZE);
        let mut chunks: Vec<std::io::Result<Vec<u8>>> = bytes.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();
        if broken {
            chunks.push(Err(IoError::new(IoErrorKind::ConnectionReset, "connection reset by peer")));
        }
        Ok(Box::new(futures::stream::iter(chunks).into_async_read()))
    }
}
