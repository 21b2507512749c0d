use crate::error::{Error, ErrorKind, Result};
use crate::resolve::RemoteArtifact;
use crate::transport::Transport;
use exn::ResultExt;
use futures::io::AsyncReadExt;
use ipgeo_compress::Compression;
use ipgeo_compress::error::ErrorKind as CompressErrorKind;
use ipgeo_storage::{DatabaseFile, LocalStore};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Size of the single buffer a download is copied through.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Downloads artifacts into a [`LocalStore`].
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}
impl Fetcher {
    /// Cancelling `cancel` aborts any in-flight download.
    pub fn new(transport: Arc<dyn Transport>, cancel: CancellationToken) -> Self {
        Self { transport, cancel }
    }

    /// Download `artifact`, decompress it, and install it into `store` under
    /// its target name.
    ///
    /// The body is streamed through the decoder into `<name>.partial`, which
    /// is synced and renamed into place only after the whole stream decoded
    /// cleanly. On any failure (or cancellation) nothing is installed and the
    /// partial file is removed. A body that doesn't start with the gzip magic
    /// bytes is rejected before any file is created.
    #[instrument(skip_all, fields(url = %artifact.url(), file = %artifact.target(), bytes))]
    pub async fn download(&self, artifact: &RemoteArtifact, store: &LocalStore) -> Result<DatabaseFile> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::warn!("Download cancelled");
                exn::bail!(ErrorKind::Cancelled);
            },
            result = self.transfer(artifact, store) => result,
        }
    }

    async fn transfer(&self, artifact: &RemoteArtifact, store: &LocalStore) -> Result<DatabaseFile> {
        let body = self.transport.get_stream(artifact.url()).await?;
        let (detected, body) = Compression::async_detect(body).await.map_err(|err| {
            let kind = match *err {
                CompressErrorKind::InvalidData => ErrorKind::Format,
                _ => ErrorKind::Network,
            };
            err.raise(kind)
        })?;
        if detected != artifact.compression() {
            tracing::warn!(expected = %artifact.compression(), detected = %detected, "Unexpected artifact format");
            exn::bail!(ErrorKind::Format);
        }

        let mut decoder = detected.async_wrap_reader(body);
        let mut partial = store.create_partial(artifact.target()).await.or_raise(|| ErrorKind::Storage)?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let read = decoder.read(&mut buffer).await.map_err(read_error)?;
            if read == 0 {
                break;
            }
            partial.write_all(&buffer[..read]).await.or_raise(|| ErrorKind::Storage)?;
        }
        if partial.written() == 0 {
            tracing::warn!("Artifact decompressed to nothing");
            exn::bail!(ErrorKind::Format);
        }
        tracing::Span::current().record("bytes", partial.written());
        let file = store.promote(partial).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!("Downloaded database");
        Ok(file)
    }
}

fn read_error(err: IoError) -> Error {
    let kind = match err.kind() {
        IoErrorKind::InvalidData | IoErrorKind::UnexpectedEof => ErrorKind::Format,
        IoErrorKind::TimedOut => ErrorKind::Timeout,
        _ => ErrorKind::Network,
    };
    exn::Exn::from(err).raise(kind)
}
