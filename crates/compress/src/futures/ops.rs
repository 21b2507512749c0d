//! Streaming detection and decoding of download bodies.

use crate::Compression;
use crate::construct::MAGIC_LEN;
use crate::error::{ErrorKind, Result};
use async_compression::futures::bufread::GzipDecoder;
use exn::ResultExt;
use futures::io::{AsyncRead, AsyncReadExt, BufReader as AsyncBufReader, Chain, Cursor};

impl Compression {
    /// Wrap an async reader with the decoder for this format.
    ///
    /// Decoding errors are deferred by the underlying crate until the first
    /// read attempt and surface as [`std::io::ErrorKind::InvalidData`] (corrupt stream) or
    /// [`std::io::ErrorKind::UnexpectedEof`] (truncated stream).
    pub fn async_wrap_reader<'a, R>(&self, reader: R) -> Box<dyn AsyncRead + Send + Unpin + 'a>
    where
        R: AsyncRead + Send + Unpin + 'a,
    {
        // The decoder needs AsyncBufRead.
        let reader = AsyncBufReader::new(reader);
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzipDecoder::new(reader)),
        }
    }

    /// Detect the compression of an async stream from its magic bytes.
    ///
    /// Reads until the magic bytes are in hand or the stream ends, however
    /// the bytes happen to be split across reads, then hands back a reader
    /// that replays them in front of the rest of the stream.
    ///
    /// Returns [`InvalidData`](ErrorKind::InvalidData) if the stream is empty.
    pub async fn async_detect<R>(mut reader: R) -> Result<(Compression, Chain<Cursor<Vec<u8>>, R>)>
    where
        R: AsyncRead + Unpin,
    {
        let mut head = [0u8; MAGIC_LEN];
        let mut filled = 0;
        while filled < MAGIC_LEN {
            let read = reader.read(&mut head[filled..]).await.or_raise(|| ErrorKind::Io)?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            exn::bail!(ErrorKind::InvalidData);
        }
        let head = head[..filled].to_vec();
        let detected = Compression::from_magic_bytes(&head);
        Ok((detected, Cursor::new(head).chain(reader)))
    }
}
