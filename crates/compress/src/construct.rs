use crate::Compression;
use std::path::Path;

const GZIP_MAGIC: [u8; MAGIC_LEN] = [0x1F, 0x8B];

/// Number of leading bytes needed to tell formats apart.
pub(crate) const MAGIC_LEN: usize = 2;

impl Compression {
    /// Detect compression from a file name or URL path extension.
    ///
    /// Extensions are matched exactly: `.GZ` is not gzip.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            _ => Compression::None,
        }
    }

    /// Detect compression from the first bytes of a stream.
    ///
    /// Anything unrecognised, including input too short to tell, is `None`.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}
