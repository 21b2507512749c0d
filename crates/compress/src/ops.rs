use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flate2::{Compression as GzCompression, write::GzEncoder};
use std::io::Write;

// Only fixtures and test doubles ever compress; favour speed.
const GZIP_LEVEL: GzCompression = GzCompression::fast();

impl Compression {
    /// Compress a byte slice in memory, as a publisher would.
    ///
    /// # Examples
    ///
    /// ```
    /// use ipgeo_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"Hello, world!").unwrap();
    /// assert_eq!(Compression::from_magic_bytes(&compressed), Compression::Gzip);
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, GZIP_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_is_standard() {
        let original = b"1.0.0.0,1.0.0.255,OC,AU,Queensland,South Brisbane";
        let compressed = Compression::Gzip.compress(original).unwrap();
        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_none_is_identity() {
        assert_eq!(Compression::None.compress(b"plain").unwrap(), b"plain");
    }
}
