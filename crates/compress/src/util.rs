use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Compression {
    /// File name suffix for this format, dot included.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
        }
    }

    /// Strip this format's extension from a file name, yielding the name of
    /// the decompressed file.
    ///
    /// Returns `None` when the name doesn't carry the extension, or when
    /// nothing would be left after stripping it.
    #[must_use]
    pub fn strip_extension<'a>(&self, name: &'a str) -> Option<&'a str> {
        let ext = self.extension();
        if ext.is_empty() {
            return (!name.is_empty()).then_some(name);
        }
        if name.len() <= ext.len() || !name.is_char_boundary(name.len() - ext.len()) {
            return None;
        }
        let (stem, suffix) = name.split_at(name.len() - ext.len());
        (suffix == ext).then_some(stem)
    }
}
