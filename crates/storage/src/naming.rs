//! Versioned database file names.

use crate::error::{ErrorKind, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

pub const DEFAULT_PREFIX: &str = "dbip-city-lite";
pub const DEFAULT_EXTENSION: &str = "mmdb";

// The prefix is checked separately against the scheme. Anchored on both ends
// so that `*.mmdb.gz` and `*.mmdb.partial` never match.
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<prefix>.+)-(?<year>\d{4})-(?<month>\d{2})\.(?<extension>[A-Za-z0-9]+)$").unwrap()
});
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());

/// The year-month release a database file was built for.
///
/// Ordering is chronological, which is only ever used to pick
/// deterministically between several installed files; freshness against the
/// upstream release is decided by equality alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatabaseVersion {
    year: u16,
    month: u8,
}
impl DatabaseVersion {
    /// Returns `None` for a month outside `1..=12`.
    pub fn new(year: u16, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    fn from_parts(year: &str, month: &str) -> Option<Self> {
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }
}
impl Display for DatabaseVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
impl FromStr for DatabaseVersion {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        VERSION_REGEX
            .captures(s)
            .and_then(|captures| Self::from_parts(&captures[1], &captures[2]))
            .ok_or_else(|| ErrorKind::InvalidName(s.to_string()).into())
    }
}
impl Serialize for DatabaseVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A database artifact on local storage, identified by its file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DatabaseFile {
    name: String,
    version: DatabaseVersion,
}
impl DatabaseFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> DatabaseVersion {
        self.version
    }
}
impl Display for DatabaseFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.name)
    }
}
impl PartialOrd for DatabaseFile {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DatabaseFile {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version).then_with(|| self.name.cmp(&other.name))
    }
}

/// Recognises and produces names of the shape `<prefix>-<YYYY>-<MM>.<extension>`.
///
/// # Examples
///
/// ```
/// use ipgeo_storage::{DatabaseVersion, NamingScheme};
///
/// let scheme = NamingScheme::default();
/// let file = scheme.parse("dbip-city-lite-2022-07.mmdb").unwrap();
/// assert_eq!(file.version(), DatabaseVersion::new(2022, 7).unwrap());
/// assert!(!scheme.matches("dbip-city-lite-2022-07.mmdb.gz"));
/// assert!(!scheme.matches("GeoLite2-City-2022-07.mmdb"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamingScheme {
    prefix: String,
    extension: String,
}
impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}
impl NamingScheme {
    /// Errors if either part is empty or would produce names that can't live
    /// directly inside the runtime directory.
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let extension = extension.into().trim_start_matches('.').to_string();
        if prefix.is_empty() || prefix.contains(['/', '\\', '\0']) {
            exn::bail!(ErrorKind::InvalidName(prefix));
        }
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            exn::bail!(ErrorKind::InvalidName(extension));
        }
        Ok(Self { prefix, extension })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Parse a file name, returning `None` when it doesn't follow this scheme.
    pub fn parse(&self, name: &str) -> Option<DatabaseFile> {
        let captures = NAME_REGEX.captures(name)?;
        if &captures["prefix"] != self.prefix || &captures["extension"] != self.extension {
            return None;
        }
        let version = DatabaseVersion::from_parts(&captures["year"], &captures["month"])?;
        Some(DatabaseFile {
            name: name.to_string(),
            version,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.parse(name).is_some()
    }

    /// The canonical file name for a version.
    pub fn format(&self, version: DatabaseVersion) -> String {
        format!("{}-{}.{}", self.prefix, version, self.extension)
    }

    pub fn file(&self, version: DatabaseVersion) -> DatabaseFile {
        DatabaseFile {
            name: self.format(version),
            version,
        }
    }
}
