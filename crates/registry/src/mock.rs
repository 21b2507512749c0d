//! In-memory [`Opener`] for tests that don't want a real MaxMind database.
//!
//! A mock database is a UTF-8 text file with one record per line:
//!
//! ```text
//! # ipgeo mock database
//! 8.8.8.8 US United States
//! 1.1.1.1 AU Australia
//! ```

use crate::error::{ErrorKind, Result};
use crate::reader::{DatabaseMetadata, GeoReader, Opener};
use crate::record::{GeoRecord, Place};
use exn::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const HEADER: &str = "# ipgeo mock database";

#[derive(Debug, Default)]
pub struct MockOpener {
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
}
impl MockOpener {
    /// Bytes of a mock database containing `(ip, country code, country name)`
    /// records.
    pub fn database(records: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut out = format!("{HEADER}\n");
        for (ip, code, name) in records {
            out.push_str(&format!("{ip} {code} {name}\n"));
        }
        out.into_bytes()
    }

    /// Number of successful opens so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::Acquire)
    }

    /// Number of readers opened and not yet dropped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}
impl Opener for MockOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn GeoReader>> {
        let open_error = || ErrorKind::Open(path.to_path_buf());
        let contents = std::fs::read(path).or_raise(open_error)?;
        let text = String::from_utf8(contents).or_raise(open_error)?;
        let mut lines = text.lines();
        if lines.next() != Some(HEADER) {
            exn::bail!(open_error());
        }
        let mut records = HashMap::new();
        for line in lines.filter(|line| !line.trim().is_empty()) {
            let mut parts = line.splitn(3, ' ');
            let ip = parts.next().ok_or_raise(open_error)?.parse::<IpAddr>().or_raise(open_error)?;
            let code = parts.next().ok_or_raise(open_error)?;
            let name = parts.next().ok_or_raise(open_error)?;
            records.insert(
                ip,
                GeoRecord {
                    country: Some(Place::named(name).with_code(code)),
                    ..GeoRecord::default()
                },
            );
        }
        self.opens.fetch_add(1, Ordering::AcqRel);
        self.live.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MockReader {
            records,
            live: Arc::clone(&self.live),
        }))
    }
}

pub struct MockReader {
    records: HashMap<IpAddr, GeoRecord>,
    live: Arc<AtomicUsize>,
}
impl GeoReader for MockReader {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        Ok(self.records.get(&ip).cloned())
    }

    fn metadata(&self) -> DatabaseMetadata {
        DatabaseMetadata {
            database_type: "mock".to_string(),
            node_count: u32::try_from(self.records.len()).unwrap_or(u32::MAX),
            ..DatabaseMetadata::default()
        }
    }
}
impl Drop for MockReader {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}
