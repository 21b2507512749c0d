use crate::error::{ErrorKind, Result};
use crate::reader::{DatabaseMetadata, GeoReader, Opener};
use crate::record::GeoRecord;
use arc_swap::ArcSwapOption;
use exn::ResultExt;
use ipgeo_storage::{DatabaseFile, validate_file_name};
use serde::Serialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

/// An open database bound to exactly one [`DatabaseFile`].
///
/// Handed out as `Arc<Handle>`; the reader is closed when the last clone is
/// dropped.
pub struct Handle {
    file: DatabaseFile,
    path: PathBuf,
    generation: u64,
    opened_at: OffsetDateTime,
    reader: Box<dyn GeoReader>,
}
impl Handle {
    pub fn file(&self) -> &DatabaseFile {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Increases by one with every successful [`Registry::open`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn opened_at(&self) -> OffsetDateTime {
        self.opened_at
    }

    pub fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        self.reader.lookup(ip)
    }

    pub fn metadata(&self) -> DatabaseMetadata {
        self.reader.metadata()
    }
}
impl Debug for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Handle")
            .field("file", &self.file)
            .field("generation", &self.generation)
            .field("opened_at", &self.opened_at)
            .finish_non_exhaustive()
    }
}
impl Drop for Handle {
    fn drop(&mut self) {
        tracing::debug!(file = %self.file, generation = self.generation, "Closing retired database handle");
    }
}

/// Snapshot of the active handle, for status reporting.
#[derive(Clone, Debug, Serialize)]
pub struct HandleStatus {
    pub file: DatabaseFile,
    pub path: PathBuf,
    pub generation: u64,
    pub opened_at: String,
    pub metadata: DatabaseMetadata,
}

/// Holds the currently active database handle.
///
/// Share it behind an `Arc` between the update path and every lookup site.
/// Reads are lock-free; a swap is a single atomic store, and the handle it
/// replaces stays usable by anyone who already borrowed it.
///
/// # Examples
///
/// ```no_run
/// use ipgeo_registry::{MmdbOpener, Registry};
/// use ipgeo_storage::NamingScheme;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Registry::new(Arc::new(MmdbOpener));
/// let file = NamingScheme::default().parse("dbip-city-lite-2022-07.mmdb");
/// registry.open(Path::new("/var/lib/ipgeo"), file.as_ref())?;
/// if let Some(record) = registry.lookup("8.8.8.8".parse()?) {
///     println!("{:?}", record.country_name());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    current: ArcSwapOption<Handle>,
    generation: AtomicU64,
    opener: Arc<dyn Opener>,
}
impl Registry {
    pub fn new(opener: Arc<dyn Opener>) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            opener,
        }
    }

    /// The active handle, or `None` when no database has been loaded yet
    /// (geolocation unavailable, not an error).
    ///
    /// Hold on to the returned handle only for the duration of a lookup;
    /// holding it longer delays closing a retired database.
    pub fn get(&self) -> Option<Arc<Handle>> {
        self.current.load_full()
    }

    /// Whether `file` is the one currently loaded.
    pub fn is_active(&self, file: &DatabaseFile) -> bool {
        self.current.load().as_ref().is_some_and(|handle| handle.file == *file)
    }

    /// Open `file` (inside `root`) and make it the active database.
    ///
    /// `None` is a no-op. The new reader is fully opened before it is
    /// published; if opening fails the previously active handle (if any)
    /// stays active and untouched. The previous handle is closed once the
    /// last in-flight lookup using it has finished.
    #[instrument(skip(self, root, file), fields(file = file.map(|f| f.name())))]
    pub fn open(&self, root: &Path, file: Option<&DatabaseFile>) -> Result<Option<Arc<Handle>>> {
        let Some(file) = file else {
            return Ok(None);
        };
        let name = validate_file_name(file.name()).or_raise(|| ErrorKind::InvalidPath(root.join(file.name())))?;
        let path = root.join(name);
        let reader = match self.opener.open(&path) {
            Ok(reader) => reader,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "Failed to open database; keeping the active one");
                return Err(err);
            },
        };
        let handle = Arc::new(Handle {
            file: file.clone(),
            path,
            generation: self.generation.fetch_add(1, Ordering::AcqRel) + 1,
            opened_at: OffsetDateTime::now_utc(),
            reader,
        });
        let previous = self.current.swap(Some(Arc::clone(&handle)));
        tracing::info!(
            file = %handle.file,
            generation = handle.generation,
            previous = previous.as_ref().map(|p| p.file.name()),
            "Activated database",
        );
        Ok(Some(handle))
    }

    /// Look up an address in the active database.
    ///
    /// `None` covers every case where geolocation is unavailable: no database
    /// loaded, address not covered, or a failed lookup (logged).
    pub fn lookup(&self, ip: IpAddr) -> Option<GeoRecord> {
        let handle = self.get()?;
        match handle.lookup(ip) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(%ip, file = %handle.file, error = ?err, "Lookup failed");
                None
            },
        }
    }

    pub fn status(&self) -> Option<HandleStatus> {
        let handle = self.get()?;
        Some(HandleStatus {
            file: handle.file.clone(),
            path: handle.path.clone(),
            generation: handle.generation,
            opened_at: handle.opened_at.format(&Rfc3339).unwrap_or_default(),
            metadata: handle.metadata(),
        })
    }
}
impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Registry").field("current", &self.get()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOpener;
    use ipgeo_storage::NamingScheme;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Duration;

    const US: &[(&str, &str, &str)] = &[("8.8.8.8", "US", "United States")];
    const AU: &[(&str, &str, &str)] = &[("8.8.8.8", "AU", "Australia")];

    fn install(dir: &Path, name: &str, records: &[(&str, &str, &str)]) -> DatabaseFile {
        std::fs::write(dir.join(name), MockOpener::database(records)).unwrap();
        NamingScheme::default().parse(name).unwrap()
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new(Arc::new(MockOpener::default()));
        assert!(registry.get().is_none());
        assert!(registry.lookup("8.8.8.8".parse().unwrap()).is_none());
        assert!(registry.status().is_none());
    }

    #[test]
    fn test_open_none_is_noop() {
        let opener = Arc::new(MockOpener::default());
        let registry = Registry::new(opener.clone());
        let dir = tempfile::tempdir().unwrap();
        assert!(registry.open(dir.path(), None).unwrap().is_none());
        assert!(registry.get().is_none());
        assert_eq!(opener.opens(), 0);
    }

    #[test]
    fn test_open_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let file = install(dir.path(), "dbip-city-lite-2022-07.mmdb", US);
        let registry = Registry::new(Arc::new(MockOpener::default()));
        let handle = registry.open(dir.path(), Some(&file)).unwrap().unwrap();
        assert_eq!(handle.generation(), 1);
        assert!(registry.is_active(&file));
        let record = registry.lookup("8.8.8.8".parse().unwrap()).unwrap();
        assert_eq!(record.country_name(), Some("United States"));
        assert!(registry.lookup("1.1.1.1".parse().unwrap()).is_none());
        let status = registry.status().unwrap();
        assert_eq!(status.file, file);
        assert_eq!(status.metadata.database_type, "mock");
    }

    #[test]
    fn test_swap_replaces_and_closes_previous() {
        let dir = tempfile::tempdir().unwrap();
        let old = install(dir.path(), "dbip-city-lite-2022-07.mmdb", US);
        let new = install(dir.path(), "dbip-city-lite-2022-09.mmdb", AU);
        let opener = Arc::new(MockOpener::default());
        let registry = Registry::new(opener.clone());
        registry.open(dir.path(), Some(&old)).unwrap();
        let borrowed = registry.get().unwrap();
        registry.open(dir.path(), Some(&new)).unwrap();
        assert!(registry.is_active(&new));
        assert_eq!(registry.get().unwrap().generation(), 2);
        // The borrowed, retired handle is still fully usable...
        let record = borrowed.lookup("8.8.8.8".parse().unwrap()).unwrap().unwrap();
        assert_eq!(record.country_name(), Some("United States"));
        assert_eq!(opener.live(), 2);
        // ...and is closed as soon as its last borrower lets go.
        drop(borrowed);
        assert_eq!(opener.live(), 1);
    }

    #[test]
    fn test_failed_open_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let good = install(dir.path(), "dbip-city-lite-2022-07.mmdb", US);
        std::fs::write(dir.path().join("dbip-city-lite-2022-09.mmdb"), b"\xff\xfe garbage").unwrap();
        let bad = NamingScheme::default().parse("dbip-city-lite-2022-09.mmdb").unwrap();
        let registry = Registry::new(Arc::new(MockOpener::default()));
        let before = registry.open(dir.path(), Some(&good)).unwrap().unwrap();
        let err = registry.open(dir.path(), Some(&bad)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Open(_)));
        let after = registry.get().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(registry.lookup("8.8.8.8".parse().unwrap()).is_some());
    }

    #[test]
    fn test_lookups_survive_concurrent_swaps() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            install(dir.path(), "dbip-city-lite-2022-07.mmdb", US),
            install(dir.path(), "dbip-city-lite-2022-09.mmdb", AU),
        ];
        let opener = Arc::new(MockOpener::default());
        let registry = Arc::new(Registry::new(opener.clone()));
        registry.open(dir.path(), Some(&files[0])).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let ip = "8.8.8.8".parse().unwrap();
                    let mut lookups = 0u64;
                    while !done.load(Ordering::Acquire) {
                        let handle = registry.get().expect("a database is always active");
                        let record = handle.lookup(ip).unwrap().unwrap();
                        assert!(matches!(record.country_name(), Some("United States" | "Australia")));
                        lookups += 1;
                    }
                    lookups
                })
            })
            .collect();

        for i in 0..200 {
            registry.open(dir.path(), Some(&files[i % 2])).unwrap();
            thread::sleep(Duration::from_micros(50));
        }
        done.store(true, Ordering::Release);
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(opener.opens(), 201);
        assert_eq!(registry.get().unwrap().generation(), 201);
        // Only the active handle survives once every reader is gone.
        assert_eq!(opener.live(), 1);
    }
}
