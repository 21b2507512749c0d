//! Local filesystem store for database files.
//!
//! Files live directly inside a single runtime directory (by default the one
//! holding the executable) and are accessed via `tokio::fs` for async I/O.

use crate::error::{ErrorKind, Result};
use crate::naming::{DatabaseFile, NamingScheme};
use crate::path::validate_file_name;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry, File};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

const PARTIAL_SUFFIX: &str = ".partial";

/// The runtime directory holding installed database files.
///
/// # Examples
///
/// ```no_run
/// use ipgeo_storage::{LocalStore, NamingScheme};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("/var/lib/ipgeo", NamingScheme::default())?;
/// if let Some(file) = store.scan().await? {
///     println!("installed: {file} ({})", file.version());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
    scheme: NamingScheme,
}
impl LocalStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(root: impl AsRef<Path>, scheme: NamingScheme) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it only happens once at startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { root, scheme })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scheme(&self) -> &NamingScheme {
        &self.scheme
    }

    /// Absolute path of a database file inside this store.
    pub fn path_of(&self, file: &DatabaseFile) -> Result<PathBuf> {
        Ok(self.root.join(validate_file_name(file.name())?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    async fn process_entry(&self, entry: DirEntry) -> Option<DatabaseFile> {
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::trace!(path = %path.display(), "Skipping non UTF-8 file name");
            return None;
        };
        let file = self.scheme.parse(name)?;
        // Follow symlinks: a link to a database file is a database file.
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Some(file),
            Ok(_) => None,
            Err(err) => {
                // Most likely a broken symlink; silently drop it.
                tracing::trace!(path = %path.display(), error = %err, "Skipping unreadable entry");
                None
            },
        }
    }

    /// List every installed database file, oldest version first.
    ///
    /// Non-recursive; directories and names outside the naming scheme are
    /// ignored.
    #[instrument(skip(self), fields(root = %self.root.display(), found))]
    pub async fn list(&self) -> Result<Vec<DatabaseFile>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| Self::map_io_error(e, &self.root))?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, &self.root))? {
            if let Some(file) = self.process_entry(entry).await {
                files.push(file);
            }
        }
        files.sort();
        tracing::Span::current().record("found", files.len());
        Ok(files)
    }

    /// Find the installed database file.
    ///
    /// Absence is a valid cold-start state and yields `None`. When several
    /// versions are present (a previous cleanup failed), the newest version
    /// wins regardless of directory listing order.
    pub async fn scan(&self) -> Result<Option<DatabaseFile>> {
        let mut files = self.list().await?;
        if files.len() > 1 {
            tracing::warn!(
                root = %self.root.display(),
                files = ?files.iter().map(DatabaseFile::name).collect::<Vec<_>>(),
                "Multiple database versions installed; using the newest",
            );
        }
        Ok(files.pop())
    }

    /// Start writing `file` under a temporary name.
    ///
    /// The partial file is invisible to [`scan()`](Self::scan) until
    /// [`promote()`](Self::promote)d, and removed if dropped before that.
    pub async fn create_partial(&self, file: &DatabaseFile) -> Result<PartialFile> {
        let target = self.path_of(file)?;
        let path = self.root.join(validate_file_name(&format!("{}{PARTIAL_SUFFIX}", file.name()))?);
        let handle = File::create(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        tracing::debug!(path = %path.display(), "Created partial database file");
        Ok(PartialFile {
            path,
            target,
            file: file.clone(),
            handle: Some(handle),
            written: 0,
            promoted: false,
        })
    }

    /// Flush a partial file to disk and atomically rename it to its final
    /// name, replacing any existing file of the same name.
    #[instrument(skip(self, partial), fields(file = %partial.file, bytes = partial.written))]
    pub async fn promote(&self, mut partial: PartialFile) -> Result<DatabaseFile> {
        if let Some(mut handle) = partial.handle.take() {
            handle.flush().await.map_err(|e| Self::map_io_error(e, &partial.path))?;
            handle.sync_all().await.map_err(|e| Self::map_io_error(e, &partial.path))?;
        }
        fs::rename(&partial.path, &partial.target)
            .await
            .map_err(|e| Self::map_io_error(e, &partial.target))?;
        partial.promoted = true;
        Ok(partial.file.clone())
    }

    /// Delete an installed database file.
    pub async fn delete(&self, file: &DatabaseFile) -> Result<()> {
        let path = self.path_of(file)?;
        Ok(fs::remove_file(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }
}

/// A database file being written under a temporary name.
///
/// Dropping it without [`LocalStore::promote`] removes what was written so
/// far, so a failed or cancelled download never leaves debris behind.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    target: PathBuf,
    file: DatabaseFile,
    handle: Option<File>,
    written: u64,
    promoted: bool,
}
impl PartialFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &DatabaseFile {
        &self.file
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let Some(handle) = self.handle.as_mut() else {
            exn::bail!(ErrorKind::InvalidPath(self.path.clone()));
        };
        handle.write_all(buf).await.map_err(|e| LocalStore::map_io_error(e, &self.path))?;
        self.written += buf.len() as u64;
        Ok(())
    }
}
impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.promoted {
            return;
        }
        drop(self.handle.take());
        // Drop cannot await.
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed abandoned partial database file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to remove partial database file")
            },
        }
    }
}
