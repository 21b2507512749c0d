use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ipgeo_fetch::error::ErrorKind as FetchErrorKind;
use ipgeo_fetch::{Fetcher, Resolver};
use ipgeo_registry::Registry;
use ipgeo_storage::{DatabaseFile, LocalStore};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Result of a successful update attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The installed database already is the published one.
    UpToDate { current: DatabaseFile },
    /// A new database was downloaded and is now active.
    Updated {
        previous: Option<DatabaseFile>,
        current: DatabaseFile,
    },
}
impl UpdateOutcome {
    pub fn current(&self) -> &DatabaseFile {
        match self {
            Self::UpToDate { current } | Self::Updated { current, .. } => current,
        }
    }
}
impl Display for UpdateOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::UpToDate { current } => write!(f, "{current} is up to date"),
            Self::Updated { previous: Some(previous), current } => write!(f, "updated {previous} to {current}"),
            Self::Updated { previous: None, current } => write!(f, "installed {current}"),
        }
    }
}

/// Orchestrates update attempts against one runtime directory and one
/// [`Registry`].
pub struct Updater {
    store: LocalStore,
    resolver: Resolver,
    fetcher: Fetcher,
    registry: Arc<Registry>,
    default_url: Option<String>,
    /// Held for the whole of an attempt.
    lock: Mutex<()>,
}
impl Updater {
    pub fn new(store: LocalStore, resolver: Resolver, fetcher: Fetcher, registry: Arc<Registry>) -> Self {
        Self {
            store,
            resolver,
            fetcher,
            registry,
            default_url: None,
            lock: Mutex::new(()),
        }
    }

    /// Artifact URL to use when an update is not given one, instead of
    /// scraping the publisher page.
    pub fn with_default_url(mut self, url: Option<String>) -> Self {
        self.default_url = url;
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Load the installed database, if any, without contacting the network.
    ///
    /// Returns the file that is active afterwards.
    #[instrument(skip(self))]
    pub async fn load_local(&self) -> Result<Option<DatabaseFile>> {
        let _guard = self.lock.lock().await;
        let Some(local) = self.store.scan().await.or_raise(|| ErrorKind::Inventory)? else {
            tracing::info!(root = %self.store.root().display(), "No database installed");
            return Ok(None);
        };
        if !self.registry.is_active(&local) {
            self.activate(&local).await?;
        }
        Ok(Some(local))
    }

    /// Run one update attempt.
    ///
    /// The artifact URL is `explicit_url`, else the configured default URL,
    /// else whatever the publisher page links to. Concurrent calls queue up
    /// and each runs the full sequence in turn, so a second caller usually
    /// finds the database up to date.
    ///
    /// On error the previously active database (if any) stays active, and
    /// nothing but the already installed files is left in the directory.
    #[instrument(skip(self), fields(root = %self.store.root().display()))]
    pub async fn update(&self, explicit_url: Option<&str>) -> Result<UpdateOutcome> {
        let _guard = self.lock.lock().await;

        tracing::debug!(state = "scanning", "Looking for an installed database");
        let local = self.store.scan().await.or_raise(|| ErrorKind::Inventory)?;
        let usable = match &local {
            Some(file) if self.registry.is_active(file) => Some(file),
            Some(file) => match self.activate(file).await {
                Ok(()) => Some(file),
                Err(err) => {
                    tracing::warn!(file = %file, error = ?err, "Installed database is unusable; replacing it");
                    None
                },
            },
            None => None,
        };

        tracing::debug!(state = "resolving", "Resolving the published database");
        let url = explicit_url.or(self.default_url.as_deref());
        let artifact = self.resolver.resolve(url).await.or_raise(|| ErrorKind::Resolution)?;

        tracing::debug!(
            state = "comparing",
            remote = %artifact.file_name(),
            local = usable.map(|f| f.name()),
            "Comparing versions",
        );
        if let Some(file) = usable
            && artifact.installs(file)
        {
            tracing::info!(file = %file, "Database is up to date");
            return Ok(UpdateOutcome::UpToDate { current: file.clone() });
        }

        tracing::debug!(state = "downloading", url = %artifact.url(), "Downloading database");
        let current = self.fetcher.download(&artifact, &self.store).await.map_err(|err| {
            let kind = match *err {
                FetchErrorKind::Format => ErrorKind::Format,
                FetchErrorKind::Storage => ErrorKind::Io,
                _ => ErrorKind::Download,
            };
            err.raise(kind)
        })?;

        tracing::debug!(state = "swapping", file = %current, "Activating downloaded database");
        if let Err(err) = self.activate(&current).await {
            // A file that cannot be opened must not shadow a working one.
            if local.as_ref() != Some(&current)
                && let Err(cleanup) = self.store.delete(&current).await
            {
                tracing::warn!(file = %current, error = ?cleanup, "Failed to remove unusable download");
            }
            return Err(err);
        }

        tracing::debug!(state = "cleaning", "Removing superseded database");
        if let Some(previous) = local.as_ref().filter(|previous| **previous != current)
            && let Err(err) = self.store.delete(previous).await
        {
            tracing::warn!(file = %previous, error = ?err, "Failed to remove superseded database");
        }

        let outcome = UpdateOutcome::Updated {
            previous: local,
            current,
        };
        tracing::info!(%outcome, "Database updated");
        Ok(outcome)
    }

    /// Open `file` into the registry on the blocking pool.
    async fn activate(&self, file: &DatabaseFile) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let root = self.store.root().to_path_buf();
        let file = file.clone();
        tokio::task::spawn_blocking(move || registry.open(&root, Some(&file)).map(|_| ()))
            .await
            .or_raise(|| ErrorKind::Open)?
            .or_raise(|| ErrorKind::Open)
    }
}
