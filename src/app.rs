//! Wiring from configuration to running components.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ipgeo_config::Config;
use ipgeo_fetch::{Fetcher, HttpTransport, Resolver, Transport};
use ipgeo_registry::{GeoRecord, HandleStatus, MmdbOpener, Registry};
use ipgeo_storage::{DatabaseFile, LocalStore};
use ipgeo_updater::Updater;
use serde::Serialize;
use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    config: Config,
    updater: Arc<Updater>,
}

#[derive(Serialize)]
struct Status {
    directory: PathBuf,
    installed: Vec<DatabaseFile>,
    active: Option<HandleStatus>,
}

#[derive(Serialize)]
struct LookupLine<'a> {
    ip: IpAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a GeoRecord>,
}

impl App {
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self> {
        let directory = config.directory().or_raise(|| ErrorKind::Config)?;
        let scheme = config.naming_scheme().or_raise(|| ErrorKind::Config)?;
        let page = config.page_url().or_raise(|| ErrorKind::Config)?;
        let store = LocalStore::new(&directory, scheme.clone()).or_raise(|| ErrorKind::Setup)?;
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(config.http_options()).or_raise(|| ErrorKind::Setup)?);
        let resolver = Resolver::new(Arc::clone(&transport), page, scheme);
        let fetcher = Fetcher::new(transport, cancel);
        let registry = Arc::new(Registry::new(Arc::new(MmdbOpener)));
        let updater = Updater::new(store, resolver, fetcher, registry).with_default_url(config.source.url.clone());
        tracing::debug!(directory = %directory.display(), "Initialised");
        Ok(Self {
            config,
            updater: Arc::new(updater),
        })
    }

    pub async fn update(&self) -> Result<()> {
        let outcome = self.updater.update(None).await.or_raise(|| ErrorKind::Update)?;
        println!("{outcome}");
        Ok(())
    }

    pub async fn lookup(&self, ips: &[IpAddr], offline: bool, json: bool) -> Result<()> {
        if offline {
            self.updater.load_local().await.or_raise(|| ErrorKind::Unavailable)?;
        } else if let Err(err) = self.updater.update(None).await {
            // Whatever was installed has been loaded on the way.
            tracing::warn!(error = ?err, "Update failed; using the installed database");
        }
        let registry = self.updater.registry();
        if registry.get().is_none() {
            exn::bail!(ErrorKind::Unavailable);
        }

        let mut out = std::io::stdout().lock();
        for &ip in ips {
            let record = registry.lookup(ip);
            if json {
                let line = LookupLine {
                    ip,
                    record: record.as_ref(),
                };
                serde_json::to_writer(&mut out, &line).or_raise(|| ErrorKind::Output)?;
                writeln!(out).or_raise(|| ErrorKind::Output)?;
            } else {
                let line = record.unwrap_or_default().summary_line(ip);
                writeln!(out, "{line}").or_raise(|| ErrorKind::Output)?;
            }
        }
        Ok(())
    }

    pub async fn status(&self) -> Result<()> {
        let store = self.updater.store();
        if let Err(err) = self.updater.load_local().await {
            tracing::warn!(error = ?err, "Installed database could not be loaded");
        }
        let status = Status {
            directory: store.root().to_path_buf(),
            installed: store.list().await.or_raise(|| ErrorKind::Inventory)?,
            active: self.updater.registry().status(),
        };
        let json = serde_json::to_string_pretty(&status).or_raise(|| ErrorKind::Output)?;
        println!("{json}");
        Ok(())
    }

    /// Run the periodic updater until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let interval = self.config.schedule.interval();
        let handle = Arc::clone(&self.updater).spawn_periodic(interval, cancel);
        handle.await.or_raise(|| ErrorKind::Update)
    }
}
