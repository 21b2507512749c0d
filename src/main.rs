//! `ipgeo`: keeps a db-ip "IP to City Lite" database current and answers
//! lookups against it.

mod app;
mod cli;
mod error;

use crate::app::App;
use crate::cli::{Args, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use ipgeo_config::Config;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(args.verbose);
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "{}", *err);
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(url) = args.command.url() {
        config.source.url = Some(url.to_string());
        config.validate().or_raise(|| ErrorKind::Config)?;
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted; shutting down");
                cancel.cancel();
            }
        }
    });

    let app = App::new(config, cancel.clone())?;
    match args.command {
        Command::Update { .. } => app.update().await,
        Command::Lookup { offline, json, ips, .. } => app.lookup(&ips, offline, json).await,
        Command::Status => app.status().await,
        Command::Run { .. } => app.run(cancel).await,
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(concat!(
                "ipgeo=debug,ipgeo_config=debug,ipgeo_fetch=debug,",
                "ipgeo_registry=debug,ipgeo_storage=debug,ipgeo_updater=debug,info",
            ))
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
