mod cli;
mod error;
mod server;
mod session;

#[cfg(test)]
mod integration_tests;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use feedhub_core::{spawn_refresher, CacheStore, Config, HttpFetcher};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;
use crate::server::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = cli::Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "feedhub stopped");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run(cli: cli::Cli) -> Result<(), ServerError> {
    let config = Arc::new(Config::from_file(&cli.config)?);
    info!(
        config = %cli.config.display(),
        sources = config.values.len(),
        refresh_minutes = config.refresh,
        push_minutes = config.auto_update_push,
        "configuration loaded"
    );

    let store = CacheStore::open(&config.db_path).await?;
    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout())?);
    let refresher = spawn_refresher(
        config.values.clone().into(),
        config.refresh_interval(),
        fetcher,
        store.clone(),
    );

    let state = AppState {
        store: store.clone(),
        config,
    };
    let result = server::run_server(state, shutdown_signal()).await;

    if let Err(err) = refresher.stop().await {
        warn!(error = %err, "refresh loop did not stop cleanly");
    }
    store.close().await;
    info!("feedhub shut down");
    result
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // without a signal handler the server just runs until killed
        error!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
