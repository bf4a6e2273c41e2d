//! Entry point: parses configuration, opens the index database, and runs
//! the progression loop until a fatal error or a shutdown signal.

use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use validator_query::DbPool;
use validator_service::{BackfillClient, Cli, Config, ProgressionLoop};
use validator_state::StateBackend;

mod tracing_init;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli).wrap_err("failed to resolve configuration")?;

    let _log_guard = tracing_init::init(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "statediff-validator starting");

    let chain_config = config.chain_config().wrap_err("failed to load chain config")?;

    let pool = DbPool::connect(&config.db).await.wrap_err("failed to connect to index database")?;
    let backend = StateBackend::new(pool.clone());

    let backfill = match &config.eth_http_path {
        Some(path) => Some(BackfillClient::new(path, config.statediff_timeout).wrap_err("failed to build backfill rpc client")?),
        None => None,
    };

    if config.prom_metrics {
        let addr = format!("{}:{}", config.prom_http_addr, config.prom_http_port)
            .parse()
            .wrap_err("invalid prom_http_addr/prom_http_port")?;
        validator_metrics::install(addr).wrap_err("failed to start metrics exporter")?;
    }

    let cancel = CancellationToken::new();
    let (progress_tx, mut progress_rx) = mpsc::channel(16);
    tokio::spawn(async move { while progress_rx.recv().await.is_some() {} });

    if config.prom_db_stats {
        spawn_pool_stats_sampler(pool.clone(), cancel.clone());
    }

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        shutdown.cancel();
    });

    let loop_ = ProgressionLoop::new(config, chain_config, backend, backfill, Some(progress_tx), cancel);

    match loop_.run().await {
        Ok(()) => {
            info!("progression loop exited cleanly");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "progression loop exited with error");
            Err(err.into())
        }
    }
}

/// Waits for either SIGINT or SIGTERM. Falls back to `ctrl_c` alone on
/// platforms without `tokio::signal::unix` (non-Unix targets).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn spawn_pool_stats_sampler(pool: DbPool, cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(15)) => validator_metrics::record_pool_stats(&pool),
                _ = cancel.cancelled() => break,
            }
        }
    });
}
