use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use release_watch::api::{ApiServer, AppState};
use release_watch::config::AppConfig;
use release_watch::database::Database;
use release_watch::database::repositories::{
    SqlxVersionRepository, SqlxWatchListRepository, VersionRepository, WatchListRepository,
};
use release_watch::detector::ChangeDetector;
use release_watch::dispatcher::Dispatcher;
use release_watch::fetcher::FetcherSet;
use release_watch::logging;
use release_watch::notification::build_channels;
use release_watch::utils::http_client::build_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;
    config.validate()?;

    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    let watch_list = Arc::new(SqlxWatchListRepository::new(
        db.pool.clone(),
        db.write_pool.clone(),
    ));
    let versions = Arc::new(SqlxVersionRepository::new(db.pool, db.write_pool));

    let items = watch_list
        .list_all()
        .await
        .context("Watch list is unavailable")?;
    info!(items = items.len(), "Watch list loaded");

    match versions.prune_orphans().await {
        Ok(0) => {}
        Ok(pruned) => info!(pruned, "Removed versions of unwatched items"),
        Err(e) => warn!(error = %e, "Failed to prune orphaned versions"),
    }

    let client = build_client(config.request_timeout);
    let channels = build_channels(&config.channels, client.clone());
    let channel_types: Vec<&'static str> = channels.iter().map(|c| c.channel_type()).collect();
    let fetchers = Arc::new(FetcherSet::from_config(
        config.github.clone(),
        config.docker.clone(),
        client,
    ));

    let dispatcher = Dispatcher::new(
        watch_list.clone(),
        ChangeDetector::with_policy(versions.clone(), config.first_seen),
        fetchers,
        channels,
        config.dispatcher.clone(),
    );

    let cancel_token = CancellationToken::new();

    if let Some(log_dir) = &config.log_dir {
        logging::start_retention_cleanup(log_dir, cancel_token.clone());
    }

    let api_handle = if config.api_enabled {
        let state = AppState::with_repositories(watch_list, versions).with_channels(channel_types);
        let server = ApiServer::new(config.api.clone(), state, cancel_token.clone());
        let token = cancel_token.clone();
        Some(tokio::spawn(async move {
            let result = server.run().await;
            if let Err(e) = &result {
                error!(error = %e, "API server failed, shutting down");
                token.cancel();
            }
            result
        }))
    } else {
        None
    };

    {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            token.cancel();
        });
    }

    info!("release-watch started");
    dispatcher.run(cancel_token.clone()).await;

    if let Some(handle) = api_handle {
        handle.await.context("API server task panicked")??;
    }

    info!("release-watch stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Ctrl+C detected"),
                    _ = sigterm.recv() => info!("SIGTERM detected"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot listen for SIGTERM"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl+C");
        return;
    }
    info!("Ctrl+C detected");
}
