//! Admin HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::routes;
use crate::database::repositories::{VersionRepository, WatchListRepository};
use crate::error::{Error, Result};

/// Where the admin API listens.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Allow any origin, method and header.
    pub enable_cors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8088,
            enable_cors: true,
        }
    }
}

/// State shared by every handler. Stores are optional so routes can be
/// tested without a database.
#[derive(Clone)]
pub struct AppState {
    pub start_time: Instant,
    pub watch_list: Option<Arc<dyn WatchListRepository>>,
    pub versions: Option<Arc<dyn VersionRepository>>,
    /// Enabled channel types, reported by `/health`.
    pub channels: Vec<&'static str>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            watch_list: None,
            versions: None,
            channels: Vec::new(),
        }
    }

    pub fn with_repositories(
        watch_list: Arc<dyn WatchListRepository>,
        versions: Arc<dyn VersionRepository>,
    ) -> Self {
        Self {
            watch_list: Some(watch_list),
            versions: Some(versions),
            ..Self::new()
        }
    }

    pub fn with_channels(mut self, channels: Vec<&'static str>) -> Self {
        self.channels = channels;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            config,
            state,
            cancel_token,
        }
    }

    /// Token whose cancellation stops [`ApiServer::run`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router, adding CORS when enabled.
    pub fn build_router(&self) -> Router {
        let router = routes::create_router(self.state.clone());
        if !self.config.enable_cors {
            return router;
        }
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Start the server; returns once the cancellation token fires.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::Server(format!("invalid bind address: {e}")))?;
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "API server listening");

        let cancel_token = self.cancel_token.clone();
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move { cancel_token.cancelled().await })
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        info!("API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 8088);
        assert!(config.enable_cors);
    }

    #[tokio::test]
    async fn test_server_stops_on_cancel() {
        let token = CancellationToken::new();
        let server = ApiServer::new(
            ApiServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 0,
                enable_cors: false,
            },
            AppState::new(),
            token.clone(),
        );

        let handle = tokio::spawn(async move { server.run().await });
        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_bind_address() {
        let server = ApiServer::new(
            ApiServerConfig {
                bind_address: "not an address".to_string(),
                ..Default::default()
            },
            AppState::new(),
            CancellationToken::new(),
        );
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        assert!(runtime.block_on(server.run()).is_err());
        assert!(!server.cancel_token().is_cancelled());
    }
}
