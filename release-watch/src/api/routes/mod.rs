//! API route modules.

pub mod health;
pub mod versions;
pub mod watch;

use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::api::server::AppState;

/// Create the main API router with all routes.
///
/// Requests under `/api` are traced; health probes are not.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/api/watch", watch::router())
        .nest("/api/versions", versions::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Router::new()
        .merge(api)
        .nest("/health", health::router())
        .with_state(state)
}
