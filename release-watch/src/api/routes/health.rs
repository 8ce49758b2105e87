//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::api::models::{ComponentHealth, HealthResponse};
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// Returns 503 when the database cannot be read.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = Vec::new();
    let mut healthy = true;

    if let Some(watch_list) = &state.watch_list {
        match watch_list.list_all().await {
            Ok(items) => components.push(ComponentHealth {
                name: "database".to_string(),
                status: "healthy".to_string(),
                message: Some(format!("{} watched items", items.len())),
            }),
            Err(e) => {
                healthy = false;
                components.push(ComponentHealth {
                    name: "database".to_string(),
                    status: "unhealthy".to_string(),
                    message: Some(e.to_string()),
                });
            }
        }
    }

    components.push(ComponentHealth {
        name: "channels".to_string(),
        status: if state.channels.is_empty() { "degraded" } else { "healthy" }.to_string(),
        message: Some(state.channels.join(", ")).filter(|m| !m.is_empty()),
    });

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        components,
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::create_router;
    use crate::database::Database;
    use crate::database::repositories::{SqlxVersionRepository, SqlxWatchListRepository};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let db = Database::in_memory().await.unwrap();
        let state = AppState::with_repositories(
            Arc::new(SqlxWatchListRepository::new(db.pool.clone(), db.write_pool.clone())),
            Arc::new(SqlxVersionRepository::new(db.pool, db.write_pool)),
        )
        .with_channels(vec!["ntfy", "slack"]);

        let (status, json) = get_json(create_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"][0]["name"], "database");
        assert_eq!(json["components"][1]["message"], "ntfy, slack");
    }

    #[tokio::test]
    async fn test_liveness() {
        let (status, json) = get_json(create_router(AppState::new()), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "alive");
    }
}
