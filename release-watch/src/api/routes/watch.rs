//! Watch-list routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{WatchListResponse, WatchRequest, WatchedItemResponse};
use crate::api::server::AppState;
use crate::database::repositories::WatchListRepository;
use crate::domain::{SourceKind, TrackedItem};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all))
        .route("/{kind}", get(list_kind).post(add_item).delete(remove_item))
}

fn repository(state: &AppState) -> ApiResult<Arc<dyn WatchListRepository>> {
    state
        .watch_list
        .clone()
        .ok_or_else(|| ApiError::service_unavailable("Watch list not available"))
}

fn parse_kind(kind: &str) -> ApiResult<SourceKind> {
    kind.parse::<SourceKind>().map_err(|_| {
        ApiError::not_found(format!(
            "unknown source kind '{}', expected 'github' or 'docker'",
            kind
        ))
    })
}

async fn list_all(State(state): State<AppState>) -> ApiResult<Json<WatchListResponse>> {
    let items = repository(&state)?.list_all().await?;
    Ok(Json(items.into()))
}

async fn list_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<WatchListResponse>> {
    let kind = parse_kind(&kind)?;
    let items = repository(&state)?.list_items(kind).await?;
    Ok(Json(items.into()))
}

async fn add_item(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<WatchRequest>,
) -> ApiResult<(StatusCode, Json<WatchedItemResponse>)> {
    let item = TrackedItem::new(parse_kind(&kind)?, request.identifier);
    item.validate()?;

    repository(&state)?.add(&item).await?;
    info!(item = %item, "Added to watch list");

    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn remove_item(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<WatchRequest>,
) -> ApiResult<Json<WatchedItemResponse>> {
    let item = TrackedItem::new(parse_kind(&kind)?, request.identifier);
    if item.identifier.trim().is_empty() {
        return Err(ApiError::validation("identifier must not be empty"));
    }

    repository(&state)?.remove(&item).await?;
    info!(item = %item, "Removed from watch list");

    Ok(Json(item.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::database::repositories::{
        SqlxVersionRepository, SqlxWatchListRepository, VersionRepository,
    };
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        versions: Arc<SqlxVersionRepository>,
    }

    async fn app() -> TestApp {
        let db = Database::in_memory().await.unwrap();
        let watch_list = Arc::new(SqlxWatchListRepository::new(
            db.pool.clone(),
            db.write_pool.clone(),
        ));
        let versions = Arc::new(SqlxVersionRepository::new(db.pool, db.write_pool));
        let state = AppState::with_repositories(watch_list, versions.clone());
        TestApp {
            router: Router::new().nest("/api/watch", router()).with_state(state),
            versions,
        }
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let app = app().await;
        let body = serde_json::json!({"identifier": "acme/app"});

        let (status, json) = call(&app.router, Method::POST, "/api/watch/github", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["kind"], "github");

        let (status, _) = call(&app.router, Method::POST, "/api/watch/docker", Some(serde_json::json!({"identifier": "nginx"}))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = call(&app.router, Method::GET, "/api/watch", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 2);

        let (_, json) = call(&app.router, Method::GET, "/api/watch/github", None).await;
        assert_eq!(json["items"][0]["identifier"], "acme/app");
        assert_eq!(json["total"], 1);

        let (status, _) = call(&app.router, Method::DELETE, "/api/watch/github", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let (_, json) = call(&app.router, Method::GET, "/api/watch/github", None).await;
        assert_eq!(json["total"], 0);
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let app = app().await;
        let body = serde_json::json!({"identifier": "acme/app"});
        call(&app.router, Method::POST, "/api/watch/github", Some(body.clone())).await;

        let (status, json) = call(&app.router, Method::POST, "/api/watch/github", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_invalid_identifier() {
        let app = app().await;
        for identifier in ["", "   ", "no-owner", "a//b"] {
            let (status, json) = call(
                &app.router,
                Method::POST,
                "/api/watch/github",
                Some(serde_json::json!({ "identifier": identifier })),
            )
            .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "identifier {identifier:?}");
            assert_eq!(json["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let app = app().await;
        let (status, _) = call(
            &app.router,
            Method::DELETE,
            "/api/watch/docker",
            Some(serde_json::json!({"identifier": "nginx"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_remove_drops_stored_version() {
        let app = app().await;
        let item = TrackedItem::github("acme/app");
        let body = serde_json::json!({"identifier": "acme/app"});
        call(&app.router, Method::POST, "/api/watch/github", Some(body.clone())).await;
        app.versions.upsert(&item, "v1.0.0", "notes").await.unwrap();

        let (status, _) = call(&app.router, Method::DELETE, "/api/watch/github", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.versions.get(&item).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let app = app().await;
        let (status, _) = call(&app.router, Method::GET, "/api/watch/gitlab", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_without_repository() {
        let router = Router::new()
            .nest("/api/watch", router())
            .with_state(AppState::new());
        let (status, _) = call(&router, Method::GET, "/api/watch", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
