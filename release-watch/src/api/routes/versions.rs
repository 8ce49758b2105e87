//! Stored version routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{LatestVersionsQuery, VersionResponse};
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/latest", get(latest_versions))
}

/// Most recently recorded versions, newest first.
async fn latest_versions(
    State(state): State<AppState>,
    Query(query): Query<LatestVersionsQuery>,
) -> ApiResult<Json<Vec<VersionResponse>>> {
    let versions = state
        .versions
        .ok_or_else(|| ApiError::service_unavailable("Version store not available"))?;

    let rows = versions.list_recent(query.effective_limit()).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
