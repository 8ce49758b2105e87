//! Local HTTP endpoints standing in for notification services.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::domain::{ReleaseEvent, ReleaseSnapshot, TrackedItem};

/// A request received by a test endpoint.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
struct EndpointState {
    status: StatusCode,
    reply: &'static str,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

async fn capture(
    State(state): State<EndpointState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    state.captured.lock().push(CapturedRequest {
        method,
        uri,
        headers,
        body,
    });
    (state.status, state.reply)
}

/// Start an endpoint answering every request with `status` and `reply`.
///
/// Returns the base URL and the requests received so far.
pub async fn spawn_endpoint(
    status: StatusCode,
    reply: &'static str,
) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = EndpointState {
        status,
        reply,
        captured: captured.clone(),
    };
    let app = Router::new().fallback(capture).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

pub fn repo_event(changelog: &str) -> ReleaseEvent {
    ReleaseEvent::from_snapshot(
        ReleaseSnapshot::new(
            TrackedItem::github("acme/app"),
            "v1.1.0",
            "https://github.com/acme/app/releases/tag/v1.1.0",
        )
        .with_changelog(changelog),
    )
}

pub fn image_event() -> ReleaseEvent {
    ReleaseEvent::from_snapshot(ReleaseSnapshot::new(
        TrackedItem::docker("library/nginx"),
        "sha256:feedbeef",
        "https://hub.docker.com/_/nginx",
    ))
}
