use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;

/// Placeholder in issue bodies that is replaced by the server's own base URL,
/// so thumbnail links can point back at the mock.
pub const BASE_PLACEHOLDER: &str = "{base}";

/// Canned responses for a mock tracker.
#[derive(Debug, Clone, Default)]
pub struct MockTracker {
    issues: HashMap<String, (u16, String)>,
    thumbnails: HashMap<String, Vec<u8>>,
    required_token: Option<String>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `fields` for `key` with status 200.
    pub fn issue(mut self, key: &str, fields: serde_json::Value) -> Self {
        let body = serde_json::json!({ "key": key, "fields": fields }).to_string();
        self.issues.insert(key.to_string(), (200, body));
        self
    }

    /// Serve an arbitrary status and raw body for `key`.
    pub fn issue_status(mut self, key: &str, status: u16, body: &str) -> Self {
        self.issues
            .insert(key.to_string(), (status, body.to_string()));
        self
    }

    /// Serve `data` at `{base}/thumbnails/{name}`.
    pub fn thumbnail(mut self, name: &str, data: &[u8]) -> Self {
        self.thumbnails.insert(name.to_string(), data.to_vec());
        self
    }

    /// Reject requests without `Authorization: Bearer {token}`.
    pub fn require_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }
}

#[derive(Clone)]
struct MockState {
    base_url: String,
    tracker: Arc<MockTracker>,
    issue_hits: Arc<AtomicUsize>,
    thumbnail_hits: Arc<AtomicUsize>,
}

impl MockState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = &self.tracker.required_token else {
            return true;
        };
        let expected = format!("Bearer {token}");
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

/// A running mock tracker with its base URL and request counters.
pub struct MockServer {
    pub base_url: String,
    issue_hits: Arc<AtomicUsize>,
    thumbnail_hits: Arc<AtomicUsize>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub fn issue_hits(&self) -> usize {
        self.issue_hits.load(Ordering::SeqCst)
    }

    pub fn thumbnail_hits(&self) -> usize {
        self.thumbnail_hits.load(Ordering::SeqCst)
    }

    /// Total requests served, of any kind.
    pub fn total_hits(&self) -> usize {
        self.issue_hits() + self.thumbnail_hits()
    }

    pub fn thumbnail_url(&self, name: &str) -> String {
        format!("{}/thumbnails/{name}", self.base_url)
    }
}

/// Spawn the mock tracker on a random port.
pub async fn spawn_mock_tracker(tracker: MockTracker) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let issue_hits = Arc::new(AtomicUsize::new(0));
    let thumbnail_hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        base_url: base_url.clone(),
        tracker: Arc::new(tracker),
        issue_hits: issue_hits.clone(),
        thumbnail_hits: thumbnail_hits.clone(),
    };
    let app = Router::new()
        .route("/rest/api/2/issue/{key}", get(get_issue))
        .route("/thumbnails/{name}", get(get_thumbnail))
        .with_state(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockServer {
        base_url,
        issue_hits,
        thumbnail_hits,
        _handle: handle,
    }
}

async fn get_issue(
    State(state): State<MockState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.issue_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }
    match state.tracker.issues.get(&key) {
        Some((status, body)) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = body.replace(BASE_PLACEHOLDER, &state.base_url);
            (status, [("content-type", "application/json")], body).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            [("content-type", "application/json")],
            r#"{"errorMessages":["Issue does not exist or you do not have permission to see it."]}"#,
        )
            .into_response(),
    }
}

async fn get_thumbnail(
    State(state): State<MockState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.thumbnail_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }
    match state.tracker.thumbnails.get(&name) {
        Some(data) => (StatusCode::OK, Bytes::from(data.clone())).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
