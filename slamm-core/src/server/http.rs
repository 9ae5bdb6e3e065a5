use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::router::{RequestRouter, SegmentOutcome};
use crate::segment::types::{Continuation, Segment};
use crate::utterance::session::DEFAULT_SESSION;

/// Header naming the conversation a segment belongs to.
pub const SESSION_HEADER: &str = "x-session-id";

const MAX_SESSION_ID_LEN: usize = 128;

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct ServerState {
    pub router: Arc<RequestRouter>,
}

/// HTTP front end for segment prediction.
pub struct SegmentServer {
    addr: SocketAddr,
    max_upload_bytes: usize,
    state: Arc<ServerState>,
}

impl SegmentServer {
    pub fn new(addr: SocketAddr, router: Arc<RequestRouter>) -> Self {
        Self {
            addr,
            max_upload_bytes: 64 * 1024 * 1024,
            state: Arc::new(ServerState { router }),
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn app(&self) -> Router {
        app(self.state.clone(), self.max_upload_bytes)
    }

    /// Run the server until ctrl+c.
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "HTTP server listening");

        axum::serve(listener, self.app())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await?;
        Ok(())
    }
}

/// Build the route table around `state`.
pub fn app(state: Arc<ServerState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/predict-segment", post(predict_segment))
        .route("/predict_video", post(predict_segment))
        .route("/sessions/:id", delete(reset_session))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "This is the working backend for SLAMM." }))
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
struct SegmentQuery {
    continuation: Option<String>,
    /// Legacy name of `continuation`.
    buffer: Option<String>,
    session: Option<String>,
}

/// Accept one segment: multipart (`file` + `continuation`) or a raw body with
/// `?continuation=` in the query string.
async fn predict_segment(
    State(state): State<Arc<ServerState>>,
    request: Request,
) -> Result<Json<SegmentOutcome>> {
    let Query(query) = Query::<SegmentQuery>::try_from_uri(request.uri())
        .map_err(|e| PipelineError::BadRequest(e.body_text()))?;
    let session_id = session_id(request.headers(), &query)?;
    let segment = read_segment(&query, request).await?;

    // Detached so a dropped connection cannot interrupt a flush half way.
    let router = state.router.clone();
    let outcome = tokio::spawn(async move { router.handle(&session_id, segment).await })
        .await
        .map_err(|e| PipelineError::Internal(format!("request task failed: {}", e)))??;

    Ok(Json(outcome))
}

async fn reset_session(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.router.reset(&id).await;
    StatusCode::NO_CONTENT
}

fn session_id(headers: &HeaderMap, query: &SegmentQuery) -> Result<String> {
    let raw = match headers.get(SESSION_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| PipelineError::BadRequest("session id is not valid text".to_string()))?
            .to_string(),
        None => query
            .session
            .clone()
            .unwrap_or_else(|| DEFAULT_SESSION.to_string()),
    };

    let id = raw.trim();
    if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
        return Err(PipelineError::BadRequest(format!(
            "session id must be 1-{} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    Ok(id.to_string())
}

async fn read_segment(query: &SegmentQuery, request: Request) -> Result<Segment> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let mut flag = query.continuation.clone().or_else(|| query.buffer.clone());
    let mut payload = None;

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| PipelineError::rejected(e.status(), e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| PipelineError::rejected(e.status(), e.body_text()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file" | "video" | "segment") => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| PipelineError::rejected(e.status(), e.body_text()))?;
                    payload = Some(bytes);
                }
                Some("continuation" | "buffer") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| PipelineError::rejected(e.status(), e.body_text()))?;
                    flag = Some(text);
                }
                _ => {}
            }
        }
    } else {
        let body = Bytes::from_request(request, &())
            .await
            .map_err(|e| PipelineError::rejected(e.status(), e.body_text()))?;
        if !body.is_empty() {
            payload = Some(body);
        }
    }

    let raw = flag.ok_or_else(|| {
        PipelineError::BadRequest("missing continuation field (0 or 1)".to_string())
    })?;
    let continuation = Continuation::parse(&raw).ok_or_else(|| {
        PipelineError::BadRequest(format!("continuation must be 0 or 1, got '{}'", raw))
    })?;

    Ok(Segment {
        payload,
        continuation,
    })
}
