//! HTTP API: status routes plus a small assistant surface.

use crate::error::LlmOsError;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Route paths.
pub struct Endpoints;

impl Endpoints {
    pub const PING: &'static str = "/v1/ping";
    pub const HEALTH: &'static str = "/v1/health";
    pub const ASSISTANT_CHAT: &'static str = "/v1/assistant/chat";
    pub const ASSISTANT_RUNS: &'static str = "/v1/assistant/runs";
}

/// Build the router over a shared orchestrator.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(Endpoints::PING, get(ping))
        .route(Endpoints::HEALTH, get(health))
        .route(Endpoints::ASSISTANT_CHAT, post(chat))
        .route(Endpoints::ASSISTANT_RUNS, get(runs))
        .layer(cors)
        .with_state(orchestrator)
}

/// Bind and serve until the process is stopped.
pub async fn serve(orchestrator: Arc<Orchestrator>, addr: &str) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub run_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChatResponse {
    pub run_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Errors returned as `500 {"error": ...}`.
#[derive(Debug)]
pub struct ApiError(LlmOsError);

impl From<LlmOsError> for ApiError {
    fn from(err: LlmOsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Ping the API.
pub async fn ping() -> Json<Value> {
    Json(json!({ "ping": "pong" }))
}

/// Check the health of the API.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "success",
        "router": "status",
        "path": Endpoints::HEALTH,
    }))
}

/// Run one turn with the configured tools and team.
pub async fn chat(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(LlmOsError::InvalidInput("user_id is required".to_string()).into());
    }

    let mut options = orchestrator.settings().assistant_options();
    options.user_id = Some(req.user_id);
    options.run_id = req.run_id;

    let mut assistant = orchestrator.build_llm_os(&options)?;
    let run_id = assistant.create_run().await?;
    let response = assistant.run(&req.message).await?;

    Ok(Json(ChatResponse {
        run_id,
        content: response.content,
    }))
}

/// List stored run ids, newest first.
pub async fn runs(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Value>, ApiError> {
    let run_ids = orchestrator
        .storage()
        .get_all_run_ids(query.user_id.as_deref())
        .await?;
    Ok(Json(json!({ "run_ids": run_ids })))
}
