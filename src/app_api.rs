//! HTTP surface: a single `POST /analyze` route.
//!
//! Schema problems come back as 400s with a short reason; any pipeline
//! failure is logged in full and answered with an opaque 500 so internal
//! details never leak.

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::embedding::EmbeddingClient;
use crate::pipeline::analyze::analyze_request;
use crate::schema::AnalyzeRequest;
use crate::sentiment::SentimentAnalyzer;
use crate::{LLMParams, TARGET_WEB_REQUEST};

/// Shared per-process state: immutable config plus the collaborator
/// clients, all constructed once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub sentiment: SentimentAnalyzer,
    pub embedder: EmbeddingClient,
    pub llm: Option<LLMParams>,
}

pub async fn serve(state: AppState) -> Result<()> {
    let app = Router::new()
        .route("/analyze", post(analyze))
        .with_state(Arc::new(state));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = format!("0.0.0.0:{}", port);

    let listener = TcpListener::bind(&addr).await?;
    info!(target: TARGET_WEB_REQUEST, "Server running on http://{}", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let req: AnalyzeRequest = match serde_json::from_value(payload) {
        Ok(req) => req,
        Err(e) => {
            info!(target: TARGET_WEB_REQUEST, "Rejected request: invalid schema: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request schema", "details": e.to_string() })),
            );
        }
    };
    if let Err(e) = req.validate() {
        info!(target: TARGET_WEB_REQUEST, "Rejected request: {}", e);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid request schema", "details": e.to_string() })),
        );
    }

    info!(
        target: TARGET_WEB_REQUEST,
        "Analyze request: {} baseline, {} comparison sentences",
        req.baseline.len(),
        req.comparison().map(|c| c.len()).unwrap_or(0)
    );

    match analyze_request(
        &req,
        &state.config,
        &state.sentiment,
        &state.embedder,
        state.llm.as_ref(),
    )
    .await
    {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => {
                error!(target: TARGET_WEB_REQUEST, "Failed to serialize response: {}", e);
                internal_error()
            }
        },
        Err(e) => {
            // Fail closed: log the chain, answer with a generic error.
            error!(target: TARGET_WEB_REQUEST, "Analyze request failed: {:#}", e);
            internal_error()
        }
    }
}

fn internal_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal Server Error" })),
    )
}
