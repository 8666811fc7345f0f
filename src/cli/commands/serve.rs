//! HTTP API server for integration with other systems.
//!
//! Exposes the chat loop over REST so a bot front-end can forward messages
//! keyed by its own chat id.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationId;
use crate::error::TolkError;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tolk doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(&settings)?;
    let app = router(Arc::new(AppState { orchestrator }));

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Tolk API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /chat/{conversation_id}");
    Output::kv("Reset", "POST /chat/{conversation_id}/reset");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat/{conversation_id}", post(chat))
        .route("/chat/{conversation_id}/reset", post(reset))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    /// answer, empty, exhausted, invalid or error
    outcome: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools_used: Vec<String>,
}

#[derive(Serialize)]
struct ResetResponse {
    reply: String,
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider = state.orchestrator.provider();
    Json(serde_json::json!({
        "status": "ok",
        "provider": provider.name(),
        "model": provider.model(),
        "tools": provider.supports_tool_calling(),
        "conversations": state.orchestrator.store().conversation_count(),
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let id = ConversationId::parse(&conversation_id);
    let orchestrator = &state.orchestrator;

    match orchestrator.handle_message(&id, &req.message).await {
        Ok(response) => Json(ChatResponse {
            reply: orchestrator.render(&response.outcome),
            outcome: response.outcome.label(),
            tools_used: response.tool_calls.iter().map(|c| c.name.clone()).collect(),
        })
        .into_response(),
        Err(TolkError::InvalidInput(reason)) => (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                reply: reason,
                outcome: "invalid",
                tools_used: Vec::new(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Error handling message for {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    reply: orchestrator.prompts().failure.clone(),
                    outcome: "error",
                    tools_used: Vec::new(),
                }),
            )
                .into_response()
        }
    }
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> impl IntoResponse {
    state
        .orchestrator
        .reset(&ConversationId::parse(&conversation_id))
        .await;
    Json(ResetResponse {
        reply: state.orchestrator.prompts().reset.clone(),
    })
}
