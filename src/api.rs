use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::category::Category;
use crate::error::PipelineError;
use crate::job::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/api/v1/status", get(status))
        .route("/api/v1/trigger", post(trigger))
        .route("/api/v1/latest", get(latest))
        .route("/api/v1/test-webhook", post(test_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Envelope shared by the action endpoints.
#[derive(Debug, Serialize)]
struct ApiResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

fn category_param(q: &HashMap<String, String>) -> Category {
    Category::parse_or_default(q.get("type").map(String::as_str))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "News Digest Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "status": "/api/v1/status",
            "trigger": "/api/v1/trigger (POST)",
            "latest": "/api/v1/latest",
            "metrics": "/metrics",
        },
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
        "service": "news-digest",
    }))
}

async fn status(State(state): State<AppState>) -> Response {
    Json(state.orchestrator.status()).into_response()
}

async fn trigger(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let category = category_param(&q);
    match state.orchestrator.trigger_run(category) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::ok(
                format!("{} news job triggered successfully", category.label()),
                json!({ "triggered_at": Utc::now(), "type": category }),
            )),
        )
            .into_response(),
        Err(PipelineError::AlreadyRunning) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::err(
                "News job is already running",
                "Job in progress",
            )),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::err("Failed to trigger news job", e.to_string())),
        )
            .into_response(),
    }
}

async fn latest(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let category = category_param(&q);
    match state.orchestrator.fetch_preview(category).await {
        Ok(preview) => {
            let data = serde_json::to_value(&preview).unwrap_or(Value::Null);
            Json(ApiResponse::ok(
                format!("Latest {} news retrieved successfully", category.label()),
                data,
            ))
            .into_response()
        }
        Err(e) => {
            let message = match e {
                PipelineError::NoItemsScraped { .. } => "Failed to scrape news",
                _ => "Failed to process news with AI",
            };
            tracing::warn!(target: "job", %category, error = %e, "preview failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(message, e.to_string())),
            )
                .into_response()
        }
    }
}

async fn test_webhook(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let category = category_param(&q);
    let text = format!(
        "🧪 **Webhook test** ({})\n\nSent at {}",
        category.label(),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    match state.orchestrator.notifier().send_text(category, &text).await {
        Ok(()) => Json(ApiResponse::ok(
            "Discord webhook test successful",
            json!({ "type": category }),
        ))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::err("Discord webhook test failed", format!("{e:#}"))),
        )
            .into_response(),
    }
}
