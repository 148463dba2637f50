//! API route definitions.

use super::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_LIMIT: usize = 50;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/incidents", get(list_incidents))
        .route("/summary", get(latest_summary))
}

#[derive(Debug, Deserialize)]
pub struct IncidentQuery {
    limit: Option<usize>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentQuery>,
) -> (StatusCode, Json<Value>) {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let store = state.store.clone();

    match tokio::task::spawn_blocking(move || store.list_recent(limit)).await {
        Ok(Ok(incidents)) => (
            StatusCode::OK,
            Json(json!({ "data": incidents, "meta": { "total": incidents.len(), "limit": limit } })),
        ),
        Ok(Err(e)) => internal_error(e.to_string()),
        Err(e) => internal_error(e.to_string()),
    }
}

async fn latest_summary(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let store = state.store.clone();

    match tokio::task::spawn_blocking(move || store.latest_summary()).await {
        Ok(Ok(Some(summary))) => (
            StatusCode::OK,
            Json(json!({ "data": summary, "meta": { "origins": summary.entries.len() } })),
        ),
        Ok(Ok(None)) => (
            StatusCode::OK,
            Json(json!({ "data": null, "meta": { "message": "no analysis runs stored yet" } })),
        ),
        Ok(Err(e)) => internal_error(e.to_string()),
        Err(e) => internal_error(e.to_string()),
    }
}

fn internal_error(message: String) -> (StatusCode, Json<Value>) {
    tracing::error!(error = %message, "api request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("Database error: {}", message) })),
    )
}
