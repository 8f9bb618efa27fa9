//! # Route Handlers
//!
//! The root banner, the health check, the chat endpoint and the customer
//! identifier lookup.

use crate::{
    errors::AppError,
    state::AppState,
    types::{ChatRequest, ChatResponse, ResolveParams, ResolveResponse},
};
use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

/// The handler for the root (`/`) endpoint.
pub async fn root() -> &'static str {
    "concierge server is running."
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Runs one customer query through the support agent.
pub async fn chat_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    info!(user_id = %payload.user_id, "Received chat request.");
    let response = app_state
        .agent
        .process_query(
            &payload.user_id,
            &payload.query,
            payload.latitude,
            payload.longitude,
        )
        .await?;
    Ok(Json(ChatResponse { response }))
}

/// Resolves a user id, phone number or free text naming a customer to their id.
pub async fn resolve_user_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<ResolveResponse>, AppError> {
    app_state
        .profiles
        .find_user_id(&params.identifier)
        .map(|user_id| Json(ResolveResponse { user_id }))
        .ok_or_else(|| AppError::NotFound(format!("No customer matches '{}'.", params.identifier)))
}
