//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the debug protocol endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::debug_flow::{complete_debug_session, start_debug_session};
use crate::web::history;
use crate::web::protocol::{
    CompleteDebugRequest, CompleteDebugResponse, DeleteSessionResponse, SessionPage,
    StartDebugRequest, StartDebugResponse,
};
use crate::web::state::AppState;
use crate::web::validation::{validate_complete, validate_start};
use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    response::Json,
};
use debugmate_core::domain::{
    ClarifyingQuestion, CompletedSession, DebugReport, FixStep, Language, Plan, QuestionAnswer,
    RootCause, SessionSummary, Severity, SimilarBug, User, UserIdentity, WeakSpot, WhatToLearn,
};
use std::sync::Arc;
use tracing::debug;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        start_debug_handler,
        complete_debug_handler,
        history::get_user_handler,
        history::list_sessions_handler,
        history::get_session_handler,
        history::delete_session_handler,
        history::list_weak_spots_handler,
    ),
    components(
        schemas(
            StartDebugRequest, StartDebugResponse, CompleteDebugRequest, CompleteDebugResponse,
            SessionPage, DeleteSessionResponse, ErrorBody,
            ClarifyingQuestion, QuestionAnswer, DebugReport, RootCause, Severity, FixStep,
            WhatToLearn, SimilarBug, Language, Plan, User, CompletedSession, SessionSummary,
            WeakSpot,
        )
    ),
    tags(
        (name = "DebugMate API", description = "Guided debugging sessions: clarify, then report.")
    )
)]
pub struct ApiDoc;

/// Turns a body the JSON extractor refused into the standard validation error.
fn body_rejection(rejection: JsonRejection) -> ApiError {
    debug!("Rejected request body: {}", rejection.body_text());
    ApiError::validation("body", "Invalid request body")
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health_handler() -> &'static str {
    "ok"
}

/// Phase 1: submit code and an error, receive three clarifying questions.
#[utoipa::path(
    post,
    path = "/debug/start",
    request_body = StartDebugRequest,
    responses(
        (status = 200, description = "Draft created", body = StartDebugResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Missing or invalid identity", body = ErrorBody),
        (status = 403, description = "Plan limit reached", body = ErrorBody),
        (status = 503, description = "AI service unavailable", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    params(
        ("x-user-id" = String, Header, description = "Verified user id set by the auth proxy.")
    )
)]
pub async fn start_debug_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<StartDebugRequest>, JsonRejection>,
) -> Result<Json<StartDebugResponse>, ApiError> {
    let Json(request) = payload.map_err(body_rejection)?;
    let input = validate_start(request)?;
    let response = start_debug_session(&app_state, &identity, input).await?;
    Ok(Json(response))
}

/// Phase 2: answer the questions, receive the debug report.
#[utoipa::path(
    post,
    path = "/debug/complete",
    request_body = CompleteDebugRequest,
    responses(
        (status = 200, description = "Report generated", body = CompleteDebugResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Missing identity or not the session owner", body = ErrorBody),
        (status = 404, description = "Session expired or already completed", body = ErrorBody),
        (status = 503, description = "AI service unavailable", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    params(
        ("x-user-id" = String, Header, description = "Verified user id set by the auth proxy.")
    )
)]
pub async fn complete_debug_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<CompleteDebugRequest>, JsonRejection>,
) -> Result<Json<CompleteDebugResponse>, ApiError> {
    let Json(request) = payload.map_err(body_rejection)?;
    let input = validate_complete(request)?;
    let response = complete_debug_session(&app_state, &identity, input).await?;
    Ok(Json(response))
}
