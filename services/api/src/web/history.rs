//! services/api/src/web/history.rs
//!
//! Read-side handlers over completed sessions: the caller's user record, their
//! past sessions and the weak spots aggregated from them. Every lookup is
//! scoped to the caller; another user's session is indistinguishable from a
//! missing one.

use crate::error::{ApiError, ErrorBody};
use crate::web::protocol::{DeleteSessionResponse, PageParams, SessionPage};
use crate::web::state::AppState;
use crate::web::validation::validate_page;
use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use debugmate_core::domain::{CompletedSession, User, UserIdentity, WeakSpot};
use debugmate_core::ports::PortError;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

async fn current_user(app_state: &AppState, identity: &UserIdentity) -> Result<User, ApiError> {
    app_state
        .db
        .get_or_create_user(&identity.user_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to load user: {}", e)))
}

fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation("id", "Invalid session ID"))
}

fn not_found_or_internal(e: PortError) -> ApiError {
    match e {
        PortError::NotFound(_) => ApiError::SessionNotFound,
        other => ApiError::Internal(other.to_string()),
    }
}

/// The caller's user record, created on first use.
#[utoipa::path(
    get,
    path = "/user",
    responses(
        (status = 200, description = "The caller's plan and usage", body = User),
        (status = 401, description = "Missing or invalid identity", body = ErrorBody)
    )
)]
pub async fn get_user_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(current_user(&app_state, &identity).await?))
}

/// A page of the caller's completed sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    params(PageParams),
    responses(
        (status = 200, description = "One page of session summaries", body = SessionPage),
        (status = 400, description = "Invalid pagination", body = ErrorBody),
        (status = 401, description = "Missing or invalid identity", body = ErrorBody)
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Query(params): Query<PageParams>,
) -> Result<Json<SessionPage>, ApiError> {
    let pagination = validate_page(&params)?;
    let user = current_user(&app_state, &identity).await?;
    let (data, total) = app_state
        .db
        .list_sessions(user.id, pagination.offset, pagination.page_size)
        .await?;

    let has_more = pagination.offset.saturating_add(data.len() as i64) < total;
    Ok(Json(SessionPage {
        data,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        has_more,
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "The completed session", body = CompletedSession),
        (status = 404, description = "No such session for this user", body = ErrorBody)
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> Result<Json<CompletedSession>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let user = current_user(&app_state, &identity).await?;
    let session = app_state
        .db
        .get_session_for_user(session_id, user.id)
        .await
        .map_err(not_found_or_internal)?;
    Ok(Json(session))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = DeleteSessionResponse),
        (status = 404, description = "No such session for this user", body = ErrorBody)
    )
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let user = current_user(&app_state, &identity).await?;
    app_state
        .db
        .delete_session_for_user(session_id, user.id)
        .await
        .map_err(not_found_or_internal)?;
    info!("User {} deleted session {}", identity.user_id, session_id);
    Ok(Json(DeleteSessionResponse { success: true }))
}

/// Recurring error categories, most frequent first.
#[utoipa::path(
    get,
    path = "/user/weak-spots",
    responses(
        (status = 200, description = "The caller's weak spots", body = [WeakSpot]),
        (status = 401, description = "Missing or invalid identity", body = ErrorBody)
    )
)]
pub async fn list_weak_spots_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<Vec<WeakSpot>>, ApiError> {
    let user = current_user(&app_state, &identity).await?;
    let mut spots = app_state.db.list_weak_spots(user.id).await?;
    spots.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
    Ok(Json(spots))
}
