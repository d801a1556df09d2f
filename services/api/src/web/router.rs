//! services/api/src/web/router.rs
//!
//! Assembles the public and protected routes, the shared layers and the
//! Swagger UI into the application router.

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::history::{
    delete_session_handler, get_session_handler, get_user_handler, list_sessions_handler,
    list_weak_spots_handler,
};
use crate::web::middleware::require_auth;
use crate::web::rest::{complete_debug_handler, health_handler, start_debug_handler, ApiDoc};
use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Request bodies above this are rejected before reaching a handler.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let config = &app_state.config;

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let auth_header = HeaderName::from_bytes(config.auth_header.as_bytes()).map_err(|e| {
        ConfigError::InvalidValue("AUTH_HEADER".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, auth_header]);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/debug/start", post(start_debug_handler))
        .route("/debug/complete", post(complete_debug_handler))
        .route("/user", get(get_user_handler))
        .route("/user/weak-spots", get(list_weak_spots_handler))
        .route("/sessions", get(list_sessions_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
