mod analytics;
mod auth;
mod health;
mod learning;
mod lessons;
mod placement;
mod questions;

use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::services::EngineError;
use crate::state::AppState;

#[derive(Serialize)]
pub(crate) struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/lessons", get(lessons::list).post(lessons::create))
        .route("/api/lessons/:id", get(lessons::get_one).delete(lessons::remove))
        .route("/api/lessons/:id/questions", get(questions::list_for_lesson))
        .route("/api/questions", post(questions::create))
        .route("/api/questions/import", post(questions::import))
        .route(
            "/api/questions/placement-test",
            get(questions::placement_test),
        )
        .route(
            "/api/questions/:id",
            get(questions::get_one)
                .put(questions::update)
                .delete(questions::remove),
        )
        .route("/api/learning/submit", post(learning::submit))
        .route("/api/learning/summary", get(learning::summary))
        .route("/api/learning/trend", get(learning::trend))
        .route(
            "/api/learning/recommendation",
            get(learning::recommendation),
        )
        .route("/api/analytics/cohort", get(analytics::cohort))
        .route("/api/placement/complete", post(placement::complete))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> axum::response::Response {
    AppError::not_found("route not found").into_response()
}

/// Resolves the authenticated user or produces the 401 the handler returns
/// untouched.
pub(crate) async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    let token = crate::auth::extract_token(headers)
        .ok_or_else(|| AppError::unauthorized("authentication token required"))?;

    crate::auth::verify_request_token(state.db(), &token)
        .await
        .map_err(|err| match err {
            crate::auth::AuthError::Database(message) => {
                tracing::warn!(error = %message, "auth lookup failed");
                AppError::internal("auth lookup failed")
            }
            _ => AppError::unauthorized("invalid or expired token"),
        })
}

pub(crate) async fn require_teacher(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    let user = require_user(state, headers).await?;
    if !user.is_teacher() {
        return Err(AppError::forbidden("teacher role required"));
    }
    Ok(user)
}

pub(crate) fn map_engine_error(err: EngineError) -> AppError {
    match err {
        EngineError::Validation(message) => AppError::validation(message),
        EngineError::NotFound(message) => AppError::not_found(message),
        EngineError::Conflict(message) => AppError::conflict(message),
        EngineError::Store(sql_err) => {
            tracing::warn!(error = %sql_err, "record store operation failed");
            AppError::internal("record store operation failed")
        }
    }
}
