use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::response::AppError;
use crate::routes::{map_engine_error, require_teacher, require_user, SuccessResponse};
use crate::services::lesson::{self, CreateLessonInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLessonRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content_text: Option<String>,
    #[serde(default = "default_difficulty")]
    difficulty: i64,
}

fn default_difficulty() -> i64 {
    3
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    let created = lesson::create_lesson(
        state.db(),
        CreateLessonInput {
            title: payload.title,
            description: payload.description,
            content_text: payload.content_text,
            difficulty: payload.difficulty,
        },
    )
    .await
    .map_err(map_engine_error)?;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(created))).into_response())
}

pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    require_user(&state, &headers).await?;

    let lessons = lesson::list_lessons(state.db())
        .await
        .map_err(map_engine_error)?;
    Ok(Json(SuccessResponse::new(lessons)).into_response())
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    lesson::delete_lesson(state.db(), &id)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(SuccessResponse::new(serde_json::json!({"deleted": true}))).into_response())
}

pub(crate) async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    require_user(&state, &headers).await?;

    let found = lesson::get_lesson(state.db(), &id)
        .await
        .map_err(map_engine_error)?;
    Ok(Json(SuccessResponse::new(found)).into_response())
}
