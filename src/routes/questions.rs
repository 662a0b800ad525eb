use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::routes::{map_engine_error, require_teacher, require_user, SuccessResponse};
use crate::services::question::{self, CreateQuestionInput, Question, QuestionPublic};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateQuestionRequest {
    lesson_id: String,
    content: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: String,
    #[serde(default = "default_difficulty")]
    difficulty_level: i64,
}

fn default_difficulty() -> i64 {
    1
}

/// Provider-authored records carry no lesson id of their own; the batch is
/// imported into one target lesson.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportQuestionsRequest {
    lesson_id: String,
    questions: Vec<ProviderQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderQuestion {
    content: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: String,
    #[serde(default = "default_difficulty")]
    difficulty_level: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResult {
    imported: i64,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    let created = question::create_question(
        state.db(),
        CreateQuestionInput {
            lesson_id: payload.lesson_id,
            content: payload.content,
            option_a: payload.option_a,
            option_b: payload.option_b,
            option_c: payload.option_c,
            option_d: payload.option_d,
            correct_answer: payload.correct_answer,
            difficulty_level: payload.difficulty_level,
        },
    )
    .await
    .map_err(map_engine_error)?;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(created))).into_response())
}

pub(crate) async fn import(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    let records: Vec<CreateQuestionInput> = payload
        .questions
        .into_iter()
        .map(|q| CreateQuestionInput {
            lesson_id: payload.lesson_id.clone(),
            content: q.content,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            correct_answer: q.correct_answer,
            difficulty_level: q.difficulty_level,
        })
        .collect();

    let imported = question::import_questions(state.db(), &payload.lesson_id, records)
        .await
        .map_err(map_engine_error)?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(ImportResult { imported })),
    )
        .into_response())
}

pub(crate) async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    let updated = question::update_question(
        state.db(),
        &id,
        CreateQuestionInput {
            lesson_id: payload.lesson_id,
            content: payload.content,
            option_a: payload.option_a,
            option_b: payload.option_b,
            option_c: payload.option_c,
            option_d: payload.option_d,
            correct_answer: payload.correct_answer,
            difficulty_level: payload.difficulty_level,
        },
    )
    .await
    .map_err(map_engine_error)?;

    Ok(Json(SuccessResponse::new(updated)).into_response())
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    question::delete_question(state.db(), &id)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(SuccessResponse::new(serde_json::json!({"deleted": true}))).into_response())
}

/// The diagnostic set for the placement test. Graded client side against a
/// score cap of ten, so the canonical answers ship with the questions.
pub(crate) async fn placement_test(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    require_user(&state, &headers).await?;

    let questions = question::placement_test_questions(state.db())
        .await
        .map_err(map_engine_error)?;

    Ok(Json(SuccessResponse::new(questions)).into_response())
}

pub(crate) async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let found = question::get_question(state.db(), &id)
        .await
        .map_err(map_engine_error)?;

    Ok(render_question(found, user.is_teacher()))
}

pub(crate) async fn list_for_lesson(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let questions = question::list_questions_for_lesson(state.db(), &id)
        .await
        .map_err(map_engine_error)?;

    if user.is_teacher() {
        return Ok(Json(SuccessResponse::new(questions)).into_response());
    }

    let public: Vec<QuestionPublic> = questions.into_iter().map(Into::into).collect();
    Ok(Json(SuccessResponse::new(public)).into_response())
}

fn render_question(found: Question, include_answer: bool) -> Response {
    if include_answer {
        Json(SuccessResponse::new(found)).into_response()
    } else {
        Json(SuccessResponse::new(QuestionPublic::from(found))).into_response()
    }
}
