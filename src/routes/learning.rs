use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::response::AppError;
use crate::routes::{map_engine_error, require_user, SuccessResponse};
use crate::services::grading::{self, SubmitAnswerInput};
use crate::services::{recommendation, stats};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitAnswerRequest {
    question_id: String,
    given_answer: String,
    #[serde(default)]
    time_spent_seconds: i64,
}

pub(crate) async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let submitted = grading::submit_answer(
        state.db(),
        state.learner_locks(),
        &user.id,
        SubmitAnswerInput {
            question_id: payload.question_id,
            given_answer: payload.given_answer,
            time_spent_seconds: payload.time_spent_seconds,
        },
    )
    .await
    .map_err(map_engine_error)?;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(submitted))).into_response())
}

pub(crate) async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let summary = stats::learner_summary(state.db(), &user.id)
        .await
        .map_err(map_engine_error)?;
    Ok(Json(SuccessResponse::new(summary)).into_response())
}

pub(crate) async fn trend(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let points = stats::learner_trend(state.db(), &user.id)
        .await
        .map_err(map_engine_error)?;
    Ok(Json(SuccessResponse::new(points)).into_response())
}

pub(crate) async fn recommendation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let rec = recommendation::recommendation_for_learner(state.db(), &user.id)
        .await
        .map_err(map_engine_error)?;
    Ok(Json(SuccessResponse::new(rec)).into_response())
}
