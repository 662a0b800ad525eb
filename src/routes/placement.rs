use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::response::AppError;
use crate::routes::{map_engine_error, require_user, SuccessResponse};
use crate::services::placement;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompletePlacementRequest {
    score: i64,
}

pub(crate) async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CompletePlacementRequest>,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;

    let result =
        placement::complete_placement(state.db(), state.placement(), &user.id, payload.score)
            .await
            .map_err(map_engine_error)?;

    Ok(Json(SuccessResponse::new(result)).into_response())
}
