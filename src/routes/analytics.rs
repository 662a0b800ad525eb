use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::response::AppError;
use crate::routes::{map_engine_error, require_teacher, SuccessResponse};
use crate::services::stats;
use crate::state::AppState;

pub(crate) async fn cohort(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    require_teacher(&state, &headers).await?;

    let analytics = stats::cohort_analytics(state.db())
        .await
        .map_err(map_engine_error)?;
    Ok(Json(SuccessResponse::new(analytics)).into_response())
}
