use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::routes::{require_user, SuccessResponse};
use crate::state::AppState;

const ROLES: [&str; 2] = ["student", "teacher"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthPayload {
    token: String,
    user: AuthUser,
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let role = payload.role.unwrap_or_else(|| "student".to_string());

    if username.is_empty() || email.is_empty() {
        return Err(AppError::validation("username and email are required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("email is not valid"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::validation(
            "password must be at least 8 characters",
        ));
    }
    if !ROLES.contains(&role.as_str()) {
        return Err(AppError::validation("role must be student or teacher"));
    }

    let pool = state.db().pool();

    let existing: Option<String> = sqlx::query_scalar(
        r#"SELECT "id" FROM "users" WHERE "email" = $1 OR "username" = $2"#,
    )
    .bind(&email)
    .bind(&username)
    .fetch_optional(pool)
    .await
    .map_err(internal)?;
    if existing.is_some() {
        return Err(AppError::conflict("username or email is already registered"));
    }

    let password_hash = bcrypt::hash(&payload.password, 10)
        .map_err(|err| AppError::internal(format!("password hashing failed: {err}")))?;
    let user_id = Uuid::new_v4().to_string();
    let created_at = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO "users" ("id","username","email","passwordHash","role","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6)
        "#,
    )
    .bind(&user_id)
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(&role)
    .bind(created_at)
    .execute(pool)
    .await
    .map_err(internal)?;

    let token = crate::auth::sign_jwt_for_user(&user_id)
        .map_err(|err| AppError::internal(format!("token signing failed: {err}")))?;

    let user = AuthUser {
        id: user_id,
        username,
        email,
        role,
        current_level: 1,
        is_placement_completed: false,
    };

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(AuthPayload { token, user })),
    )
        .into_response())
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.trim().to_lowercase();

    let row = sqlx::query(
        r#"
        SELECT "id","username","email","passwordHash","role","currentLevel","isPlacementCompleted"
        FROM "users"
        WHERE "email" = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(state.db().pool())
    .await
    .map_err(internal)?;

    let Some(row) = row else {
        return Err(AppError::unauthorized("invalid email or password"));
    };

    let password_hash: String = sqlx::Row::try_get(&row, "passwordHash").map_err(internal)?;
    let matches = bcrypt::verify(&payload.password, &password_hash).unwrap_or(false);
    if !matches {
        return Err(AppError::unauthorized("invalid email or password"));
    }

    let user = crate::auth::auth_user_from_row(&row)
        .map_err(|err| AppError::internal(format!("user decode failed: {err}")))?;
    let token = crate::auth::sign_jwt_for_user(&user.id)
        .map_err(|err| AppError::internal(format!("token signing failed: {err}")))?;

    Ok(Json(SuccessResponse::new(AuthPayload { token, user })).into_response())
}

pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(SuccessResponse::new(user)).into_response())
}

fn internal(err: sqlx::Error) -> AppError {
    tracing::warn!(error = %err, "user store operation failed");
    AppError::internal("user store operation failed")
}
