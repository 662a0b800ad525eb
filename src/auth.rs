use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use sqlx::Row;
use thiserror::Error;

use crate::db::Db;

const AUTH_COOKIE_NAME: &str = "auth_token";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub current_level: i64,
    pub is_placement_completed: bool,
}

impl AuthUser {
    pub fn is_teacher(&self) -> bool {
        self.role == "teacher"
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("database error: {0}")]
    Database(String),
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.to_string())
}

pub async fn verify_request_token(db: &Db, token: &str) -> Result<AuthUser, AuthError> {
    let claims = verify_jwt_hs256(token, &jwt_secret())?;
    fetch_user(db, &claims.user_id).await
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "insecure-dev-secret".to_string())
}

fn token_ttl_seconds() -> i64 {
    std::env::var("TOKEN_TTL_SECONDS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS)
}

#[derive(Debug, Clone)]
struct JwtClaims {
    user_id: String,
}

pub fn sign_jwt_for_user(user_id: &str) -> Result<String, AuthError> {
    let issued_at = Utc::now();
    let exp = issued_at.timestamp() + token_ttl_seconds();

    let header_json = serde_json::json!({
        "alg": "HS256",
        "typ": "JWT",
    });
    let payload_json = serde_json::json!({
        "userId": user_id,
        "iat": issued_at.timestamp(),
        "exp": exp,
    });

    let header_b64 = URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&header_json).map_err(|_| AuthError::InvalidToken)?);
    let payload_b64 = URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&payload_json).map_err(|_| AuthError::InvalidToken)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac =
        HmacSha256::new_from_slice(jwt_secret().as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{sig_b64}"))
}

fn verify_jwt_hs256(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;

    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?;
    if alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

    validate_registered_claims(&payload_json)?;

    let user_id = payload_json
        .get("userId")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?
        .to_string();

    Ok(JwtClaims { user_id })
}

fn validate_registered_claims(payload: &serde_json::Value) -> Result<(), AuthError> {
    let now = Utc::now().timestamp();

    if let Some(exp) = payload.get("exp").and_then(|value| value.as_i64()) {
        if now >= exp {
            return Err(AuthError::InvalidToken);
        }
    }

    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(())
}

pub async fn fetch_user(db: &Db, user_id: &str) -> Result<AuthUser, AuthError> {
    let row = sqlx::query(
        r#"
        SELECT "id","username","email","role","currentLevel","isPlacementCompleted"
        FROM "users"
        WHERE "id" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db.pool())
    .await
    .map_err(|err| AuthError::Database(err.to_string()))?;

    let Some(row) = row else {
        return Err(AuthError::InvalidToken);
    };

    auth_user_from_row(&row)
}

pub fn auth_user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuthUser, AuthError> {
    Ok(AuthUser {
        id: row
            .try_get("id")
            .map_err(|err| AuthError::Database(err.to_string()))?,
        username: row
            .try_get("username")
            .map_err(|err| AuthError::Database(err.to_string()))?,
        email: row
            .try_get("email")
            .map_err(|err| AuthError::Database(err.to_string()))?,
        role: row
            .try_get("role")
            .map_err(|err| AuthError::Database(err.to_string()))?,
        current_level: row
            .try_get("currentLevel")
            .map_err(|err| AuthError::Database(err.to_string()))?,
        is_placement_completed: row
            .try_get("isPlacementCompleted")
            .map_err(|err| AuthError::Database(err.to_string()))?,
    })
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in raw.split(';') {
        if let Some((key, value)) = part.trim().split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}
