//! Registration and login.
//!
//! Both answer `200` with an empty body and hand out a fresh session token
//! twice: as the `token` cookie and as an `Authorization: Bearer` header.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use gophermart_core::entities::UserId;
use gophermart_sdk::objects::Credentials;
use gophermart_sdk::session::SESSION_COOKIE;
use rand::RngCore;

use crate::api::error::ApiError;
use crate::state::AppState;

fn credentials(payload: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    let Json(credentials) = payload.map_err(|_| ApiError::BadRequest("invalid JSON body"))?;
    if !credentials.is_complete() {
        return Err(ApiError::BadRequest("login and password are required"));
    }
    Ok(credentials)
}

/// Argon2 is deliberately slow, keep it off the async workers.
async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let mut salt = [0u8; 16];
        rand::rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt).map_err(|e| ApiError::Internal(e.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(e.to_string()))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

fn session_headers(state: &AppState, user: UserId) -> Result<HeaderMap, ApiError> {
    let token = state
        .sessions
        .issue(user.0)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.sessions.ttl().whole_seconds()
    );
    let invalid = |_| ApiError::Internal("session token is not a valid header value".into());
    let cookie = HeaderValue::from_str(&cookie).map_err(invalid)?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(invalid)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);
    headers.insert(header::AUTHORIZATION, bearer);
    Ok(headers)
}

/// `POST /api/user/register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = credentials(payload)?;
    let hash = hash_password(credentials.password).await?;
    let user = state
        .store
        .create_user(&credentials.login, &hash)
        .await?
        .ok_or(ApiError::LoginTaken)?;
    tracing::info!(owner = %user, login = %credentials.login, "User registered");
    Ok((StatusCode::OK, session_headers(&state, user)?))
}

/// `POST /api/user/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = credentials(payload)?;
    let user = state
        .store
        .find_user(&credentials.login)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !verify_password(credentials.password, user.password_hash).await? {
        return Err(ApiError::InvalidCredentials);
    }
    Ok((StatusCode::OK, session_headers(&state, user.id)?))
}
