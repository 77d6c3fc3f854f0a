//! Request authentication.
//!
//! `AuthUser` accepts the session token from the `token` cookie or from an
//! `Authorization: Bearer` header and verifies it with
//! [`gophermart_sdk::session::SessionKey`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use gophermart_core::entities::UserId;
use gophermart_sdk::session::{SESSION_COOKIE, SessionError};

use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Errors returned by the [`AuthUser`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing session token")]
    MissingToken,
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] SessionError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "missing session token",
            AuthError::InvalidToken(SessionError::Expired) => "session expired",
            AuthError::InvalidToken(_) => "invalid session token",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_token(&parts.headers)
            .or_else(|| bearer_token(&parts.headers))
            .ok_or(AuthError::MissingToken)?;
        let claims = state.sessions.verify(token)?;
        Ok(AuthUser(UserId(claims.user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=1.2.abc; lang=ru"),
        );
        assert_eq!(cookie_token(&headers), Some("1.2.abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer 1.2.abc"));
        assert_eq!(bearer_token(&headers), Some("1.2.abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
