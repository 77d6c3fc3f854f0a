use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gophermart_core::store::{StoreError, WithdrawError};
use thiserror::Error;

/// Failures of the user API, each mapped to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("login is already taken")]
    LoginTaken,

    #[error("order number fails the Luhn check")]
    InvalidOrderNumber,

    #[error("order was uploaded by another user")]
    OrderOwnedByAnother,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<WithdrawError> for ApiError {
    fn from(error: WithdrawError) -> Self {
        match error {
            WithdrawError::InvalidReference => ApiError::InvalidOrderNumber,
            WithdrawError::NonPositiveAmount => ApiError::BadRequest("sum must be positive"),
            WithdrawError::InsufficientFunds { .. } => ApiError::InsufficientFunds,
            WithdrawError::Store(e) => ApiError::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::LoginTaken | ApiError::OrderOwnedByAnother => StatusCode::CONFLICT,
            ApiError::InvalidOrderNumber => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ApiError::Store(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}
