//! Balance, withdrawals and withdrawal history.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gophermart_core::store::Withdrawal;
use gophermart_sdk::objects::{BalanceResponse, WithdrawRequest, WithdrawalResponse};

use crate::api::error::ApiError;
use crate::api::extractors::AuthUser;
use crate::state::AppState;

/// `GET /api/user/balance`
pub async fn get_balance(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.store.balance(owner).await?;
    Ok(Json(BalanceResponse {
        current: balance.current,
        withdrawn: balance.withdrawn,
    }))
}

/// `POST /api/user/balance/withdraw`
pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::BadRequest("invalid JSON body"))?;
    let withdrawal = Withdrawal::new(request.order.trim(), request.sum)?;
    let spending = state.store.withdraw(owner, &withdrawal).await?;
    tracing::info!(
        owner = %owner,
        order = %spending.order_reference,
        sum = %spending.amount,
        "Withdrawal processed"
    );
    Ok(StatusCode::OK)
}

/// `GET /api/user/withdrawals`, newest first; `204` when there are none.
pub async fn list_withdrawals(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Response, ApiError> {
    let spendings = state.store.withdrawals_of(owner).await?;
    if spendings.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let spendings: Vec<WithdrawalResponse> = spendings
        .into_iter()
        .map(|s| WithdrawalResponse {
            order: s.order_reference,
            sum: s.amount,
            processed_at: s.processed_at,
        })
        .collect();
    Ok(Json(spendings).into_response())
}
