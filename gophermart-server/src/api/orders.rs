//! Order upload and listing.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gophermart_core::entities::{OrderRecord, OrderStatus};
use gophermart_core::store::UploadOutcome;
use gophermart_core::utils::luhn;
use gophermart_sdk::objects::OrderResponse;

use crate::api::error::ApiError;
use crate::api::extractors::AuthUser;
use crate::state::AppState;

fn to_response(record: OrderRecord) -> OrderResponse {
    OrderResponse {
        accrual: match record.status {
            OrderStatus::Processed => record.accrual,
            _ => None,
        },
        number: record.number,
        status: record.status.into(),
        uploaded_at: record.uploaded_at,
    }
}

/// `POST /api/user/orders` with the order number as a plain text body.
pub async fn upload_order(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    body: String,
) -> Result<StatusCode, ApiError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(ApiError::BadRequest("order number is required"));
    }
    if !luhn::is_valid(number) {
        return Err(ApiError::InvalidOrderNumber);
    }
    match state.store.upload_order(owner, number).await? {
        UploadOutcome::Accepted => {
            tracing::info!(owner = %owner, order = %number, "Order accepted");
            Ok(StatusCode::ACCEPTED)
        }
        UploadOutcome::AlreadyUploaded => Ok(StatusCode::OK),
        UploadOutcome::OwnedByAnother => Err(ApiError::OrderOwnedByAnother),
    }
}

/// `GET /api/user/orders`, newest first; `204` when there are none.
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Response, ApiError> {
    let orders = state.store.orders_of(owner).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let orders: Vec<OrderResponse> = orders.into_iter().map(to_response).collect();
    Ok(Json(orders).into_response())
}
