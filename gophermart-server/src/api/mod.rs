//! User API.
//!
//! # Endpoints
//!
//! - `POST /register`          – create an account, start a session
//! - `POST /login`             – start a session
//! - `POST /orders`            – upload an order number (text body)
//! - `GET  /orders`            – list uploaded orders
//! - `GET  /balance`           – current and withdrawn points
//! - `POST /balance/withdraw`  – spend points against an order number
//! - `GET  /withdrawals`       – list withdrawals

pub mod auth;
pub mod balance;
pub mod error;
pub mod extractors;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the user API router, mounted under `/api/user`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/orders", post(orders::upload_order).get(orders::list_orders))
        .route("/balance", get(balance::get_balance))
        .route("/balance/withdraw", post(balance::withdraw))
        .route("/withdrawals", get(balance::list_withdrawals))
}
