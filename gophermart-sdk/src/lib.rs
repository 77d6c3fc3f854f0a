//! Shared types for the Gophermart loyalty service.
//!
//! - [`objects`]: JSON request and response bodies of the user API and the
//!   external accrual service.
//! - [`session`]: stateless HMAC-signed session tokens.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![forbid(unsafe_code)]

pub mod objects;
pub mod session;
