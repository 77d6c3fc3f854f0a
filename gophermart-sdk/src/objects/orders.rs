//! Order listing types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `gophermart-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

/// One entry of `GET /api/user/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatus,
    /// Only present once the order is `PROCESSED`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: time::OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_response_json_shape() {
        let response = OrderResponse {
            number: "9278923470".to_string(),
            status: OrderStatus::Processed,
            accrual: Some(Decimal::new(500, 0)),
            uploaded_at: time::macros::datetime!(2020-12-10 15:15:45 UTC),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "PROCESSED");
        assert_eq!(json["accrual"], 500.0);
        assert_eq!(json["uploaded_at"], "2020-12-10T15:15:45Z");
    }

    #[test]
    fn test_pending_order_omits_accrual() {
        let response = OrderResponse {
            number: "12345678903".to_string(),
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: time::macros::datetime!(2020-12-10 15:12:01 UTC),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("accrual").is_none());
        assert_eq!(json["status"], "NEW");
    }
}
