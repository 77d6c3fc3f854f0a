pub mod accrual;
pub mod auth;
pub mod balance;
pub mod orders;

pub use accrual::{AccrualResponse, AccrualStatus};
pub use auth::Credentials;
pub use balance::{BalanceResponse, WithdrawRequest, WithdrawalResponse};
pub use orders::{OrderResponse, OrderStatus};
