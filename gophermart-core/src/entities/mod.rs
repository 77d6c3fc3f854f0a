pub mod ledger;
pub mod orders;
pub mod spending;
pub mod users;

pub use ledger::{Balance, LedgerEntry};
pub use orders::{LockedOrder, OrderRecord, OrderStatus};
pub use spending::SpendingRecord;
pub use users::{UserId, UserRecord};
