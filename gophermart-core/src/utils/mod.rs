pub mod luhn;
pub mod money;
