use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for every bonus amount (`NUMERIC(20, 2)`).
pub const SCALE: u32 = 2;

/// Largest amount a `NUMERIC(20, 2)` column holds: `999999999999999999.99`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 0x5, false, SCALE);

/// Round an amount to [`SCALE`] digits the way PostgreSQL rounds `NUMERIC`.
pub fn normalize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}
