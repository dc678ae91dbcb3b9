//! Monetary rounding.
//!
//! Every price after slippage, commission, margin, size and PnL figure is
//! rounded to 8 fractional digits the moment it is computed, before it is
//! stored or compared.

use rust_decimal::prelude::*;

use super::error::ComputationError;

pub const MONEY_SCALE: u32 = 8;

/// Round half-up (ties away from zero) to 8 fractional digits.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator`, refusing a zero denominator.
pub fn checked_ratio(
    numerator: Decimal,
    denominator: Decimal,
    what: &'static str,
) -> Result<Decimal, ComputationError> {
    numerator
        .checked_div(denominator)
        .ok_or(ComputationError::DivisionByZero { what })
}

/// Lossy conversion for handing a decimal to float indicator math.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
