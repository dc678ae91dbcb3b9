//! Fill simulation: slippage, commission and margin.
//!
//! Every result is rounded to 8 fractional digits as it is produced.

use rust_decimal::Decimal;

use super::money::{checked_ratio, round_money};
use super::position::Side;
use crate::domain::error::ComputationError;

/// Configuration for fill simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub leverage: Decimal,
    /// Fraction of price, adverse to the order.
    pub slippage_rate: Decimal,
    /// Fraction of notional.
    pub fee_rate: Decimal,
}

/// Buy orders fill at `price * (1 + rate)`, sells at `price * (1 - rate)`.
pub fn apply_slippage(price: Decimal, order_side: Side, rate: Decimal) -> Decimal {
    if order_side.is_buy() {
        round_money(price * (Decimal::ONE + rate))
    } else {
        round_money(price * (Decimal::ONE - rate))
    }
}

pub fn calculate_notional(amount: Decimal, fill_price: Decimal) -> Decimal {
    round_money(amount * fill_price)
}

pub fn calculate_commission(notional: Decimal, config: &ExecutionConfig) -> Decimal {
    round_money(notional * config.fee_rate)
}

pub fn calculate_margin(notional: Decimal, config: &ExecutionConfig) -> Result<Decimal, ComputationError> {
    checked_ratio(notional, config.leverage, "margin").map(round_money)
}

/// Realized PnL of closing `amount` opened at `open_price` and closed at
/// `close_price`.
pub fn realized_pnl(side: Side, open_price: Decimal, close_price: Decimal, amount: Decimal) -> Decimal {
    match side {
        Side::Long => round_money((close_price - open_price) * amount),
        Side::Short => round_money((open_price - close_price) * amount),
    }
}

/// An entry fill before it is committed to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFill {
    pub price: Decimal,
    pub notional: Decimal,
    pub commission: Decimal,
    pub margin: Decimal,
}

impl EntryFill {
    pub fn required_funds(&self) -> Decimal {
        self.margin + self.commission
    }
}

pub fn simulate_entry(
    side: Side,
    amount: Decimal,
    market_price: Decimal,
    config: &ExecutionConfig,
) -> Result<EntryFill, ComputationError> {
    let price = apply_slippage(market_price, side, config.slippage_rate);
    let notional = calculate_notional(amount, price);
    let commission = calculate_commission(notional, config);
    let margin = calculate_margin(notional, config)?;
    Ok(EntryFill {
        price,
        notional,
        commission,
        margin,
    })
}
