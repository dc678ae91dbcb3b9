//! Position sizing and protective exit levels for a new entry.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::ComputationError;
use super::money::{checked_ratio, round_money};
use super::position::Side;
use super::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingParams {
    /// Fraction of equity risked per trade.
    pub risk_per_trade: Decimal,
    /// Trend stop distance, fraction of price.
    pub max_loss_percent: Decimal,
    /// Mean-reversion stop distance, fraction of price.
    pub mean_reversion_sl: Decimal,
    /// Mean-reversion target distance, fraction of price.
    pub mean_reversion_tp: Decimal,
    /// Trailing-stop activation distance, fraction of price.
    pub activate_price_rate: Decimal,
    /// Trailing-stop callback, in percent.
    pub trailing_percent: Decimal,
}

impl SizingParams {
    pub fn stop_distance(&self, is_trend: bool) -> Decimal {
        if is_trend {
            self.max_loss_percent
        } else {
            self.mean_reversion_sl
        }
    }
}

/// Shrink size in volatile markets, grow it in quiet ones.
pub fn atr_multiplier(atr_pct: f64) -> Decimal {
    if atr_pct > 0.01 {
        dec!(0.7)
    } else if atr_pct > 0.005 {
        dec!(1.0)
    } else {
        dec!(1.2)
    }
}

/// `equity * risk_per_trade / stop_distance / price`, scaled by the ATR%
/// multiplier.
pub fn position_size(
    equity: Decimal,
    price: Decimal,
    is_trend: bool,
    atr_pct: f64,
    params: &SizingParams,
) -> Result<Decimal, ComputationError> {
    let base = checked_ratio(equity * params.risk_per_trade, params.stop_distance(is_trend), "stop distance")?;
    let units = checked_ratio(base, price, "entry price")?;
    Ok(round_money(units * atr_multiplier(atr_pct)))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectiveLevels {
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub trailing_activation: Option<Decimal>,
    pub trailing_callback_rate: Option<Decimal>,
}

/// Trend entries get a stop and a trailing stop; mean-reversion entries a
/// stop and a fixed target. Manual entries get nothing.
pub fn protective_levels(kind: StrategyKind, side: Side, price: Decimal, params: &SizingParams) -> ProtectiveLevels {
    let away = |distance: Decimal, favorable: bool| {
        let up = side.is_buy() == favorable;
        if up {
            round_money(price * (Decimal::ONE + distance))
        } else {
            round_money(price * (Decimal::ONE - distance))
        }
    };
    match kind {
        StrategyKind::TrendLong | StrategyKind::TrendShort => ProtectiveLevels {
            stop_loss: Some(away(params.max_loss_percent, false)),
            take_profit: None,
            trailing_activation: Some(away(params.activate_price_rate, true)),
            trailing_callback_rate: Some(params.trailing_percent),
        },
        StrategyKind::MeanRevLong | StrategyKind::MeanRevShort => ProtectiveLevels {
            stop_loss: Some(away(params.mean_reversion_sl, false)),
            take_profit: Some(away(params.mean_reversion_tp, true)),
            trailing_activation: None,
            trailing_callback_rate: None,
        },
        StrategyKind::Manual => ProtectiveLevels::default(),
    }
}
