//! Open positions, closed trades and the protective-exit checks.

use chrono::{DateTime, SecondsFormat};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use super::money::round_money;
use super::regime::TrendCombination;
use super::strategy::StrategyKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    #[serde(rename = "BUY")]
    Long,
    #[serde(rename = "SELL")]
    Short,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// Whether an order on this side buys.
    pub fn is_buy(self) -> bool {
        self == Side::Long
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    Manual,
}

/// Serialize a millisecond timestamp as an RFC 3339 UTC string.
pub fn serialize_ms<S: Serializer>(ms: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    match DateTime::from_timestamp_millis(*ms) {
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => serializer.serialize_i64(*ms),
    }
}

/// Open time and open price of the last closed bar on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub timeframe: &'static str,
    #[serde(serialize_with = "serialize_ms")]
    pub open_time: i64,
    pub open_price: Decimal,
}

/// Market conditions recorded when a position opens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    #[serde(serialize_with = "serialize_ms")]
    pub timestamp: i64,
    pub frames: Vec<FrameSnapshot>,
    pub trend: TrendCombination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub strategy: StrategyKind,
    #[serde(serialize_with = "serialize_ms")]
    pub open_time: i64,
    /// Fill price after slippage.
    pub open_price: Decimal,
    pub open_amount: Decimal,
    pub open_notional: Decimal,
    pub margin: Decimal,
    pub open_commission: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub trailing_activation: Option<Decimal>,
    /// Callback distance in percent of the tracked extreme.
    pub trailing_callback_rate: Option<Decimal>,
    /// Most favorable price seen since the trailing stop armed.
    #[serde(skip)]
    pub trailing_extreme: Option<Decimal>,
    pub market_condition: Option<MarketSnapshot>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn should_stop_loss(&self, high: Decimal, low: Decimal) -> bool {
        match (self.stop_loss, self.side) {
            (None, _) => false,
            (Some(stop), Side::Long) => low <= stop,
            (Some(stop), Side::Short) => high >= stop,
        }
    }

    pub fn should_take_profit(&self, high: Decimal, low: Decimal) -> bool {
        match (self.take_profit, self.side) {
            (None, _) => false,
            (Some(target), Side::Long) => high >= target,
            (Some(target), Side::Short) => low <= target,
        }
    }

    /// Current callback level of an armed trailing stop.
    pub fn trailing_callback(&self) -> Option<Decimal> {
        let extreme = self.trailing_extreme?;
        let fraction = self.trailing_callback_rate? / Decimal::ONE_HUNDRED;
        Some(match self.side {
            Side::Long => round_money(extreme * (Decimal::ONE - fraction)),
            Side::Short => round_money(extreme * (Decimal::ONE + fraction)),
        })
    }

    /// Feed one bar's range to the trailing stop.
    ///
    /// The stop arms once the bar trades beyond the activation price, then
    /// follows the most favorable extreme seen since. Returns the callback
    /// price, which also becomes the stop-loss, when the bar retraces
    /// through it.
    pub fn update_trailing(&mut self, high: Decimal, low: Decimal) -> Option<Decimal> {
        let activation = self.trailing_activation?;
        if self.trailing_callback_rate.is_none() {
            return None;
        }

        let extreme = match (self.side, self.trailing_extreme) {
            (Side::Long, None) if high > activation => high,
            (Side::Short, None) if low < activation => low,
            (_, None) => return None,
            (Side::Long, Some(prev)) => prev.max(high),
            (Side::Short, Some(prev)) => prev.min(low),
        };
        self.trailing_extreme = Some(extreme);

        let callback = self.trailing_callback()?;
        let retraced = match self.side {
            Side::Long => low <= callback,
            Side::Short => high >= callback,
        };
        if retraced {
            self.stop_loss = Some(callback);
            Some(callback)
        } else {
            None
        }
    }
}

/// A closed position. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    #[serde(flatten)]
    pub position: Position,
    #[serde(serialize_with = "serialize_ms")]
    pub close_time: i64,
    /// Fill price after slippage.
    pub close_price: Decimal,
    pub close_amount: Decimal,
    pub close_notional: Decimal,
    pub close_commission: Decimal,
    pub close_reason: CloseReason,
    pub pnl: Decimal,
    pub pnl_percentage: Decimal,
}

impl Trade {
    pub fn symbol(&self) -> &str {
        &self.position.symbol
    }

    pub fn strategy(&self) -> StrategyKind {
        self.position.strategy
    }

    pub fn commissions(&self) -> Decimal {
        self.position.open_commission + self.close_commission
    }

    pub fn holding_ms(&self) -> i64 {
        self.close_time - self.position.open_time
    }
}
