//! Run-level configuration and results.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::account::AccountState;
use super::broker::EquityPoint;
use super::execution::ExecutionConfig;
use super::indicator_set::IndicatorParams;
use super::market_data::TimeframeSet;
use super::position::{Position, Trade};
use super::regime::RegimeParams;
use super::risk::RiskLimits;
use super::signals::SignalParams;
use super::sizing::SizingParams;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: Decimal,
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub risk_free_rate: f64,
    pub timeframes: TimeframeSet,
}

impl BacktestConfig {
    /// Inclusive run window in epoch milliseconds (UTC).
    pub fn window_ms(&self) -> (i64, i64) {
        let start = self.start_date.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp_millis());
        let end = self
            .end_date
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc().timestamp_millis() - 1);
        (start.unwrap_or(i64::MIN), end.unwrap_or(i64::MAX))
    }
}

/// Every parameter a run needs, validated once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backtest: BacktestConfig,
    pub execution: ExecutionConfig,
    pub risk: RiskLimits,
    pub sizing: SizingParams,
    pub indicators: IndicatorParams,
    pub signals: SignalParams,
    pub regime: RegimeParams,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub initial_balance: Decimal,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub account: AccountState,
    pub total_commissions: Decimal,
    /// Positions still open when the run ended.
    pub open_positions: Vec<Position>,
    /// Set when the run stopped early because equity was exhausted.
    pub halted: bool,
    pub bars_processed: usize,
}

impl BacktestResult {
    pub fn final_equity(&self) -> Decimal {
        self.account.equity
    }

    pub fn total_pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}
