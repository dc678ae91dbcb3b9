//! Account-level running totals.

use chrono::DateTime;
use rust_decimal::Decimal;
use tracing::info;

use super::money::round_money;
use super::ohlcv::Timeframe;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountState {
    pub equity: Decimal,
    pub total_trades: u64,
    pub total_pnl: Decimal,
    pub daily_trades: u32,
    pub daily_pnl: Decimal,
    pub consecutive_losses: u32,
    pub cooldown_active: bool,
    pub cooldown_start_time: i64,
    /// UTC midnight of the day the daily counters belong to; 0 until first use.
    pub last_reset_time: i64,
}

impl AccountState {
    pub fn new(initial_balance: Decimal) -> Self {
        AccountState {
            equity: initial_balance,
            total_trades: 0,
            total_pnl: Decimal::ZERO,
            daily_trades: 0,
            daily_pnl: Decimal::ZERO,
            consecutive_losses: 0,
            cooldown_active: false,
            cooldown_start_time: 0,
            last_reset_time: 0,
        }
    }

    /// Zero the daily counters if `now` falls on a later UTC day than the
    /// last reset. The first call only anchors the day. Returns whether a
    /// reset happened.
    pub fn reset_daily_if_new_day(&mut self, now: i64) -> bool {
        let midnight = Timeframe::D1.candle_bucket(now);
        if self.last_reset_time == 0 {
            self.last_reset_time = midnight;
            return false;
        }
        if midnight <= self.last_reset_time {
            return false;
        }
        self.daily_pnl = Decimal::ZERO;
        self.daily_trades = 0;
        self.last_reset_time = midnight;
        info!(
            date = %DateTime::from_timestamp_millis(now).map(|d| d.date_naive().to_string()).unwrap_or_default(),
            equity = %self.equity,
            "daily counters reset"
        );
        true
    }

    pub(crate) fn record_open(&mut self, commission: Decimal) {
        self.equity = round_money(self.equity - commission);
        self.total_trades += 1;
        self.daily_trades += 1;
    }

    pub(crate) fn record_close(&mut self, pnl: Decimal, commission: Decimal) {
        self.equity = round_money(self.equity + pnl);
        self.total_pnl = round_money(self.total_pnl + pnl);
        self.daily_pnl = round_money(self.daily_pnl + pnl);
        self.equity = round_money(self.equity - commission);
    }
}
