//! Account-level risk gates.
//!
//! Every check returns a boolean and logs why it failed; none of them
//! error. A check that cannot be evaluated (zero equity for a ratio) blocks.

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::account::AccountState;
use super::money::checked_ratio;
use super::ohlcv::Timeframe;
use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimits {
    pub max_margin_usage: Decimal,
    /// Fraction of equity.
    pub max_daily_loss: Decimal,
    pub max_daily_trades: u32,
    pub consecutive_losses: u32,
    /// Seconds.
    pub cooldown_period: i64,
    pub max_trend_holding_bars: i64,
    pub max_mean_rev_holding_bars: i64,
}

#[derive(Debug, Clone)]
pub struct RiskGate {
    limits: RiskLimits,
    bar_timeframe: Timeframe,
}

impl RiskGate {
    /// `bar_timeframe` is the timeframe holding periods are counted in.
    pub fn new(limits: RiskLimits, bar_timeframe: Timeframe) -> Self {
        RiskGate {
            limits,
            bar_timeframe,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn check_margin_usage(&self, account: &AccountState, total_margin: Decimal) -> bool {
        match checked_ratio(total_margin, account.equity, "margin usage") {
            Ok(usage) if usage <= self.limits.max_margin_usage => true,
            Ok(usage) => {
                warn!(%usage, limit = %self.limits.max_margin_usage, "margin usage over limit");
                false
            }
            Err(e) => {
                warn!(error = %e, "margin usage check blocked");
                false
            }
        }
    }

    pub fn check_daily_loss(&self, account: &AccountState) -> bool {
        let floor = -(account.equity * self.limits.max_daily_loss);
        if account.daily_pnl < floor {
            warn!(daily_pnl = %account.daily_pnl, %floor, "daily loss over limit");
            return false;
        }
        true
    }

    pub fn check_daily_trades(&self, account: &mut AccountState, now: i64) -> bool {
        account.reset_daily_if_new_day(now);
        if account.daily_trades >= self.limits.max_daily_trades {
            warn!(
                daily_trades = account.daily_trades,
                limit = self.limits.max_daily_trades,
                "daily trade count at limit"
            );
            return false;
        }
        true
    }

    /// Blocks while a cooldown is running; clears it once the period has
    /// elapsed.
    pub fn check_cooldown(&self, account: &mut AccountState, now: i64) -> bool {
        if !account.cooldown_active {
            return true;
        }
        let elapsed_ms = now.saturating_sub(account.cooldown_start_time);
        if elapsed_ms < self.limits.cooldown_period.saturating_mul(1000) {
            warn!(elapsed_secs = elapsed_ms / 1000, period = self.limits.cooldown_period, "in cooldown");
            return false;
        }
        account.consecutive_losses = 0;
        account.cooldown_start_time = 0;
        account.cooldown_active = false;
        info!("cooldown ended");
        true
    }

    /// All four opening checks. The daily counters roll over before any of
    /// them reads the account, and each check runs even when an earlier one
    /// fails so that cooldown expiry always advances.
    pub fn can_open(&self, account: &mut AccountState, total_margin: Decimal, now: i64) -> bool {
        account.reset_daily_if_new_day(now);
        let margin_ok = self.check_margin_usage(account, total_margin);
        let loss_ok = self.check_daily_loss(account);
        let trades_ok = self.check_daily_trades(account, now);
        let cooldown_ok = self.check_cooldown(account, now);
        margin_ok && loss_ok && trades_ok && cooldown_ok
    }

    /// Whole bars between the candle a position opened in and the candle
    /// containing `now`.
    pub fn bars_held(&self, position: &Position, now: i64) -> i64 {
        let tf = self.bar_timeframe;
        (tf.candle_bucket(now) - tf.candle_bucket(position.open_time)) / tf.duration_ms()
    }

    /// True once a position has been held for its strategy class's maximum
    /// number of bars and must be closed.
    pub fn holding_period_exceeded(&self, position: &Position, now: i64) -> bool {
        let limit = if position.strategy.is_trend() {
            self.limits.max_trend_holding_bars
        } else {
            self.limits.max_mean_rev_holding_bars
        };
        let held = self.bars_held(position, now);
        if held >= limit {
            info!(symbol = %position.symbol, held, limit, "holding period exceeded");
            return true;
        }
        false
    }

    /// Update the losing streak after a close at `now`.
    pub fn record_result(&self, account: &mut AccountState, pnl: Decimal, now: i64) {
        if pnl < Decimal::ZERO {
            account.consecutive_losses += 1;
            if account.consecutive_losses >= self.limits.consecutive_losses {
                account.cooldown_active = true;
                account.cooldown_start_time = now;
                info!(
                    consecutive_losses = account.consecutive_losses,
                    period = self.limits.cooldown_period,
                    "cooldown started"
                );
            }
        } else {
            account.consecutive_losses = 0;
        }
    }
}
