//! Settings loading and validation.
//!
//! Every key is required. The whole [`Settings`] value is parsed and checked
//! before any market data is read.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::backtest::{BacktestConfig, Settings};
use crate::domain::error::TraderError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::indicator_set::IndicatorParams;
use crate::domain::market_data::TimeframeSet;
use crate::domain::regime::RegimeParams;
use crate::domain::risk::RiskLimits;
use crate::domain::signals::SignalParams;
use crate::domain::sizing::SizingParams;
use crate::ports::config_port::ConfigPort;

/// Typed access to one INI section.
struct Section<'a> {
    config: &'a dyn ConfigPort,
    name: &'static str,
}

impl<'a> Section<'a> {
    fn new(config: &'a dyn ConfigPort, name: &'static str) -> Self {
        Section { config, name }
    }

    fn raw(&self, key: &str) -> Result<String, TraderError> {
        match self.config.get_string(self.name, key) {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(TraderError::config_missing(self.name, key)),
        }
    }

    fn parse<T>(&self, key: &str, kind: &str) -> Result<T, TraderError>
    where
        T: FromStr,
    {
        let raw = self.raw(key)?;
        raw.parse::<T>()
            .map_err(|_| TraderError::config_invalid(self.name, key, format!("'{raw}' is not a valid {kind}")))
    }

    fn decimal(&self, key: &str) -> Result<Decimal, TraderError> {
        self.parse(key, "decimal")
    }

    fn float(&self, key: &str) -> Result<f64, TraderError> {
        let value: f64 = self.parse(key, "number")?;
        if !value.is_finite() {
            return Err(TraderError::config_invalid(self.name, key, "must be finite"));
        }
        Ok(value)
    }

    fn window(&self, key: &str) -> Result<usize, TraderError> {
        let value: usize = self.parse(key, "window length")?;
        if value == 0 {
            return Err(TraderError::config_invalid(self.name, key, "must be at least 1"));
        }
        Ok(value)
    }

    fn count(&self, key: &str) -> Result<u32, TraderError> {
        self.parse(key, "count")
    }

    fn date(&self, key: &str) -> Result<NaiveDate, TraderError> {
        let raw = self.raw(key)?;
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            TraderError::config_invalid(self.name, key, format!("invalid {key} format, expected YYYY-MM-DD"))
        })
    }

    fn positive(&self, key: &str) -> Result<Decimal, TraderError> {
        let value = self.decimal(key)?;
        if value <= Decimal::ZERO {
            return Err(TraderError::config_invalid(self.name, key, format!("{key} must be positive")));
        }
        Ok(value)
    }

    fn non_negative(&self, key: &str) -> Result<Decimal, TraderError> {
        let value = self.decimal(key)?;
        if value < Decimal::ZERO {
            return Err(TraderError::config_invalid(self.name, key, format!("{key} must be non-negative")));
        }
        Ok(value)
    }

    /// A ratio in `(0, 1]`.
    fn fraction(&self, key: &str) -> Result<Decimal, TraderError> {
        let value = self.decimal(key)?;
        if value <= Decimal::ZERO || value > Decimal::ONE {
            return Err(TraderError::config_invalid(self.name, key, format!("{key} must be between 0 and 1")));
        }
        Ok(value)
    }
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<Settings, TraderError> {
    let backtest = load_backtest(config)?;
    let execution = load_execution(config)?;
    let risk = load_risk(config)?;
    let sizing = load_sizing(config)?;
    let indicators = load_indicators(config)?;
    let signals = load_signals(config)?;
    let regime = load_regime(config)?;
    Ok(Settings {
        backtest,
        execution,
        risk,
        sizing,
        indicators,
        signals,
        regime,
    })
}

fn load_backtest(config: &dyn ConfigPort) -> Result<BacktestConfig, TraderError> {
    let s = Section::new(config, "backtest");
    let initial_balance = s.positive("initial_balance")?;

    let symbols: Vec<String> = s
        .raw("symbol_list")?
        .split(',')
        .map(|sym| sym.trim().to_uppercase())
        .filter(|sym| !sym.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(TraderError::config_missing("backtest", "symbol_list"));
    }
    for (i, sym) in symbols.iter().enumerate() {
        if symbols[..i].contains(sym) {
            return Err(TraderError::config_invalid(
                "backtest",
                "symbol_list",
                format!("duplicate symbol {sym}"),
            ));
        }
    }

    let start_date = s.date("start_date")?;
    let end_date = s.date("end_date")?;
    if start_date > end_date {
        return Err(TraderError::config_invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }

    let risk_free_rate = s.float("risk_free_rate")?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(TraderError::config_invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    Ok(BacktestConfig {
        initial_balance,
        symbols,
        start_date,
        end_date,
        risk_free_rate,
        timeframes: TimeframeSet::canonical(),
    })
}

fn load_execution(config: &dyn ConfigPort) -> Result<ExecutionConfig, TraderError> {
    let s = Section::new(config, "backtest");
    Ok(ExecutionConfig {
        leverage: s.positive("leverage")?,
        slippage_rate: s.non_negative("slippage_rate")?,
        fee_rate: s.non_negative("fee_rate")?,
    })
}

/// One hundred years.
const MAX_COOLDOWN_SECS: i64 = 100 * 366 * 24 * 3600;

fn load_risk(config: &dyn ConfigPort) -> Result<RiskLimits, TraderError> {
    let s = Section::new(config, "risk_control");
    let cooldown_period: i64 = s.parse("cooldown_period", "number of seconds")?;
    if !(0..=MAX_COOLDOWN_SECS).contains(&cooldown_period) {
        return Err(TraderError::config_invalid(
            "risk_control",
            "cooldown_period",
            format!("cooldown_period must be between 0 and {MAX_COOLDOWN_SECS} seconds"),
        ));
    }
    let consecutive_losses = s.count("consecutive_losses")?;
    if consecutive_losses == 0 {
        return Err(TraderError::config_invalid(
            "risk_control",
            "consecutive_losses",
            "consecutive_losses must be at least 1",
        ));
    }
    let holding = |key: &str| -> Result<i64, TraderError> {
        let bars: i64 = s.parse(key, "bar count")?;
        if bars <= 0 {
            return Err(TraderError::config_invalid("risk_control", key, format!("{key} must be positive")));
        }
        Ok(bars)
    };

    Ok(RiskLimits {
        max_margin_usage: s.fraction("max_margin_usage")?,
        max_daily_loss: s.fraction("max_daily_loss")?,
        max_daily_trades: s.count("max_daily_trades")?,
        consecutive_losses,
        cooldown_period,
        max_trend_holding_bars: holding("max_trend_holding_bars")?,
        max_mean_rev_holding_bars: holding("max_mean_rev_holding_bars")?,
    })
}

fn load_sizing(config: &dyn ConfigPort) -> Result<SizingParams, TraderError> {
    let risk = Section::new(config, "risk_control");
    let s = Section::new(config, "trading");
    Ok(SizingParams {
        risk_per_trade: risk.fraction("risk_per_trade")?,
        max_loss_percent: s.fraction("max_loss_percent")?,
        mean_reversion_sl: s.fraction("mean_reversion_sl")?,
        mean_reversion_tp: s.positive("mean_reversion_tp")?,
        activate_price_rate: s.non_negative("activate_price_rate")?,
        trailing_percent: s.positive("trailing_percent")?,
    })
}

fn load_indicators(config: &dyn ConfigPort) -> Result<IndicatorParams, TraderError> {
    let s = Section::new(config, "index");
    let bb_mult = s.float("bb_mult")?;
    if bb_mult <= 0.0 {
        return Err(TraderError::config_invalid("index", "bb_mult", "bb_mult must be positive"));
    }
    let params = IndicatorParams {
        bb_length: s.window("bb_length")?,
        bb_mult,
        bb_change_rate_window: s.window("bb_change_rate_window")?,
        rsi_length: s.window("rsi_length")?,
        rsi_average_window: s.window("rsi_average_window")?,
        ma_slow_length: s.window("ma_slow_length")?,
        ma_slope_window: s.window("ma_slope_window")?,
        atr_period: s.window("atr_period")?,
        average_volume_window: s.window("average_volume_window")?,
    };
    if params.bb_length < 2 {
        return Err(TraderError::config_invalid(
            "index",
            "bb_length",
            "bb_length must be at least 2",
        ));
    }
    Ok(params)
}

fn load_signals(config: &dyn ConfigPort) -> Result<SignalParams, TraderError> {
    let s = Section::new(config, "index");
    let rsi_bound = |key: &str| -> Result<f64, TraderError> {
        let value = s.float(key)?;
        if !(0.0..=100.0).contains(&value) {
            return Err(TraderError::config_invalid("index", key, format!("{key} must be within 0..100")));
        }
        Ok(value)
    };

    let params = SignalParams {
        bb_change_rate: s.float("bb_change_rate")?,
        bb_price_threshold: s.float("bb_price_threshold")?,
        rsi_overbought: rsi_bound("rsi_overbought")?,
        rsi_oversold: rsi_bound("rsi_oversold")?,
        rsi_momentum_offset: s.float("rsi_momentum_offset")?,
        rsi_reversal_offset: s.float("rsi_reversal_offset")?,
    };
    if params.rsi_oversold >= params.rsi_overbought {
        return Err(TraderError::config_invalid(
            "index",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    Ok(params)
}

fn load_regime(config: &dyn ConfigPort) -> Result<RegimeParams, TraderError> {
    let index = Section::new(config, "index");
    let risk = Section::new(config, "risk_control");
    Ok(RegimeParams {
        ma_slope_threshold: index.float("ma_slope_threshold")?,
        min_bandwidth_threshold: risk.float("min_bandwidth_threshold")?,
    })
}
