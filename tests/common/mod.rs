#![allow(dead_code)]

use chrono::NaiveDate;
use regimetrader::domain::backtest::{BacktestConfig, Settings};
use regimetrader::domain::error::TraderError;
use regimetrader::domain::execution::ExecutionConfig;
use regimetrader::domain::indicator_set::IndicatorParams;
use regimetrader::domain::market_data::{SymbolData, TimeframeSeries, TimeframeSet};
pub use regimetrader::domain::ohlcv::{Bar, Timeframe};
use regimetrader::domain::regime::RegimeParams;
use regimetrader::domain::risk::RiskLimits;
use regimetrader::domain::signals::SignalParams;
use regimetrader::domain::sizing::SizingParams;
use regimetrader::ports::data_port::DataPort;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// 2024-01-01T00:00:00Z
pub const BASE_TS: i64 = 1_704_067_200_000;
pub const HOUR: i64 = 3_600_000;
pub const DAY: i64 = 24 * HOUR;

pub struct MockDataPort {
    pub data: HashMap<(String, Timeframe), Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.data.insert((symbol.to_string(), timeframe), bars);
        self
    }

    /// Zig-zag bars on all three canonical timeframes.
    pub fn with_symbol(self, symbol: &str, primary_bars: usize) -> Self {
        let (primary, mid, coarse) = canonical_bars(primary_bars);
        self.with_bars(symbol, Timeframe::H1, primary)
            .with_bars(symbol, Timeframe::H4, mid)
            .with_bars(symbol, Timeframe::D1, coarse)
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>, TraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::DataSource {
                symbol: symbol.to_string(),
                timeframe: timeframe.label().to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(&(symbol.to_string(), timeframe))
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start_ms && b.timestamp <= end_ms)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, TraderError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .filter(|(_, tf)| *tf == timeframe)
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<(i64, i64, usize)>, TraderError> {
        match self.data.get(&(symbol.to_string(), timeframe)) {
            Some(bars) if !bars.is_empty() => {
                let first = bars.iter().map(|b| b.timestamp).min().unwrap();
                let last = bars.iter().map(|b| b.timestamp).max().unwrap();
                Ok(Some((first, last, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

fn d(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap()
}

/// Bars whose open is the previous close, with a half-point wick on each
/// side and steadily rising volume.
pub fn bars_from_closes(timeframe: Timeframe, start: i64, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + i as i64 * timeframe.duration_ms(),
                open: d(open),
                high: d(open.max(close) + 0.5),
                low: d(open.min(close) - 0.5),
                close: d(close),
                volume: d(1000.0 + i as f64),
            }
        })
        .collect()
}

/// Closes alternating 100, 101, 100, 101, ...
pub fn zigzag_closes(count: usize) -> Vec<f64> {
    (0..count).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect()
}

pub fn zigzag_bars(timeframe: Timeframe, start: i64, count: usize) -> Vec<Bar> {
    bars_from_closes(timeframe, start, &zigzag_closes(count))
}

/// Primary, mid and coarse zig-zag series covering `primary_bars` hours
/// from [`BASE_TS`].
pub fn canonical_bars(primary_bars: usize) -> (Vec<Bar>, Vec<Bar>, Vec<Bar>) {
    let hours = primary_bars as i64;
    let mid = ((hours + 3) / 4) as usize;
    let coarse = ((hours + 23) / 24) as usize;
    (
        zigzag_bars(Timeframe::H1, BASE_TS, primary_bars),
        zigzag_bars(Timeframe::H4, BASE_TS, mid),
        zigzag_bars(Timeframe::D1, BASE_TS, coarse),
    )
}

pub fn symbol_data_from(symbol: &str, settings: &Settings, primary: Vec<Bar>, mid: Vec<Bar>, coarse: Vec<Bar>) -> SymbolData {
    let params = &settings.indicators;
    SymbolData::new(
        symbol.to_string(),
        TimeframeSeries::new(Timeframe::H1, primary, params),
        TimeframeSeries::new(Timeframe::H4, mid, params),
        TimeframeSeries::new(Timeframe::D1, coarse, params),
    )
}

pub fn symbol_data(symbol: &str, settings: &Settings, primary_bars: usize) -> SymbolData {
    let (primary, mid, coarse) = canonical_bars(primary_bars);
    symbol_data_from(symbol, settings, primary, mid, coarse)
}

/// Settings under which only the mean-reversion long variant can fire:
/// it enters on every bar whose RSI ticks up and exits on the next bar.
/// On a zig-zag series every such trade loses money.
pub fn mean_rev_settings() -> Settings {
    Settings {
        backtest: BacktestConfig {
            initial_balance: dec!(10000),
            symbols: vec!["BTCUSDT".to_string()],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            risk_free_rate: 0.0,
            timeframes: TimeframeSet::canonical(),
        },
        execution: ExecutionConfig {
            leverage: dec!(10),
            slippage_rate: dec!(0.0005),
            fee_rate: dec!(0.0005),
        },
        risk: RiskLimits {
            max_margin_usage: dec!(1),
            max_daily_loss: dec!(1),
            max_daily_trades: 1000,
            consecutive_losses: 1000,
            cooldown_period: 0,
            max_trend_holding_bars: 72,
            max_mean_rev_holding_bars: 24,
        },
        sizing: SizingParams {
            risk_per_trade: dec!(0.01),
            max_loss_percent: dec!(0.5),
            mean_reversion_sl: dec!(0.5),
            mean_reversion_tp: dec!(0.5),
            activate_price_rate: dec!(0.01),
            trailing_percent: dec!(1),
        },
        indicators: IndicatorParams {
            bb_length: 5,
            bb_mult: 2.0,
            bb_change_rate_window: 2,
            rsi_length: 4,
            rsi_average_window: 3,
            ma_slow_length: 8,
            ma_slope_window: 2,
            atr_period: 4,
            average_volume_window: 5,
        },
        signals: SignalParams {
            bb_change_rate: 0.0,
            bb_price_threshold: 1e9,
            rsi_overbought: 200.0,
            rsi_oversold: 100.0,
            rsi_momentum_offset: 5.0,
            rsi_reversal_offset: 10.0,
        },
        regime: RegimeParams {
            ma_slope_threshold: 0.001,
            min_bandwidth_threshold: 0.0,
        },
    }
}

/// Settings whose signals can never fire.
pub fn quiet_settings() -> Settings {
    let mut settings = mean_rev_settings();
    settings.signals.rsi_oversold = -1.0;
    settings
}

pub const VALID_INI: &str = r#"
[backtest]
initial_balance = 10000
leverage = 10
slippage_rate = 0.0005
fee_rate = 0.0005
symbol_list = BTCUSDT
start_date = 2024-01-01
end_date = 2024-03-31
risk_free_rate = 0.02

[risk_control]
max_margin_usage = 0.5
max_daily_loss = 0.05
max_daily_trades = 10
consecutive_losses = 3
cooldown_period = 86400
max_trend_holding_bars = 72
max_mean_rev_holding_bars = 24
risk_per_trade = 0.01
min_bandwidth_threshold = 0.0

[trading]
max_loss_percent = 0.02
mean_reversion_sl = 0.015
mean_reversion_tp = 0.03
activate_price_rate = 0.01
trailing_percent = 1.5

[index]
bb_length = 5
bb_mult = 2.0
bb_change_rate = 0.1
bb_change_rate_window = 2
bb_price_threshold = 0.002
rsi_length = 4
rsi_overbought = 70
rsi_oversold = 30
rsi_momentum_offset = 5
rsi_reversal_offset = 10
rsi_average_window = 3
ma_slow_length = 8
ma_slope_window = 2
ma_slope_threshold = 0.001
atr_period = 4
average_volume_window = 5
"#;

/// Write `{SYMBOL}_{tf}.csv` files for the canonical timeframes.
pub fn write_csv_data(dir: &std::path::Path, symbol: &str, primary_bars: usize) {
    let (primary, mid, coarse) = canonical_bars(primary_bars);
    for (tf, bars) in [
        (Timeframe::H1, primary),
        (Timeframe::H4, mid),
        (Timeframe::D1, coarse),
    ] {
        let mut content = String::from("timestamp,open,high,low,close,volume\n");
        for b in &bars {
            content.push_str(&format!(
                "{},{},{},{},{},{}\n",
                b.timestamp, b.open, b.high, b.low, b.close, b.volume
            ));
        }
        std::fs::write(dir.join(format!("{}_{}.csv", symbol, tf.label())), content).unwrap();
    }
}
