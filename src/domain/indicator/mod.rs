//! Technical indicator implementations.
//!
//! Every calculation returns an [`IndicatorSeries`] aligned one-to-one with
//! its input bars. Points before the lookback is satisfied (or where the
//! value is undefined, e.g. a ratio over zero) are marked invalid; readers
//! go through [`IndicatorSeries::value_at`] which maps them to `None`.
//!
//! Indicator math is plain `f64`: none of these values are money.

pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod slope;
pub mod sma;
pub mod stddev;
pub mod volume;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: i64,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Slope(usize),
    Rsi(usize),
    AverageRsi { rsi_length: usize, window: usize },
    Stddev(usize),
    BollingerMiddle(usize),
    BollingerUpper(usize),
    BollingerLower(usize),
    Bandwidth(usize),
    BandwidthChange(usize),
    Atr(usize),
    AtrPercent(usize),
    AverageVolume(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Build a series from optional values; `None` and non-finite values
    /// become invalid points.
    pub fn from_options(
        indicator_type: IndicatorType,
        timestamps: impl IntoIterator<Item = i64>,
        values: Vec<Option<f64>>,
    ) -> Self {
        let values = timestamps
            .into_iter()
            .zip(values)
            .map(|(timestamp, v)| match v {
                Some(value) if value.is_finite() => IndicatorPoint {
                    timestamp,
                    valid: true,
                    value,
                },
                _ => IndicatorPoint {
                    timestamp,
                    valid: false,
                    value: f64::NAN,
                },
            })
            .collect();
        IndicatorSeries {
            indicator_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    pub fn options(&self) -> Vec<Option<f64>> {
        (0..self.values.len()).map(|i| self.value_at(i)).collect()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.iter().map(|p| p.timestamp)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Slope(window) => write!(f, "SLOPE({})", window),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::AverageRsi { rsi_length, window } => {
                write!(f, "AVG_RSI({},{})", rsi_length, window)
            }
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::BollingerMiddle(period) => write!(f, "BB_MIDDLE({})", period),
            IndicatorType::BollingerUpper(period) => write!(f, "BB_UPPER({})", period),
            IndicatorType::BollingerLower(period) => write!(f, "BB_LOWER({})", period),
            IndicatorType::Bandwidth(period) => write!(f, "BANDWIDTH({})", period),
            IndicatorType::BandwidthChange(window) => write!(f, "BANDWIDTH_CHANGE({})", window),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::AtrPercent(period) => write!(f, "ATR_PCT({})", period),
            IndicatorType::AverageVolume(window) => write!(f, "AVG_VOLUME({})", window),
        }
    }
}

/// Trailing arithmetic mean; any missing value inside the window makes the
/// result missing.
pub(crate) fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mut sum = 0.0;
            for v in slice {
                sum += (*v)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}

/// `(v[t] - v[t-window]) / v[t-window]`; undefined when the base is zero.
pub(crate) fn pct_change(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            let base = values[i - window]?;
            let current = values[i]?;
            if base == 0.0 {
                None
            } else {
                Some((current - base) / base)
            }
        })
        .collect()
}

/// Exponential smoothing with `alpha`, seeded with the first present value
/// and reporting only after `min_periods` observations.
pub(crate) fn ewm(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut state: Option<f64> = None;
    let mut seen = 0usize;
    for v in values {
        if let Some(x) = v {
            seen += 1;
            state = Some(match state {
                None => *x,
                Some(prev) => (1.0 - alpha) * prev + alpha * x,
            });
        }
        out.push(if seen >= min_periods.max(1) { state } else { None });
    }
    out
}

#[cfg(test)]
pub(crate) fn bars_from_closes(prices: &[f64]) -> Vec<crate::domain::ohlcv::Bar> {
    use rust_decimal::prelude::*;

    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let c = Decimal::from_f64(close).unwrap();
            crate::domain::ohlcv::Bar {
                timestamp: i as i64 * 3_600_000,
                open: c,
                high: c,
                low: c,
                close: c,
                volume: Decimal::from(1000),
            }
        })
        .collect()
}
