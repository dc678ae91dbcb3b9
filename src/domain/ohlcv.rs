//! OHLCV bar representation and timeframe arithmetic.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use super::error::TraderError;
use super::money::to_f64;

/// Candle interval. The canonical run uses `H1`/`H4`/`D1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn duration_ms(self) -> i64 {
        match self {
            Timeframe::M15 => 15 * 60 * 1000,
            Timeframe::H1 => 60 * 60 * 1000,
            Timeframe::H4 => 4 * 60 * 60 * 1000,
            Timeframe::D1 => 24 * 60 * 60 * 1000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Truncate a timestamp to the start of the candle containing it.
    pub fn candle_bucket(self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.duration_ms())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(format!("unknown timeframe '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Candle open time, milliseconds since the Unix epoch (UTC).
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    pub fn close_f64(&self) -> f64 {
        to_f64(self.close)
    }

    pub fn volume_f64(&self) -> f64 {
        to_f64(self.volume)
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let high = to_f64(self.high);
        let low = to_f64(self.low);
        let hl = high - low;
        let hc = (high - prev_close).abs();
        let lc = (low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Check that a series is strictly increasing and gap-free at the
/// timeframe's spacing.
pub fn validate_series(symbol: &str, timeframe: Timeframe, bars: &[Bar]) -> Result<(), TraderError> {
    let spacing = timeframe.duration_ms();
    let violation = |reason: String| TraderError::DataIntegrity {
        symbol: symbol.to_string(),
        timeframe: timeframe.label().to_string(),
        reason,
    };

    for pair in bars.windows(2) {
        let (prev, next) = (pair[0].timestamp, pair[1].timestamp);
        if next == prev {
            return Err(violation(format!("duplicate timestamp {next}")));
        }
        if next < prev {
            return Err(violation(format!("timestamp {next} precedes {prev}")));
        }
        if next - prev > spacing {
            return Err(violation(format!(
                "gap of {} ms between {prev} and {next} (expected {spacing})",
                next - prev
            )));
        }
    }
    Ok(())
}
