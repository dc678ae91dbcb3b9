//! Simple moving average of closing prices.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i])
//! Warmup: first (n-1) bars are invalid.

use super::{rolling_mean, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close_f64())).collect();
    IndicatorSeries::from_options(
        IndicatorType::Sma(period),
        bars.iter().map(|b| b.timestamp),
        rolling_mean(&closes, period),
    )
}
