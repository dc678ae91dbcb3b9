//! Average True Range with Wilder smoothing, plus ATR as a fraction of close.
//!
//! TR[0] = H[0] - L[0]
//! TR[i] = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|)
//! ATR   = exponential smoothing of TR with alpha = 1/n
//! Warmup: first (n-1) bars are invalid.

use super::{ewm, IndicatorSeries, IndicatorType};
use crate::domain::money::to_f64;
use crate::domain::ohlcv::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let timestamps = bars.iter().map(|b| b.timestamp);
    if period == 0 {
        return IndicatorSeries::from_options(IndicatorType::Atr(period), timestamps, vec![None; bars.len()]);
    }

    let tr: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                Some(to_f64(bar.high) - to_f64(bar.low))
            } else {
                Some(bar.true_range(bars[i - 1].close_f64()))
            }
        })
        .collect();

    IndicatorSeries::from_options(
        IndicatorType::Atr(period),
        timestamps,
        ewm(&tr, 1.0 / period as f64, period),
    )
}

/// ATR divided by the bar's close.
pub fn calculate_atr_percent(bars: &[Bar], atr: &IndicatorSeries) -> IndicatorSeries {
    let period = match atr.indicator_type {
        IndicatorType::Atr(n) => n,
        _ => 0,
    };
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let close = bar.close_f64();
            let atr = atr.value_at(i)?;
            if close == 0.0 { None } else { Some(atr / close) }
        })
        .collect();
    IndicatorSeries::from_options(
        IndicatorType::AtrPercent(period),
        bars.iter().map(|b| b.timestamp),
        values,
    )
}
