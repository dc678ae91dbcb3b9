//! Bollinger Bands and their bandwidth.
//!
//! - Middle: SMA(n) of closes
//! - Upper: Middle + (multiplier x StdDev)
//! - Lower: Middle - (multiplier x StdDev)
//! - Bandwidth: (Upper - Lower) / Middle
//!
//! StdDev is the sample standard deviation (divides by N-1).
//! Warmup: first (period-1) bars are invalid.

use super::sma::calculate_sma;
use super::stddev::calculate_stddev;
use super::{pct_change, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
    pub period: usize,
    pub mult: f64,
}

pub fn calculate_bollinger(bars: &[Bar], period: usize, mult: f64) -> BollingerBands {
    let sma = calculate_sma(bars, period);
    let std = calculate_stddev(bars, period);
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();

    let mut upper = Vec::with_capacity(bars.len());
    let mut middle = Vec::with_capacity(bars.len());
    let mut lower = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        match (sma.value_at(i), std.value_at(i)) {
            (Some(m), Some(s)) => {
                upper.push(Some(m + mult * s));
                middle.push(Some(m));
                lower.push(Some(m - mult * s));
            }
            _ => {
                upper.push(None);
                middle.push(None);
                lower.push(None);
            }
        }
    }

    BollingerBands {
        upper: IndicatorSeries::from_options(
            IndicatorType::BollingerUpper(period),
            timestamps.iter().copied(),
            upper,
        ),
        middle: IndicatorSeries::from_options(
            IndicatorType::BollingerMiddle(period),
            timestamps.iter().copied(),
            middle,
        ),
        lower: IndicatorSeries::from_options(
            IndicatorType::BollingerLower(period),
            timestamps.iter().copied(),
            lower,
        ),
        period,
        mult,
    }
}

/// Band width relative to the middle band. Undefined where the middle is zero.
pub fn calculate_bandwidth(bands: &BollingerBands) -> IndicatorSeries {
    let values = (0..bands.middle.len())
        .map(|i| {
            let upper = bands.upper.value_at(i)?;
            let middle = bands.middle.value_at(i)?;
            let lower = bands.lower.value_at(i)?;
            if middle == 0.0 {
                None
            } else {
                Some((upper - lower) / middle)
            }
        })
        .collect();
    IndicatorSeries::from_options(
        IndicatorType::Bandwidth(bands.period),
        bands.middle.timestamps(),
        values,
    )
}

/// Fractional change of bandwidth over `window` bars.
pub fn calculate_bandwidth_change(bandwidth: &IndicatorSeries, window: usize) -> IndicatorSeries {
    IndicatorSeries::from_options(
        IndicatorType::BandwidthChange(window),
        bandwidth.timestamps(),
        pct_change(&bandwidth.options(), window),
    )
}
