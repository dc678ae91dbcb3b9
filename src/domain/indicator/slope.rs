//! Slope as percentage change of a series over a window.
//!
//! SLOPE(n)[i] = (v[i] - v[i-n]) / v[i-n]
//! Invalid where either end is invalid or the base is zero.

use super::{pct_change, IndicatorSeries, IndicatorType};

pub fn calculate_slope(source: &IndicatorSeries, window: usize) -> IndicatorSeries {
    IndicatorSeries::from_options(
        IndicatorType::Slope(window),
        source.timestamps(),
        pct_change(&source.options(), window),
    )
}
