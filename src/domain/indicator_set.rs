//! Precomputed indicator bundle for one bar series.
//!
//! Every indicator here is causal (the value at index `i` depends only on
//! bars `0..=i`), so computing once over the full series and reading index
//! `i` is equivalent to recomputing over the window `bars[..=i]`.

use super::indicator::atr::{calculate_atr, calculate_atr_percent};
use super::indicator::bollinger::{calculate_bandwidth, calculate_bandwidth_change, calculate_bollinger};
use super::indicator::rsi::{calculate_average_rsi, calculate_rsi};
use super::indicator::slope::calculate_slope;
use super::indicator::sma::calculate_sma;
use super::indicator::volume::calculate_average_volume;
use super::indicator::IndicatorSeries;
use super::ohlcv::Bar;

/// Window lengths and band width shared by every timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub bb_length: usize,
    pub bb_mult: f64,
    pub bb_change_rate_window: usize,
    pub rsi_length: usize,
    pub rsi_average_window: usize,
    pub ma_slow_length: usize,
    pub ma_slope_window: usize,
    pub atr_period: usize,
    pub average_volume_window: usize,
}

impl IndicatorParams {
    /// Longest lookback of any indicator, in bars of the series it runs on.
    pub fn max_window(&self) -> usize {
        [
            self.bb_length,
            self.bb_change_rate_window,
            self.rsi_length,
            self.rsi_average_window,
            self.ma_slow_length,
            self.ma_slope_window,
            self.atr_period,
            self.average_volume_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
    pub bandwidth: IndicatorSeries,
    pub bandwidth_change: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub avg_rsi: IndicatorSeries,
    pub ma_fast: IndicatorSeries,
    pub ma_slow: IndicatorSeries,
    pub ma_fast_slope: IndicatorSeries,
    pub atr: IndicatorSeries,
    pub atr_pct: IndicatorSeries,
    pub avg_volume: IndicatorSeries,
}

impl IndicatorSet {
    pub fn compute(bars: &[Bar], params: &IndicatorParams) -> Self {
        let bands = calculate_bollinger(bars, params.bb_length, params.bb_mult);
        let bandwidth = calculate_bandwidth(&bands);
        let bandwidth_change = calculate_bandwidth_change(&bandwidth, params.bb_change_rate_window);
        let rsi = calculate_rsi(bars, params.rsi_length);
        let avg_rsi = calculate_average_rsi(&rsi, params.rsi_average_window);
        let ma_fast = calculate_sma(bars, params.bb_length);
        let ma_slow = calculate_sma(bars, params.ma_slow_length);
        let ma_fast_slope = calculate_slope(&ma_fast, params.ma_slope_window);
        let atr = calculate_atr(bars, params.atr_period);
        let atr_pct = calculate_atr_percent(bars, &atr);
        let avg_volume = calculate_average_volume(bars, params.average_volume_window);

        IndicatorSet {
            upper: bands.upper,
            middle: bands.middle,
            lower: bands.lower,
            bandwidth,
            bandwidth_change,
            rsi,
            avg_rsi,
            ma_fast,
            ma_slow,
            ma_fast_slope,
            atr,
            atr_pct,
            avg_volume,
        }
    }

    pub fn len(&self) -> usize {
        self.middle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_params() -> IndicatorParams {
    IndicatorParams {
        bb_length: 5,
        bb_mult: 2.0,
        bb_change_rate_window: 2,
        rsi_length: 4,
        rsi_average_window: 3,
        ma_slow_length: 8,
        ma_slope_window: 2,
        atr_period: 4,
        average_volume_window: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::bars_from_closes;

    #[test]
    fn max_window_picks_longest() {
        assert_eq!(test_params().max_window(), 8);
    }

    #[test]
    fn all_series_aligned_with_bars() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bars = bars_from_closes(&closes);
        let set = IndicatorSet::compute(&bars, &test_params());
        for series in [
            &set.upper,
            &set.middle,
            &set.lower,
            &set.bandwidth,
            &set.bandwidth_change,
            &set.rsi,
            &set.avg_rsi,
            &set.ma_fast,
            &set.ma_slow,
            &set.ma_fast_slope,
            &set.atr,
            &set.atr_pct,
            &set.avg_volume,
        ] {
            assert_eq!(series.len(), bars.len(), "{}", series.indicator_type);
        }
    }

    #[test]
    fn values_are_causal() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let full = IndicatorSet::compute(&bars_from_closes(&closes), &test_params());
        let prefix = IndicatorSet::compute(&bars_from_closes(&closes[..20]), &test_params());
        for i in 0..20 {
            assert_eq!(full.rsi.value_at(i), prefix.rsi.value_at(i));
            assert_eq!(full.bandwidth_change.value_at(i), prefix.bandwidth_change.value_at(i));
            assert_eq!(full.ma_fast_slope.value_at(i), prefix.ma_fast_slope.value_at(i));
            assert_eq!(full.atr_pct.value_at(i), prefix.atr_pct.value_at(i));
        }
    }

    #[test]
    fn ma_fast_matches_middle_band() {
        let closes: Vec<f64> = (0..12).map(|i| 50.0 + i as f64).collect();
        let set = IndicatorSet::compute(&bars_from_closes(&closes), &test_params());
        for i in 0..12 {
            assert_eq!(set.ma_fast.value_at(i), set.middle.value_at(i));
        }
    }

    #[test]
    fn configured_band_multiplier_is_not_rounded() {
        let params = IndicatorParams {
            bb_length: 3,
            bb_mult: 2.125,
            ..test_params()
        };
        let set = IndicatorSet::compute(&bars_from_closes(&[100.0, 105.0, 110.0]), &params);
        assert!((set.upper.value_at(2).unwrap() - 115.625).abs() < 1e-10);
        assert!((set.bandwidth.value_at(2).unwrap() - 21.25 / 105.0).abs() < 1e-12);
    }
}
