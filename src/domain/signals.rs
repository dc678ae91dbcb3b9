//! Entry and exit predicates for the four strategy variants.
//!
//! Each predicate is evaluated at a single bar index of the primary
//! timeframe. A missing indicator value makes any comparison against it
//! false, so undefined history never produces a signal.

use super::indicator::IndicatorSeries;
use super::indicator_set::IndicatorSet;
use super::market_data::TimeframeView;
use super::ohlcv::Bar;
use super::position::Side;
use super::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub bb_change_rate: f64,
    pub bb_price_threshold: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_momentum_offset: f64,
    pub rsi_reversal_offset: f64,
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    params: SignalParams,
}

fn at(series: &IndicatorSeries, i: usize) -> Option<f64> {
    series.value_at(i)
}

fn prev(series: &IndicatorSeries, i: usize) -> Option<f64> {
    i.checked_sub(1).and_then(|p| series.value_at(p))
}

/// `|close - band| / band <= threshold`
fn near(close: f64, band: f64, threshold: f64) -> bool {
    band != 0.0 && (close - band).abs() / band <= threshold
}

impl SignalGenerator {
    pub fn new(params: SignalParams) -> Self {
        SignalGenerator { params }
    }

    /// Close above the upper band, RSI rising into (but not past) the
    /// overbought zone, bands widening faster than the change-rate floor.
    pub fn trend_long_entry(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let p = &self.params;
        let (Some(bar), Some(upper), Some(rsi), Some(avg_rsi), Some(bw_change)) = (
            bars.get(i),
            at(&ind.upper, i),
            at(&ind.rsi, i),
            at(&ind.avg_rsi, i),
            at(&ind.bandwidth_change, i),
        ) else {
            return false;
        };
        let breakout = bar.close_f64() > upper;
        let momentum = rsi > p.rsi_overbought - p.rsi_momentum_offset && rsi < p.rsi_overbought && rsi > avg_rsi;
        let expanding = bw_change > 0.0 && bw_change > p.bb_change_rate;
        breakout && momentum && expanding
    }

    pub fn trend_short_entry(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let p = &self.params;
        let (Some(bar), Some(lower), Some(rsi), Some(avg_rsi), Some(bw_change)) = (
            bars.get(i),
            at(&ind.lower, i),
            at(&ind.rsi, i),
            at(&ind.avg_rsi, i),
            at(&ind.bandwidth_change, i),
        ) else {
            return false;
        };
        let breakdown = bar.close_f64() < lower;
        let momentum = rsi < p.rsi_oversold + p.rsi_momentum_offset && rsi > p.rsi_oversold && rsi < avg_rsi;
        let expanding = bw_change > 0.0 && bw_change > p.bb_change_rate;
        breakdown && momentum && expanding
    }

    /// Close at or below the lower band after an oversold bar, RSI turning up.
    pub fn mean_rev_long_entry(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let p = &self.params;
        let (Some(bar), Some(lower), Some(rsi), Some(rsi_prev)) =
            (bars.get(i), at(&ind.lower, i), at(&ind.rsi, i), prev(&ind.rsi, i))
        else {
            return false;
        };
        let close = bar.close_f64();
        let at_band = near(close, lower, p.bb_price_threshold) || close < lower;
        at_band && rsi_prev < p.rsi_oversold && rsi > rsi_prev
    }

    pub fn mean_rev_short_entry(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let p = &self.params;
        let (Some(bar), Some(upper), Some(rsi), Some(rsi_prev)) =
            (bars.get(i), at(&ind.upper, i), at(&ind.rsi, i), prev(&ind.rsi, i))
        else {
            return false;
        };
        let close = bar.close_f64();
        let at_band = near(close, upper, p.bb_price_threshold) || close > upper;
        at_band && rsi_prev > p.rsi_overbought && rsi < rsi_prev
    }

    /// RSI rolling over from beyond the extended overbought level, or price
    /// back at the middle band.
    pub fn trend_long_exit(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let p = &self.params;
        let reversal = match (at(&ind.rsi, i), prev(&ind.rsi, i)) {
            (Some(rsi), Some(rsi_prev)) => {
                rsi_prev > p.rsi_overbought + p.rsi_reversal_offset && rsi < rsi_prev
            }
            _ => false,
        };
        let reverted = match (bars.get(i), at(&ind.middle, i)) {
            (Some(bar), Some(middle)) => bar.close_f64() <= middle,
            _ => false,
        };
        reversal || reverted
    }

    pub fn trend_short_exit(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let p = &self.params;
        let reversal = match (at(&ind.rsi, i), prev(&ind.rsi, i)) {
            (Some(rsi), Some(rsi_prev)) => {
                rsi_prev < p.rsi_oversold - p.rsi_reversal_offset && rsi > rsi_prev
            }
            _ => false,
        };
        let reverted = match (bars.get(i), at(&ind.middle, i)) {
            (Some(bar), Some(middle)) => bar.close_f64() >= middle,
            _ => false,
        };
        reversal || reverted
    }

    /// Price near or above the middle band, or RSI back to 50.
    pub fn mean_rev_long_exit(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let reverted = match (bars.get(i), at(&ind.middle, i)) {
            (Some(bar), Some(middle)) => {
                let close = bar.close_f64();
                near(close, middle, self.params.bb_price_threshold) || close > middle
            }
            _ => false,
        };
        reverted || at(&ind.rsi, i).is_some_and(|rsi| rsi >= 50.0)
    }

    pub fn mean_rev_short_exit(&self, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        let reverted = match (bars.get(i), at(&ind.middle, i)) {
            (Some(bar), Some(middle)) => {
                let close = bar.close_f64();
                near(close, middle, self.params.bb_price_threshold) || close < middle
            }
            _ => false,
        };
        reverted || at(&ind.rsi, i).is_some_and(|rsi| rsi <= 50.0)
    }

    pub fn entry(&self, kind: StrategyKind, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        match kind {
            StrategyKind::TrendLong => self.trend_long_entry(bars, ind, i),
            StrategyKind::TrendShort => self.trend_short_entry(bars, ind, i),
            StrategyKind::MeanRevLong => self.mean_rev_long_entry(bars, ind, i),
            StrategyKind::MeanRevShort => self.mean_rev_short_entry(bars, ind, i),
            StrategyKind::Manual => false,
        }
    }

    /// Exit predicate for an open position, chosen by strategy class and
    /// side. Manual positions use the mean-reversion exits.
    pub fn exit(&self, kind: StrategyKind, side: Side, bars: &[Bar], ind: &IndicatorSet, i: usize) -> bool {
        match (kind.is_trend(), side) {
            (true, Side::Long) => self.trend_long_exit(bars, ind, i),
            (true, Side::Short) => self.trend_short_exit(bars, ind, i),
            (false, Side::Long) => self.mean_rev_long_exit(bars, ind, i),
            (false, Side::Short) => self.mean_rev_short_exit(bars, ind, i),
        }
    }

    /// Entry predicate on the view's last closed bar.
    pub fn entry_on(&self, kind: StrategyKind, view: &TimeframeView<'_>) -> bool {
        view.last_closed()
            .is_some_and(|i| self.entry(kind, view.bars, view.indicators, i))
    }

    /// Exit predicate on the view's last closed bar.
    pub fn exit_on(&self, kind: StrategyKind, side: Side, view: &TimeframeView<'_>) -> bool {
        view.last_closed()
            .is_some_and(|i| self.exit(kind, side, view.bars, view.indicators, i))
    }

    /// Entry predicate at every index of a series.
    pub fn entry_series(&self, kind: StrategyKind, bars: &[Bar], ind: &IndicatorSet) -> Vec<bool> {
        (0..bars.len()).map(|i| self.entry(kind, bars, ind, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{bars_from_closes, IndicatorType};
    use crate::domain::indicator_set::test_params;
    use crate::domain::ohlcv::Timeframe;

    fn generator() -> SignalGenerator {
        SignalGenerator::new(SignalParams {
            bb_change_rate: 0.05,
            bb_price_threshold: 0.01,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            rsi_momentum_offset: 10.0,
            rsi_reversal_offset: 5.0,
        })
    }

    fn series(values: &[Option<f64>]) -> IndicatorSeries {
        IndicatorSeries::from_options(IndicatorType::Sma(0), 0..values.len() as i64, values.to_vec())
    }

    /// Two bars with every indicator missing, ready to be overridden.
    fn blank(closes: &[f64]) -> (Vec<Bar>, IndicatorSet) {
        let bars = bars_from_closes(closes);
        let set = IndicatorSet::compute(&bars, &test_params());
        (bars, set)
    }

    #[test]
    fn trend_long_entry_requires_all_conditions() {
        let (bars, mut ind) = blank(&[100.0, 110.0]);
        ind.upper = series(&[None, Some(105.0)]);
        ind.rsi = series(&[None, Some(65.0)]);
        ind.avg_rsi = series(&[None, Some(60.0)]);
        ind.bandwidth_change = series(&[None, Some(0.1)]);
        let g = generator();
        assert!(g.trend_long_entry(&bars, &ind, 1));

        ind.rsi = series(&[None, Some(72.0)]);
        assert!(!g.trend_long_entry(&bars, &ind, 1), "overbought RSI");

        ind.rsi = series(&[None, Some(65.0)]);
        ind.bandwidth_change = series(&[None, Some(0.02)]);
        assert!(!g.trend_long_entry(&bars, &ind, 1), "bands not expanding fast enough");
    }

    #[test]
    fn trend_short_entry_mirror() {
        let (bars, mut ind) = blank(&[100.0, 90.0]);
        ind.lower = series(&[None, Some(95.0)]);
        ind.rsi = series(&[None, Some(35.0)]);
        ind.avg_rsi = series(&[None, Some(40.0)]);
        ind.bandwidth_change = series(&[None, Some(0.1)]);
        assert!(generator().trend_short_entry(&bars, &ind, 1));

        ind.avg_rsi = series(&[None, Some(30.0)]);
        assert!(!generator().trend_short_entry(&bars, &ind, 1));
    }

    #[test]
    fn mean_rev_long_entry_near_lower_band() {
        let (bars, mut ind) = blank(&[100.0, 100.5]);
        ind.lower = series(&[None, Some(100.0)]);
        ind.rsi = series(&[Some(25.0), Some(28.0)]);
        assert!(generator().mean_rev_long_entry(&bars, &ind, 1));

        ind.rsi = series(&[Some(25.0), Some(24.0)]);
        assert!(!generator().mean_rev_long_entry(&bars, &ind, 1), "RSI still falling");

        ind.rsi = series(&[Some(35.0), Some(38.0)]);
        assert!(!generator().mean_rev_long_entry(&bars, &ind, 1), "prior bar not oversold");
    }

    #[test]
    fn mean_rev_short_entry_above_upper_band() {
        let (bars, mut ind) = blank(&[100.0, 120.0]);
        ind.upper = series(&[None, Some(110.0)]);
        ind.rsi = series(&[Some(80.0), Some(75.0)]);
        assert!(generator().mean_rev_short_entry(&bars, &ind, 1));
    }

    #[test]
    fn trend_long_exit_on_middle_band_or_reversal() {
        let (bars, mut ind) = blank(&[100.0, 99.0]);
        ind.middle = series(&[None, Some(99.5)]);
        assert!(generator().trend_long_exit(&bars, &ind, 1));

        ind.middle = series(&[None, Some(95.0)]);
        ind.rsi = series(&[Some(78.0), Some(74.0)]);
        assert!(generator().trend_long_exit(&bars, &ind, 1));

        ind.rsi = series(&[Some(74.0), Some(73.0)]);
        assert!(!generator().trend_long_exit(&bars, &ind, 1));
    }

    #[test]
    fn trend_short_exit_mirror() {
        let (bars, mut ind) = blank(&[100.0, 96.0]);
        ind.middle = series(&[None, Some(99.0)]);
        ind.rsi = series(&[Some(20.0), Some(23.0)]);
        assert!(generator().trend_short_exit(&bars, &ind, 1));
        ind.rsi = series(&[Some(28.0), Some(29.0)]);
        assert!(!generator().trend_short_exit(&bars, &ind, 1));
    }

    #[test]
    fn mean_rev_exits_on_rsi_fifty() {
        let (bars, mut ind) = blank(&[100.0, 90.0]);
        ind.middle = series(&[None, Some(100.0)]);
        ind.rsi = series(&[None, Some(50.0)]);
        let g = generator();
        assert!(g.mean_rev_long_exit(&bars, &ind, 1));
        assert!(g.mean_rev_short_exit(&bars, &ind, 1));

        ind.rsi = series(&[None, Some(45.0)]);
        assert!(!g.mean_rev_long_exit(&bars, &ind, 1));
        assert!(g.mean_rev_short_exit(&bars, &ind, 1), "close below middle");
    }

    #[test]
    fn missing_values_never_signal() {
        let (bars, ind) = blank(&[100.0, 101.0]);
        let g = generator();
        for kind in StrategyKind::PRIORITY {
            assert!(!g.entry(kind, &bars, &ind, 1));
            assert!(!g.exit(kind, kind.entry_side().unwrap(), &bars, &ind, 1));
        }
        assert!(!g.entry(StrategyKind::Manual, &bars, &ind, 1));
    }

    #[test]
    fn view_reads_last_closed_bar() {
        let (bars, mut ind) = blank(&[100.0, 110.0, 50.0]);
        ind.upper = series(&[None, Some(105.0), Some(200.0)]);
        ind.rsi = series(&[None, Some(65.0), Some(10.0)]);
        ind.avg_rsi = series(&[None, Some(60.0), Some(90.0)]);
        ind.bandwidth_change = series(&[None, Some(0.1), Some(-1.0)]);
        let view = TimeframeView::new(Timeframe::H1, &bars, &ind);
        assert!(generator().entry_on(StrategyKind::TrendLong, &view));
        assert_eq!(
            generator().entry_series(StrategyKind::TrendLong, &bars, &ind),
            vec![false, true, false]
        );
    }
}
