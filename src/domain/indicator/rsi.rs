//! RSI (Relative Strength Index) with Wilder smoothing.
//!
//! Average gain/loss are exponentially weighted with alpha = 1/n, seeded
//! with the first price change and reported once n changes have been seen.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If both are zero the value is undefined (flat prices).
//!
//! Warmup: first n bars are invalid.

use super::{ewm, rolling_mean, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let timestamps = bars.iter().map(|b| b.timestamp);
    if period == 0 {
        return IndicatorSeries::from_options(IndicatorType::Rsi(period), timestamps, vec![None; bars.len()]);
    }

    let mut gains: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    let mut losses: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        if i == 0 {
            gains.push(None);
            losses.push(None);
            continue;
        }
        let change = bars[i].close_f64() - bars[i - 1].close_f64();
        gains.push(Some(change.max(0.0)));
        losses.push(Some((-change).max(0.0)));
    }

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm(&gains, alpha, period);
    let avg_loss = ewm(&losses, alpha, period);

    let values = avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            let (g, l) = ((*g)?, (*l)?);
            if l == 0.0 {
                if g > 0.0 { Some(100.0) } else { None }
            } else {
                Some(100.0 - (100.0 / (1.0 + g / l)))
            }
        })
        .collect();

    IndicatorSeries::from_options(IndicatorType::Rsi(period), timestamps, values)
}

/// Simple moving average of an RSI series.
pub fn calculate_average_rsi(rsi: &IndicatorSeries, window: usize) -> IndicatorSeries {
    let rsi_length = match rsi.indicator_type {
        IndicatorType::Rsi(n) => n,
        _ => 0,
    };
    IndicatorSeries::from_options(
        IndicatorType::AverageRsi { rsi_length, window },
        rsi.timestamps(),
        rolling_mean(&rsi.options(), window),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::bars_from_closes as make_bars;

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert!(series.is_empty());
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=16).map(|i| 100.0 + (i % 5) as f64 * 2.0).collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        for i in 0..14 {
            assert!(!series.values[i].valid, "bar {} should be invalid", i);
        }
        assert!(series.values[14].valid);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        assert!((series.value_at(14).unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        assert!(series.value_at(14).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_prices_undefined() {
        let series = calculate_rsi(&make_bars(&[100.0; 20]), 14);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40).map(|i| 100.0 + ((i % 7) as f64 - 3.0) * 2.0).collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        for v in series.options().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {} out of range", v);
        }
    }

    #[test]
    fn rsi_wilder_recursion() {
        // changes: +2, -1, +1 with n = 2, alpha = 0.5
        let series = calculate_rsi(&make_bars(&[10.0, 12.0, 11.0, 12.0]), 2);
        // gains ewm: 2, 1, 1; losses ewm: 0, 0.5, 0.25
        assert!(!series.values[1].valid);
        let at2 = 100.0 - 100.0 / (1.0 + 1.0 / 0.5);
        let at3 = 100.0 - 100.0 / (1.0 + 1.0 / 0.25);
        approx::assert_abs_diff_eq!(series.value_at(2).unwrap(), at2, epsilon = 1e-10);
        approx::assert_abs_diff_eq!(series.value_at(3).unwrap(), at3, epsilon = 1e-10);
    }

    #[test]
    fn average_rsi_window() {
        let closes: Vec<f64> = (1..=30).map(|i| 100.0 + ((i % 4) as f64 - 1.5) * 3.0).collect();
        let rsi = calculate_rsi(&make_bars(&closes), 5);
        let avg = calculate_average_rsi(&rsi, 3);
        assert_eq!(avg.indicator_type, IndicatorType::AverageRsi { rsi_length: 5, window: 3 });
        assert!(avg.value_at(6).is_none());
        let expected = (rsi.value_at(5).unwrap() + rsi.value_at(6).unwrap() + rsi.value_at(7).unwrap()) / 3.0;
        approx::assert_abs_diff_eq!(avg.value_at(7).unwrap(), expected, epsilon = 1e-10);
    }
}
