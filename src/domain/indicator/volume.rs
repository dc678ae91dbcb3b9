//! Average volume: SMA of bar volume.

use super::{rolling_mean, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_average_volume(bars: &[Bar], window: usize) -> IndicatorSeries {
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume_f64())).collect();
    IndicatorSeries::from_options(
        IndicatorType::AverageVolume(window),
        bars.iter().map(|b| b.timestamp),
        rolling_mean(&volumes, window),
    )
}
