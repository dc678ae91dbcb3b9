//! Per-symbol bar series on three timeframes and the point-in-time views
//! the selector and engine read from.

use std::collections::HashMap;

use super::indicator_set::{IndicatorParams, IndicatorSet};
use super::ohlcv::{Bar, Timeframe};

/// The three timeframes a run trades on, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeSet {
    pub primary: Timeframe,
    pub mid: Timeframe,
    pub coarse: Timeframe,
}

impl TimeframeSet {
    pub fn canonical() -> Self {
        TimeframeSet {
            primary: Timeframe::H1,
            mid: Timeframe::H4,
            coarse: Timeframe::D1,
        }
    }

    pub fn all(&self) -> [Timeframe; 3] {
        [self.primary, self.mid, self.coarse]
    }

    /// Primary bars needed before the coarse timeframe has `max_window`
    /// bars of history.
    pub fn reserved_warmup(&self, max_window: usize) -> usize {
        let ratio = (self.coarse.duration_ms() / self.primary.duration_ms()).max(1) as usize;
        max_window * ratio + 1
    }
}

#[derive(Debug, Clone)]
pub struct TimeframeSeries {
    pub timeframe: Timeframe,
    pub bars: Vec<Bar>,
    pub indicators: IndicatorSet,
}

impl TimeframeSeries {
    pub fn new(timeframe: Timeframe, bars: Vec<Bar>, params: &IndicatorParams) -> Self {
        let indicators = IndicatorSet::compute(&bars, params);
        TimeframeSeries {
            timeframe,
            bars,
            indicators,
        }
    }

    /// Number of bars whose open time is strictly before `timestamp`.
    pub fn visible_before(&self, timestamp: i64) -> usize {
        self.bars.partition_point(|b| b.timestamp < timestamp)
    }

    pub fn view(&self, visible: usize) -> TimeframeView<'_> {
        TimeframeView::new(self.timeframe, &self.bars[..visible.min(self.bars.len())], &self.indicators)
    }
}

/// The bars of one timeframe as seen at a point in time. The last visible
/// bar may still be forming, so decisions read `last_closed()`.
#[derive(Debug, Clone, Copy)]
pub struct TimeframeView<'a> {
    pub timeframe: Timeframe,
    pub bars: &'a [Bar],
    pub indicators: &'a IndicatorSet,
}

impl<'a> TimeframeView<'a> {
    pub fn new(timeframe: Timeframe, bars: &'a [Bar], indicators: &'a IndicatorSet) -> Self {
        let visible = bars.len().min(indicators.len());
        TimeframeView {
            timeframe,
            bars: &bars[..visible],
            indicators,
        }
    }

    /// Index of the second-to-last visible bar.
    pub fn last_closed(&self) -> Option<usize> {
        self.bars.len().checked_sub(2)
    }

    pub fn last_closed_bar(&self) -> Option<&'a Bar> {
        self.last_closed().map(|i| &self.bars[i])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MultiTimeframeView<'a> {
    pub primary: TimeframeView<'a>,
    pub mid: TimeframeView<'a>,
    pub coarse: TimeframeView<'a>,
}

impl<'a> MultiTimeframeView<'a> {
    pub fn frames(&self) -> [&TimeframeView<'a>; 3] {
        [&self.primary, &self.mid, &self.coarse]
    }
}

#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub primary: TimeframeSeries,
    pub mid: TimeframeSeries,
    pub coarse: TimeframeSeries,
    timestamp_index: HashMap<i64, usize>,
}

impl SymbolData {
    pub fn new(symbol: String, primary: TimeframeSeries, mid: TimeframeSeries, coarse: TimeframeSeries) -> Self {
        let timestamp_index = primary
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.timestamp, i))
            .collect();
        SymbolData {
            symbol,
            primary,
            mid,
            coarse,
            timestamp_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.primary.bars.len()
    }

    pub fn primary_index(&self, timestamp: i64) -> Option<usize> {
        self.timestamp_index.get(&timestamp).copied()
    }

    /// What the strategy may see while primary bar `i` is forming: primary
    /// bars `..=i`, and mid/coarse bars that opened before bar `i`.
    pub fn view_at(&self, i: usize) -> Option<MultiTimeframeView<'_>> {
        let now = self.primary.bars.get(i)?.timestamp;
        Some(MultiTimeframeView {
            primary: self.primary.view(i + 1),
            mid: self.mid.view(self.mid.visible_before(now)),
            coarse: self.coarse.view(self.coarse.visible_before(now)),
        })
    }
}
