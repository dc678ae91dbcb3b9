//! Multi-timeframe trend regime and the strategy eligibility map.
//!
//! Each timeframe gets a trend label from its fast/slow moving averages and
//! the slope of the fast one, read on the last closed bar. The three labels
//! (primary, mid, coarse) form a [`TrendCombination`], which maps to the
//! strategy variants allowed to look for entries. Two filters on the
//! primary timeframe (volume above its average, Bollinger bandwidth above a
//! floor) must also pass.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::market_data::{MultiTimeframeView, TimeframeView};
use super::strategy::StrategyKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Long,
    Short,
    Sideway,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendLabel::Long => "long",
            TrendLabel::Short => "short",
            TrendLabel::Sideway => "sideway",
        })
    }
}

/// Trend labels ordered (primary, mid, coarse).
pub type TrendCombination = [TrendLabel; 3];

const ALL_VARIANTS: &[StrategyKind] = &StrategyKind::PRIORITY;

/// Strategy variants allowed under a trend combination. Every combination
/// currently admits all four variants; the signal predicates do the
/// discriminating.
pub fn eligible_strategies(combination: TrendCombination) -> &'static [StrategyKind] {
    use TrendLabel::{Long, Short, Sideway};
    match combination {
        [Long, Long, Long] | [Long, Long, Short] | [Long, Long, Sideway] => ALL_VARIANTS,
        [Long, Short, Long] | [Long, Short, Short] | [Long, Short, Sideway] => ALL_VARIANTS,
        [Long, Sideway, Long] | [Long, Sideway, Short] | [Long, Sideway, Sideway] => ALL_VARIANTS,
        [Short, Long, Long] | [Short, Long, Short] | [Short, Long, Sideway] => ALL_VARIANTS,
        [Short, Short, Long] | [Short, Short, Short] | [Short, Short, Sideway] => ALL_VARIANTS,
        [Short, Sideway, Long] | [Short, Sideway, Short] | [Short, Sideway, Sideway] => ALL_VARIANTS,
        [Sideway, Long, Long] | [Sideway, Long, Short] | [Sideway, Long, Sideway] => ALL_VARIANTS,
        [Sideway, Short, Long] | [Sideway, Short, Short] | [Sideway, Short, Sideway] => ALL_VARIANTS,
        [Sideway, Sideway, Long] | [Sideway, Sideway, Short] | [Sideway, Sideway, Sideway] => {
            ALL_VARIANTS
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeParams {
    /// Slopes inside `(-threshold, threshold)` are sideways.
    pub ma_slope_threshold: f64,
    pub min_bandwidth_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeAssessment {
    pub trend: TrendCombination,
    pub volume_ok: bool,
    pub bandwidth_ok: bool,
}

impl RegimeAssessment {
    /// Variants to test for entry; empty when either filter fails.
    pub fn eligible(&self) -> &'static [StrategyKind] {
        if self.volume_ok && self.bandwidth_ok {
            eligible_strategies(self.trend)
        } else {
            &[]
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    params: RegimeParams,
}

impl RegimeClassifier {
    pub fn new(params: RegimeParams) -> Self {
        RegimeClassifier { params }
    }

    /// Label one timeframe. Missing history reads as sideways.
    pub fn trend_label(&self, view: &TimeframeView<'_>) -> TrendLabel {
        let Some(i) = view.last_closed() else {
            return TrendLabel::Sideway;
        };
        let ind = view.indicators;
        let (Some(fast), Some(slow), Some(slope)) = (
            ind.ma_fast.value_at(i),
            ind.ma_slow.value_at(i),
            ind.ma_fast_slope.value_at(i),
        ) else {
            return TrendLabel::Sideway;
        };

        let threshold = self.params.ma_slope_threshold;
        let sideways = slope > -threshold && slope < threshold;
        if fast > slow && slope > 0.0 && !sideways {
            TrendLabel::Long
        } else if fast < slow && slope < 0.0 && !sideways {
            TrendLabel::Short
        } else {
            TrendLabel::Sideway
        }
    }

    pub fn trend_combination(&self, views: &MultiTimeframeView<'_>) -> TrendCombination {
        views.frames().map(|v| self.trend_label(v))
    }

    pub fn volume_filter(&self, view: &TimeframeView<'_>) -> bool {
        let Some(i) = view.last_closed() else {
            return false;
        };
        match view.indicators.avg_volume.value_at(i) {
            Some(avg) => view.bars[i].volume_f64() > avg,
            None => false,
        }
    }

    pub fn bandwidth_filter(&self, view: &TimeframeView<'_>) -> bool {
        view.last_closed()
            .and_then(|i| view.indicators.bandwidth.value_at(i))
            .is_some_and(|bw| bw > self.params.min_bandwidth_threshold)
    }

    pub fn classify(&self, views: &MultiTimeframeView<'_>) -> RegimeAssessment {
        let assessment = RegimeAssessment {
            trend: self.trend_combination(views),
            volume_ok: self.volume_filter(&views.primary),
            bandwidth_ok: self.bandwidth_filter(&views.primary),
        };
        debug!(
            primary = %assessment.trend[0],
            mid = %assessment.trend[1],
            coarse = %assessment.trend[2],
            volume_ok = assessment.volume_ok,
            bandwidth_ok = assessment.bandwidth_ok,
            "regime classified"
        );
        assessment
    }
}
