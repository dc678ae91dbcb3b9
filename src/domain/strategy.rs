//! Strategy variants and per-bar strategy selection.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::market_data::MultiTimeframeView;
use super::position::Side;
use super::regime::{RegimeAssessment, RegimeClassifier};
use super::signals::SignalGenerator;
use crate::ports::order_book_port::OrderBookPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TrendLong,
    TrendShort,
    MeanRevLong,
    MeanRevShort,
    /// Opened outside the selector; never chosen by it.
    Manual,
}

impl StrategyKind {
    /// Order in which eligible variants are tested; the first match wins.
    pub const PRIORITY: [StrategyKind; 4] = [
        StrategyKind::TrendLong,
        StrategyKind::TrendShort,
        StrategyKind::MeanRevLong,
        StrategyKind::MeanRevShort,
    ];

    pub fn is_trend(self) -> bool {
        matches!(self, StrategyKind::TrendLong | StrategyKind::TrendShort)
    }

    pub fn entry_side(self) -> Option<Side> {
        match self {
            StrategyKind::TrendLong | StrategyKind::MeanRevLong => Some(Side::Long),
            StrategyKind::TrendShort | StrategyKind::MeanRevShort => Some(Side::Short),
            StrategyKind::Manual => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::TrendLong => "trend_long",
            StrategyKind::TrendShort => "trend_short",
            StrategyKind::MeanRevLong => "mean_rev_long",
            StrategyKind::MeanRevShort => "mean_rev_short",
            StrategyKind::Manual => "manual",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Strategy(StrategyKind),
    NoTrade,
}

/// Combines regime eligibility, entry signals and order book feasibility
/// into at most one strategy per symbol per bar.
pub struct StrategySelector<'a> {
    regime: &'a RegimeClassifier,
    signals: &'a SignalGenerator,
    order_book: &'a dyn OrderBookPort,
}

impl<'a> StrategySelector<'a> {
    pub fn new(
        regime: &'a RegimeClassifier,
        signals: &'a SignalGenerator,
        order_book: &'a dyn OrderBookPort,
    ) -> Self {
        StrategySelector {
            regime,
            signals,
            order_book,
        }
    }

    pub fn select(&self, symbol: &str, views: &MultiTimeframeView<'_>) -> Selection {
        let assessment = self.regime.classify(views);
        self.select_with(symbol, views, &assessment)
    }

    /// Selection against an already computed regime assessment.
    pub fn select_with(
        &self,
        symbol: &str,
        views: &MultiTimeframeView<'_>,
        assessment: &RegimeAssessment,
    ) -> Selection {
        for &kind in assessment.eligible() {
            if !self.signals.entry_on(kind, &views.primary) {
                continue;
            }
            if self.order_book.slippage_feasible(symbol) {
                debug!(symbol, strategy = %kind, "strategy selected");
                return Selection::Strategy(kind);
            }
            debug!(symbol, strategy = %kind, "entry signal rejected by slippage check");
        }
        Selection::NoTrade
    }
}
