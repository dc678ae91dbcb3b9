//! Bar-by-bar simulation loop.
//!
//! The loop walks the first symbol's primary timeline from the warm-up
//! reservation to the last fully closed bar. At each bar the current price
//! is the bar's open; protective exits are tested against the previous
//! bar's range and every signal reads the previous (last closed) bar.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::backtest::{BacktestResult, Settings};
use super::broker::{Broker, OpenRequest};
use super::error::{ComputationError, TraderError};
use super::market_data::{MultiTimeframeView, SymbolData, TimeframeView};
use super::ohlcv::Bar;
use super::position::{CloseReason, FrameSnapshot, MarketSnapshot};
use super::regime::{RegimeClassifier, TrendCombination};
use super::risk::RiskGate;
use super::signals::SignalGenerator;
use super::sizing::{position_size, protective_levels};
use super::strategy::{Selection, StrategySelector};
use crate::ports::order_book_port::OrderBookPort;

pub struct Engine<'a> {
    settings: &'a Settings,
    order_book: &'a dyn OrderBookPort,
    regime: RegimeClassifier,
    signals: SignalGenerator,
    broker: Broker,
}

impl<'a> Engine<'a> {
    pub fn new(settings: &'a Settings, order_book: &'a dyn OrderBookPort) -> Self {
        let risk = RiskGate::new(settings.risk.clone(), settings.backtest.timeframes.primary);
        Engine {
            settings,
            order_book,
            regime: RegimeClassifier::new(settings.regime.clone()),
            signals: SignalGenerator::new(settings.signals.clone()),
            broker: Broker::new(
                settings.backtest.initial_balance,
                settings.execution.clone(),
                risk,
            ),
        }
    }

    /// Primary bars skipped before the first decision.
    pub fn reserved_warmup(&self) -> usize {
        self.settings
            .backtest
            .timeframes
            .reserved_warmup(self.settings.indicators.max_window())
    }

    pub fn run(mut self, data: &[SymbolData]) -> Result<BacktestResult, TraderError> {
        let warmup = self.reserved_warmup();
        let Some(main) = data.first() else {
            return Ok(self.finish(false, 0));
        };
        let minimum = warmup + 2;
        if main.bar_count() < minimum {
            return Err(TraderError::InsufficientData {
                symbol: main.symbol.clone(),
                bars: main.bar_count(),
                minimum,
            });
        }

        info!(
            symbols = data.len(),
            bars = main.bar_count(),
            warmup,
            "backtest started"
        );

        let mut halted = false;
        let mut bars_processed = 0;
        'bars: for i in warmup..main.bar_count() - 1 {
            let now = main.primary.bars[i].timestamp;
            for symbol_data in data {
                if self.broker.account().equity <= Decimal::ZERO {
                    warn!(equity = %self.broker.account().equity, "equity exhausted, halting run");
                    halted = true;
                    break 'bars;
                }
                match symbol_data.primary_index(now) {
                    Some(j) if j > 0 && j + 1 < symbol_data.bar_count() => self.step_symbol(symbol_data, j),
                    _ => debug!(symbol = %symbol_data.symbol, now, "no bar for symbol, skipped"),
                }
            }
            self.broker.record_equity(now);
            bars_processed += 1;
        }

        let result = self.finish(halted, bars_processed);
        info!(
            trades = result.trades.len(),
            final_equity = %result.final_equity(),
            halted = result.halted,
            "backtest finished"
        );
        Ok(result)
    }

    fn step_symbol(&mut self, data: &SymbolData, i: usize) {
        let symbol = data.symbol.as_str();
        let bar = &data.primary.bars[i];
        let prev = &data.primary.bars[i - 1];
        let (now, price) = (bar.timestamp, bar.open);
        let Some(views) = data.view_at(i) else {
            return;
        };
        debug!(symbol, now, %price, "bar");

        if let Some((strategy, side)) = self.broker.position(symbol).map(|p| (p.strategy, p.side)) {
            if passive_exit(&mut self.broker, symbol, prev, now) {
                return;
            }
            let signalled = self.signals.exit_on(strategy, side, &views.primary);
            let expired = self.broker.can_close_position(symbol, now);
            if signalled || expired {
                if let Err(e) = self.broker.close_position(symbol, price, now, CloseReason::Manual) {
                    warn!(symbol, error = %e, "close rejected");
                }
            }
            return;
        }

        if !self.broker.can_open_position(now) {
            debug!(symbol, "risk gate blocked opening");
            return;
        }

        let assessment = self.regime.classify(&views);
        let selector = StrategySelector::new(&self.regime, &self.signals, self.order_book);
        let Selection::Strategy(kind) = selector.select_with(symbol, &views, &assessment) else {
            return;
        };
        let Some(side) = kind.entry_side() else {
            return;
        };

        let sizing = &self.settings.sizing;
        let equity = self.broker.account().equity;
        let sized = last_closed_atr_pct(&views.primary)
            .and_then(|atr_pct| position_size(equity, price, kind.is_trend(), atr_pct, sizing));
        let amount = match sized {
            Ok(amount) => amount,
            Err(e) => {
                warn!(symbol, error = %e, "position sizing failed, entry skipped");
                return;
            }
        };

        let request = OpenRequest {
            symbol: symbol.to_string(),
            side,
            amount,
            price,
            timestamp: now,
            strategy: kind,
            levels: protective_levels(kind, side, price, sizing),
        };
        if let Err(e) = self.broker.open_position(request) {
            warn!(symbol, error = %e, "open rejected");
            return;
        }
        self.broker
            .record_market_condition(symbol, snapshot(&views, assessment.trend, now));
        passive_exit(&mut self.broker, symbol, prev, now);
    }

    fn finish(self, halted: bool, bars_processed: usize) -> BacktestResult {
        let open_positions = self.broker.positions().cloned().collect();
        BacktestResult {
            initial_balance: self.broker.initial_balance(),
            trades: self.broker.trades().to_vec(),
            equity_curve: self.broker.equity_curve().to_vec(),
            account: self.broker.account().clone(),
            total_commissions: self.broker.total_commissions(),
            open_positions,
            halted,
            bars_processed,
        }
    }
}

fn last_closed_atr_pct(view: &TimeframeView<'_>) -> Result<f64, ComputationError> {
    let index = view.last_closed().ok_or(ComputationError::MissingValue { what: "ATR%", index: 0 })?;
    view.indicators
        .atr_pct
        .value_at(index)
        .ok_or(ComputationError::MissingValue { what: "ATR%", index })
}

/// Stop-loss, then take-profit, then trailing stop against `bar`'s range.
/// Returns whether the position was closed.
fn passive_exit(broker: &mut Broker, symbol: &str, bar: &Bar, now: i64) -> bool {
    let (high, low) = (bar.high, bar.low);
    let exit = if broker.check_stop_loss(symbol, high, low) {
        broker
            .position(symbol)
            .and_then(|p| p.stop_loss)
            .map(|price| (price, CloseReason::StopLoss))
    } else if broker.check_take_profit(symbol, high, low) {
        broker
            .position(symbol)
            .and_then(|p| p.take_profit)
            .map(|price| (price, CloseReason::TakeProfit))
    } else if broker.check_trailing_stop(symbol, high, low) {
        broker
            .position(symbol)
            .and_then(|p| p.stop_loss)
            .map(|price| (price, CloseReason::TrailingStop))
    } else {
        None
    };

    let Some((price, reason)) = exit else {
        return false;
    };
    match broker.close_position(symbol, price, now, reason) {
        Ok(()) => true,
        Err(e) => {
            warn!(symbol, error = %e, "close rejected");
            false
        }
    }
}

fn snapshot(views: &MultiTimeframeView<'_>, trend: TrendCombination, now: i64) -> MarketSnapshot {
    let frames = views
        .frames()
        .into_iter()
        .filter_map(|view| {
            view.last_closed_bar().map(|bar| FrameSnapshot {
                timeframe: view.timeframe.label(),
                open_time: bar.timestamp,
                open_price: bar.open,
            })
        })
        .collect();
    MarketSnapshot {
        timestamp: now,
        frames,
        trend,
    }
}
