//! Performance metrics over a finished backtest.
//!
//! The equity curve carries one sample per primary bar, so per-period
//! returns are annualized with the number of primary bars in a year.

use std::collections::BTreeMap;

use super::backtest::BacktestResult;
use super::money::to_f64;
use super::ohlcv::Timeframe;
use super::position::Trade;
use super::regime::TrendCombination;

const MS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;
const MS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;

/// Win/loss statistics over a group of closed trades.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeStats {
    pub trades: usize,
    pub won: usize,
    pub lost: usize,
    pub breakeven: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_hours: f64,
}

impl TradeStats {
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Self {
        let mut stats = TradeStats::default();
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_holding_ms = 0i64;

        for trade in trades {
            let pnl = to_f64(trade.pnl);
            stats.trades += 1;
            stats.total_pnl += pnl;
            total_holding_ms += trade.holding_ms();
            if pnl > 0.0 {
                stats.won += 1;
                total_wins += pnl;
                stats.largest_win = stats.largest_win.max(pnl);
            } else if pnl < 0.0 {
                stats.lost += 1;
                total_losses += pnl.abs();
                stats.largest_loss = stats.largest_loss.max(pnl.abs());
            } else {
                stats.breakeven += 1;
            }
        }

        if stats.trades == 0 {
            return stats;
        }

        stats.win_rate = stats.won as f64 / stats.trades as f64;
        stats.profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        if stats.won > 0 {
            stats.avg_win = total_wins / stats.won as f64;
        }
        if stats.lost > 0 {
            stats.avg_loss = total_losses / stats.lost as f64;
        }
        stats.avg_holding_hours = total_holding_ms as f64 / MS_PER_HOUR / stats.trades as f64;
        stats
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_balance: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior equity peak.
    pub max_drawdown_duration: i64,
    pub total_commissions: f64,
    pub overall: TradeStats,
    pub by_symbol: BTreeMap<String, TradeStats>,
    pub by_strategy: BTreeMap<&'static str, TradeStats>,
    /// Keyed by the trend combination recorded at entry and the strategy
    /// label. Trades without a recorded snapshot are left out.
    pub by_trend: BTreeMap<(TrendCombination, &'static str), TradeStats>,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64, bar_timeframe: Timeframe) -> Self {
        let initial_balance = to_f64(result.initial_balance);
        let final_equity = to_f64(result.final_equity());
        let periods_per_year = MS_PER_YEAR / bar_timeframe.duration_ms() as f64;

        let total_return = if initial_balance > 0.0 {
            (final_equity - initial_balance) / initial_balance
        } else {
            0.0
        };

        let years = result.equity_curve.len() as f64 / periods_per_year;
        let annualized_return = if years > 0.0 && 1.0 + total_return > 0.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let curve: Vec<f64> = result.equity_curve.iter().map(|p| to_f64(p.equity)).collect();
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&curve);

        let period_rf = risk_free_rate / periods_per_year;
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(&curve, period_rf, periods_per_year);

        let mut symbol_groups: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();
        let mut strategy_groups: BTreeMap<&'static str, Vec<&Trade>> = BTreeMap::new();
        let mut trend_groups: BTreeMap<(TrendCombination, &'static str), Vec<&Trade>> =
            BTreeMap::new();
        for trade in &result.trades {
            symbol_groups
                .entry(trade.symbol().to_string())
                .or_default()
                .push(trade);
            strategy_groups
                .entry(trade.strategy().label())
                .or_default()
                .push(trade);
            if let Some(snapshot) = &trade.position.market_condition {
                trend_groups
                    .entry((snapshot.trend, trade.strategy().label()))
                    .or_default()
                    .push(trade);
            }
        }

        Metrics {
            initial_balance,
            final_equity,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_commissions: to_f64(result.total_commissions),
            overall: TradeStats::from_trades(&result.trades),
            by_symbol: symbol_groups
                .into_iter()
                .map(|(k, v)| (k, TradeStats::from_trades(v)))
                .collect(),
            by_strategy: strategy_groups
                .into_iter()
                .map(|(k, v)| (k, TradeStats::from_trades(v)))
                .collect(),
            by_trend: trend_groups
                .into_iter()
                .map(|(k, v)| (k, TradeStats::from_trades(v)))
                .collect(),
        }
    }
}

fn compute_drawdown(equity_curve: &[f64]) -> (f64, i64) {
    let Some(&first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            if equity < peak {
                current_dd_duration += 1;
                max_dd_duration = max_dd_duration.max(current_dd_duration);
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(equity_curve: &[f64], period_rf: f64, periods_per_year: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - period_rf;
    let scale = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * scale
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * scale
    } else {
        0.0
    };

    (sharpe, sortino)
}
