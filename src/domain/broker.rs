//! Position ledger: the only owner and writer of open positions, closed
//! trades and the account state.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::account::AccountState;
use super::error::{CloseError, OpenError};
use super::execution::{
    apply_slippage, calculate_commission, calculate_notional, realized_pnl, simulate_entry, ExecutionConfig,
};
use super::money::{checked_ratio, round_money};
use super::position::{CloseReason, MarketSnapshot, Position, Side, Trade};
use super::risk::RiskGate;
use super::sizing::ProtectiveLevels;
use super::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub symbol: String,
    pub side: Side,
    pub amount: Decimal,
    /// Quoted price before slippage.
    pub price: Decimal,
    pub timestamp: i64,
    pub strategy: StrategyKind,
    pub levels: ProtectiveLevels,
}

#[derive(Debug, Clone)]
pub struct Broker {
    config: ExecutionConfig,
    risk: RiskGate,
    initial_balance: Decimal,
    account: AccountState,
    positions: BTreeMap<String, Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    total_commissions: Decimal,
}

impl Broker {
    pub fn new(initial_balance: Decimal, config: ExecutionConfig, risk: RiskGate) -> Self {
        Broker {
            config,
            risk,
            initial_balance,
            account: AccountState::new(initial_balance),
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            total_commissions: Decimal::ZERO,
        }
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn total_commissions(&self) -> Decimal {
        self.total_commissions
    }

    pub fn total_margin(&self) -> Decimal {
        self.positions.values().map(|p| p.margin).sum()
    }

    pub fn open_position(&mut self, request: OpenRequest) -> Result<(), OpenError> {
        let symbol = request.symbol;
        if self.positions.contains_key(&symbol) {
            return Err(OpenError::AlreadyOpen { symbol });
        }
        if request.amount <= Decimal::ZERO || request.price <= Decimal::ZERO {
            return Err(OpenError::InvalidAmount {
                symbol,
                amount: request.amount.to_string(),
            });
        }

        let fill = simulate_entry(request.side, request.amount, request.price, &self.config)?;
        if fill.notional <= Decimal::ZERO {
            return Err(OpenError::InvalidAmount {
                symbol,
                amount: request.amount.to_string(),
            });
        }
        if fill.required_funds() > self.account.equity {
            return Err(OpenError::InsufficientFunds {
                symbol,
                required: fill.required_funds().to_string(),
                equity: self.account.equity.to_string(),
            });
        }

        self.account.record_open(fill.commission);
        self.total_commissions += fill.commission;

        info!(
            %symbol,
            side = ?request.side,
            strategy = %request.strategy,
            amount = %request.amount,
            price = %fill.price,
            margin = %fill.margin,
            commission = %fill.commission,
            equity = %self.account.equity,
            "position opened"
        );

        let position = Position {
            symbol: symbol.clone(),
            side: request.side,
            strategy: request.strategy,
            open_time: request.timestamp,
            open_price: fill.price,
            open_amount: request.amount,
            open_notional: fill.notional,
            margin: fill.margin,
            open_commission: fill.commission,
            stop_loss: request.levels.stop_loss,
            take_profit: request.levels.take_profit,
            trailing_activation: request.levels.trailing_activation,
            trailing_callback_rate: request.levels.trailing_callback_rate,
            trailing_extreme: None,
            market_condition: None,
        };
        self.positions.insert(symbol, position);
        Ok(())
    }

    /// Close the whole position at `price` (before slippage).
    pub fn close_position(
        &mut self,
        symbol: &str,
        price: Decimal,
        timestamp: i64,
        reason: CloseReason,
    ) -> Result<(), CloseError> {
        let position = self.positions.remove(symbol).ok_or_else(|| CloseError::NotFound {
            symbol: symbol.to_string(),
        })?;

        let amount = position.open_amount;
        let close_price = apply_slippage(price, position.side.opposite(), self.config.slippage_rate);
        let close_notional = calculate_notional(amount, close_price);
        let pnl = realized_pnl(position.side, position.open_price, close_price, amount);
        let pnl_percentage = checked_ratio(pnl, position.open_notional, "pnl percentage")
            .map(|r| round_money(r * Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO);
        let commission = calculate_commission(close_notional, &self.config);

        self.account.record_close(pnl, commission);
        self.total_commissions += commission;
        self.risk.record_result(&mut self.account, pnl, timestamp);

        info!(
            symbol,
            reason = ?reason,
            price = %close_price,
            %pnl,
            %pnl_percentage,
            commission = %commission,
            equity = %self.account.equity,
            "position closed"
        );

        self.trades.push(Trade {
            position,
            close_time: timestamp,
            close_price,
            close_amount: amount,
            close_notional,
            close_commission: commission,
            close_reason: reason,
            pnl,
            pnl_percentage,
        });
        Ok(())
    }

    pub fn check_stop_loss(&self, symbol: &str, high: Decimal, low: Decimal) -> bool {
        self.positions
            .get(symbol)
            .is_some_and(|p| p.should_stop_loss(high, low))
    }

    pub fn check_take_profit(&self, symbol: &str, high: Decimal, low: Decimal) -> bool {
        self.positions
            .get(symbol)
            .is_some_and(|p| p.should_take_profit(high, low))
    }

    /// Advance the trailing stop with one bar's range; true when it fires,
    /// in which case the position's stop-loss holds the exit price.
    pub fn check_trailing_stop(&mut self, symbol: &str, high: Decimal, low: Decimal) -> bool {
        self.positions
            .get_mut(symbol)
            .and_then(|p| p.update_trailing(high, low))
            .is_some()
    }

    pub fn can_open_position(&mut self, now: i64) -> bool {
        let total_margin = self.total_margin();
        self.risk.can_open(&mut self.account, total_margin, now)
    }

    /// True when the open position on `symbol` has outlived its holding limit.
    pub fn can_close_position(&self, symbol: &str, now: i64) -> bool {
        self.positions
            .get(symbol)
            .is_some_and(|p| self.risk.holding_period_exceeded(p, now))
    }

    pub fn record_market_condition(&mut self, symbol: &str, snapshot: MarketSnapshot) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.market_condition = Some(snapshot);
        }
    }

    pub fn record_equity(&mut self, timestamp: i64) {
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.account.equity,
        });
    }
}
