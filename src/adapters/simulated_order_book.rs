//! Order book stand-in for historical replay.

use crate::ports::order_book_port::OrderBookPort;

/// No depth data exists in a replay, so every symbol is treated as
/// fillable within tolerance.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedOrderBook;

impl OrderBookPort for SimulatedOrderBook {
    fn slippage_feasible(&self, _symbol: &str) -> bool {
        true
    }
}
