//! Order book access port trait.

/// Answers whether an order for `symbol` could be filled within the
/// configured slippage tolerance right now.
pub trait OrderBookPort {
    fn slippage_feasible(&self, symbol: &str) -> bool;
}
