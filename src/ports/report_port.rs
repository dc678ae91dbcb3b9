//! Run output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;

/// Persists the outcome of a finished run.
pub trait ReportPort {
    /// Write the closed-trade log and the equity curve. Returns the path
    /// of the trade log.
    fn write(&self, result: &BacktestResult) -> Result<String, TraderError>;
}
