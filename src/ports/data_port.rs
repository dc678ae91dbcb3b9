//! Bar source port.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{Bar, Timeframe};

/// Historical bars for one symbol on one timeframe.
///
/// Implementations return bars whose open time lies in `[start_ms, end_ms]`,
/// ordered by timestamp, gap-free at the timeframe's spacing.
pub trait DataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>, TraderError>;

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, TraderError>;

    /// First and last timestamp plus bar count, or `None` when the source
    /// holds nothing for the pair.
    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<(i64, i64, usize)>, TraderError>;
}
