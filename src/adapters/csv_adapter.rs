//! CSV file bar source.
//!
//! One file per symbol and timeframe, `{base}/{SYMBOL}_{timeframe}.csv`,
//! with a `timestamp,open,high,low,close,volume` header. Timestamps are
//! candle open times in epoch milliseconds (UTC).

use std::fs;
use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{Bar, Timeframe};
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe.label()))
    }

    fn read_all(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Bar>, TraderError> {
        let source_error = |reason: String| TraderError::DataSource {
            symbol: symbol.to_string(),
            timeframe: timeframe.label().to_string(),
            reason,
        };

        let path = self.csv_path(symbol, timeframe);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| source_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| source_error(format!("CSV parse error: {}", e)))?;

            let timestamp: i64 = record
                .get(0)
                .ok_or_else(|| source_error(format!("row {row}: missing timestamp column")))?
                .trim()
                .parse()
                .map_err(|e| source_error(format!("row {row}: invalid timestamp: {}", e)))?;

            let decimal = |idx: usize, name: &str| -> Result<Decimal, TraderError> {
                record
                    .get(idx)
                    .ok_or_else(|| source_error(format!("row {row}: missing {name} column")))?
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|e| source_error(format!("row {row}: invalid {name} value: {}", e)))
            };

            bars.push(Bar {
                timestamp,
                open: decimal(1, "open")?,
                high: decimal(2, "high")?,
                low: decimal(3, "low")?,
                close: decimal(4, "close")?,
                volume: decimal(5, "volume")?,
            });
        }

        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    /// Rows are returned in file order; the loader rejects out-of-order or
    /// duplicate rows rather than silently sorting them.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>, TraderError> {
        let mut bars = self.read_all(symbol, timeframe)?;
        bars.retain(|b| b.timestamp >= start_ms && b.timestamp <= end_ms);
        Ok(bars)
    }

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path)?;

        let suffix = format!("_{}.csv", timeframe.label());
        let mut symbols = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<(i64, i64, usize)>, TraderError> {
        if !self.csv_path(symbol, timeframe).exists() {
            return Ok(None);
        }
        let bars = self.read_all(symbol, timeframe)?;
        let first = bars.iter().map(|b| b.timestamp).min();
        let last = bars.iter().map(|b| b.timestamp).max();
        Ok(first.zip(last).map(|(f, l)| (f, l, bars.len())))
    }
}
