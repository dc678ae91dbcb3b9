//! Trade log and equity curve writer.
//!
//! Each run produces `trades_<stamp>.jsonl` (one closed trade per line) and
//! `equity_<stamp>.csv` in the output directory. Files are created fresh;
//! an existing file with the same name is an error, never overwritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::ports::report_port::ReportPort;

pub struct TradeLogAdapter {
    output_dir: PathBuf,
    stamp: String,
}

impl TradeLogAdapter {
    /// Name files after the wall-clock time the run started.
    pub fn new(output_dir: PathBuf) -> Self {
        Self::with_run_time(output_dir, Utc::now())
    }

    pub fn with_run_time(output_dir: PathBuf, run_time: DateTime<Utc>) -> Self {
        Self {
            output_dir,
            stamp: run_time.format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    pub fn trade_log_path(&self) -> PathBuf {
        self.output_dir.join(format!("trades_{}.jsonl", self.stamp))
    }

    pub fn equity_path(&self) -> PathBuf {
        self.output_dir.join(format!("equity_{}.csv", self.stamp))
    }

    fn create(path: &Path) -> Result<File, TraderError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| TraderError::TradeLog {
                reason: format!("cannot create {}: {}", path.display(), e),
            })
    }

    fn write_trades(&self, result: &BacktestResult) -> Result<PathBuf, TraderError> {
        let path = self.trade_log_path();
        let mut out = BufWriter::new(Self::create(&path)?);
        for trade in &result.trades {
            let line = serde_json::to_string(trade).map_err(|e| TraderError::TradeLog {
                reason: format!("failed to serialize trade: {e}"),
            })?;
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(path)
    }

    fn write_equity(&self, result: &BacktestResult) -> Result<PathBuf, TraderError> {
        let path = self.equity_path();
        let mut writer = csv::Writer::from_writer(Self::create(&path)?);
        for point in &result.equity_curve {
            writer.serialize(point).map_err(|e| TraderError::TradeLog {
                reason: format!("failed to write equity row: {e}"),
            })?;
        }
        writer.flush()?;
        Ok(path)
    }
}

impl ReportPort for TradeLogAdapter {
    fn write(&self, result: &BacktestResult) -> Result<String, TraderError> {
        fs::create_dir_all(&self.output_dir)?;
        let trades = self.write_trades(result)?;
        let equity = self.write_equity(result)?;
        info!(
            trades = result.trades.len(),
            trade_log = %trades.display(),
            equity = %equity.display(),
            "run output written"
        );
        Ok(trades.display().to_string())
    }
}
