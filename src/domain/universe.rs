//! Symbol universe loading.
//!
//! Fetches every configured symbol on the run's three timeframes, checks
//! each series' integrity and computes indicators. Symbols without enough
//! history are skipped; integrity violations abort the run.

use tracing::{info, warn};

use crate::domain::backtest::Settings;
use crate::domain::error::TraderError;
use crate::domain::market_data::{SymbolData, TimeframeSeries};
use crate::domain::ohlcv::{Timeframe, validate_series};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData { timeframe: Timeframe },
    InsufficientBars { bars: usize, minimum: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct Universe {
    pub symbols: Vec<SymbolData>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Primary bars a symbol needs: the warm-up reservation plus one bar to
/// act on and one to fill at.
pub fn minimum_bars(settings: &Settings) -> usize {
    settings
        .backtest
        .timeframes
        .reserved_warmup(settings.indicators.max_window())
        + 2
}

pub fn load_universe(data_port: &dyn DataPort, settings: &Settings) -> Result<Universe, TraderError> {
    let (start_ms, end_ms) = settings.backtest.window_ms();
    let timeframes = settings.backtest.timeframes;
    let minimum = minimum_bars(settings);

    let mut symbols = Vec::new();
    let mut skipped = Vec::new();

    'symbols: for symbol in &settings.backtest.symbols {
        let mut series = Vec::with_capacity(3);
        for timeframe in timeframes.all() {
            let bars = data_port.fetch_bars(symbol, timeframe, start_ms, end_ms)?;
            if bars.is_empty() {
                warn!(%symbol, %timeframe, "no bars in window, skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::NoData { timeframe },
                });
                continue 'symbols;
            }
            validate_series(symbol, timeframe, &bars)?;
            series.push(TimeframeSeries::new(timeframe, bars, &settings.indicators));
        }

        let mut frames = series.into_iter();
        let (Some(primary), Some(mid), Some(coarse)) = (frames.next(), frames.next(), frames.next()) else {
            continue;
        };

        let bars = primary.bars.len();
        if bars < minimum {
            warn!(%symbol, bars, minimum, "not enough primary bars, skipping symbol");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientBars { bars, minimum },
            });
            continue;
        }

        info!(%symbol, primary_bars = bars, "loaded");
        symbols.push(SymbolData::new(symbol.clone(), primary, mid, coarse));
    }

    if symbols.is_empty() {
        let bars = skipped
            .iter()
            .filter_map(|s| match s.reason {
                SkipReason::InsufficientBars { bars, .. } => Some(bars),
                SkipReason::NoData { .. } => None,
            })
            .max()
            .unwrap_or(0);
        return Err(TraderError::InsufficientData {
            symbol: settings.backtest.symbols.join(","),
            bars,
            minimum,
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = symbols.len(),
            configured = settings.backtest.symbols.len(),
            "some symbols skipped"
        );
    }

    Ok(Universe { symbols, skipped })
}
