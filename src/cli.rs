//! CLI definition and dispatch.

use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::simulated_order_book::SimulatedOrderBook;
use crate::adapters::trade_log_adapter::TradeLogAdapter;
use crate::domain::backtest::{BacktestResult, Settings};
use crate::domain::config_validation::load_settings;
use crate::domain::engine::Engine;
use crate::domain::error::TraderError;
use crate::domain::metrics::{Metrics, TradeStats};
use crate::domain::ohlcv::Timeframe;
use crate::domain::regime::TrendCombination;
use crate::domain::universe::load_universe;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "regimetrader", about = "Regime-switching multi-timeframe futures backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding `{SYMBOL}_{timeframe}.csv` bar files
        #[arg(short, long)]
        data: PathBuf,
        /// Directory for the trade log and equity curve
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range available for a symbol, or list symbols
    Info {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            output,
        } => run_backtest(&config, data, output),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data, symbol } => run_info(data, symbol.as_deref()),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<Settings, TraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    load_settings(&adapter)
}

fn run_backtest(config_path: &PathBuf, data_dir: PathBuf, output_dir: Option<PathBuf>) -> Result<(), TraderError> {
    let settings = load_config(config_path)?;
    let bt = &settings.backtest;

    eprintln!(
        "Loading {} symbols from {} ({} to {})",
        bt.symbols.len(),
        data_dir.display(),
        bt.start_date,
        bt.end_date
    );
    let data_port = CsvAdapter::new(data_dir);
    let universe = load_universe(&data_port, &settings)?;
    for skipped in &universe.skipped {
        eprintln!("  skipped {}: {:?}", skipped.symbol, skipped.reason);
    }

    let order_book = SimulatedOrderBook;
    let engine = Engine::new(&settings, &order_book);
    eprintln!(
        "Running backtest: {} symbols, {} warm-up bars",
        universe.symbols.len(),
        engine.reserved_warmup()
    );
    let result = engine.run(&universe.symbols)?;

    let metrics = Metrics::compute(&result, bt.risk_free_rate, bt.timeframes.primary);
    print_summary(&result, &metrics);

    let writer = TradeLogAdapter::new(output_dir.unwrap_or_else(|| PathBuf::from(".")));
    let path = writer.write(&result)?;
    eprintln!("\nTrade log written to: {path}");
    Ok(())
}

fn print_stats_line(label: &str, stats: &TradeStats) {
    let pnl_sign = if stats.total_pnl >= 0.0 { "+" } else { "" };
    eprintln!(
        "  {}:  {} trades, {:.1}% win rate, {}{:.2}",
        label,
        stats.trades,
        stats.win_rate * 100.0,
        pnl_sign,
        stats.total_pnl,
    );
}

fn print_summary(result: &BacktestResult, metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    if result.halted {
        eprintln!("Run halted early: equity exhausted");
    }
    eprintln!("Bars Processed:   {}", result.bars_processed);
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.overall.trades);
    eprintln!("Win Rate:         {:.1}%", metrics.overall.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.overall.profit_factor);
    eprintln!("Avg Holding:      {:.1}h", metrics.overall.avg_holding_hours);
    eprintln!("Commissions:      {:.2}", metrics.total_commissions);
    if !result.open_positions.is_empty() {
        eprintln!("Open Positions:   {}", result.open_positions.len());
    }

    if !metrics.by_symbol.is_empty() {
        eprintln!("\n=== Per-Symbol Summary ===");
        for (symbol, stats) in &metrics.by_symbol {
            print_stats_line(symbol, stats);
        }
    }
    if !metrics.by_strategy.is_empty() {
        eprintln!("\n=== Per-Strategy Summary ===");
        for (strategy, stats) in &metrics.by_strategy {
            print_stats_line(strategy, stats);
        }
    }
    if !metrics.by_trend.is_empty() {
        eprintln!("\n=== Per-Trend Summary ===");
        for ((trend, strategy), stats) in &metrics.by_trend {
            print_stats_line(&trend_label(trend, strategy), stats);
        }
    }
}

/// `primary/mid/coarse strategy`, e.g. `long/short/sideway trend_long`.
pub fn trend_label(trend: &TrendCombination, strategy: &str) -> String {
    format!("{}/{}/{} {}", trend[0], trend[1], trend[2], strategy)
}

fn run_validate(config_path: &PathBuf) -> Result<(), TraderError> {
    let settings = load_config(config_path)?;
    let bt = &settings.backtest;

    eprintln!("\nBacktest:");
    eprintln!("  symbols:   {}", bt.symbols.join(", "));
    eprintln!("  window:    {} to {}", bt.start_date, bt.end_date);
    eprintln!(
        "  timeframes: {} / {} / {}",
        bt.timeframes.primary, bt.timeframes.mid, bt.timeframes.coarse
    );
    eprintln!("  leverage:  {}", settings.execution.leverage);
    eprintln!(
        "  warm-up:   {} primary bars",
        bt.timeframes.reserved_warmup(settings.indicators.max_window())
    );

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn format_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn run_info(data_dir: PathBuf, symbol: Option<&str>) -> Result<(), TraderError> {
    let adapter = CsvAdapter::new(data_dir);

    let Some(symbol) = symbol else {
        let symbols = adapter.list_symbols(Timeframe::H1)?;
        if symbols.is_empty() {
            eprintln!("No symbols found");
        } else {
            for s in &symbols {
                println!("{s}");
            }
            eprintln!("{} symbols found", symbols.len());
        }
        return Ok(());
    };

    let symbol = symbol.to_uppercase();
    for timeframe in [Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1] {
        match adapter.get_data_range(&symbol, timeframe)? {
            Some((first, last, count)) => println!(
                "{} {}: {} bars, {} to {}",
                symbol,
                timeframe,
                count,
                format_ms(first),
                format_ms(last)
            ),
            None => eprintln!("{} {}: no data found", symbol, timeframe),
        }
    }
    Ok(())
}
