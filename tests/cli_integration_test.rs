//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Loading settings from INI files on disk
//! - `validate` with valid, broken and missing config files
//! - `backtest` against CSV bar files in a temporary directory
//! - `info` listing symbols and data ranges
//! - Labels used in the per-trend summary

mod common;

use common::*;
use regimetrader::cli::{self, Cli, Command};
use regimetrader::domain::error::TraderError;
use rust_decimal_macros::dec;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect()
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_valid_file() {
        let file = write_temp_ini(VALID_INI);
        let settings = cli::load_config(&file.path().to_path_buf()).unwrap();

        assert_eq!(settings.backtest.initial_balance, dec!(10000));
        assert_eq!(settings.backtest.symbols, vec!["BTCUSDT".to_string()]);
        assert_eq!(settings.execution.leverage, dec!(10));
        assert_eq!(settings.risk.cooldown_period, 86400);
        assert_eq!(settings.indicators.bb_length, 5);
        assert_eq!(settings.indicators.max_window(), 8);
    }

    #[test]
    fn load_config_missing_file_is_parse_error() {
        let err = cli::load_config(&PathBuf::from("/nonexistent/regimetrader.ini")).unwrap_err();
        assert!(matches!(err, TraderError::ConfigParse { .. }));
    }

    #[test]
    fn load_config_reports_missing_key() {
        let content = VALID_INI.replace("leverage = 10\n", "");
        let file = write_temp_ini(&content);
        let err = cli::load_config(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, TraderError::ConfigMissing { .. }));
        assert!(err.to_string().contains("leverage"));
    }

    #[test]
    fn load_config_rejects_inverted_window() {
        let content = VALID_INI.replace("end_date = 2024-03-31", "end_date = 2023-12-01");
        let file = write_temp_ini(&content);
        let err = cli::load_config(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { .. }));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let file = write_temp_ini(VALID_INI);
        let code = cli::run(Cli {
            command: Command::Validate {
                config: file.path().to_path_buf(),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn missing_config_exits_with_two() {
        let code = cli::run(Cli {
            command: Command::Validate {
                config: PathBuf::from("/nonexistent/regimetrader.ini"),
            },
        });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn invalid_value_exits_with_two() {
        let content = VALID_INI.replace("leverage = 10", "leverage = -3");
        let file = write_temp_ini(&content);
        let code = cli::run(Cli {
            command: Command::Validate {
                config: file.path().to_path_buf(),
            },
        });
        assert_eq!(code, ExitCode::from(2));
    }
}

mod backtest_command {
    use super::*;

    #[test]
    fn writes_trade_log_and_equity_curve() {
        let data = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_csv_data(data.path(), "BTCUSDT", 400);
        let config = write_temp_ini(VALID_INI);

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: config.path().to_path_buf(),
                data: data.path().to_path_buf(),
                output: Some(output.path().to_path_buf()),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);

        let logs = files_with_prefix(output.path(), "trades_");
        assert_eq!(logs.len(), 1);
        assert!(logs[0].extension().is_some_and(|e| e == "jsonl"));
        for line in std::fs::read_to_string(&logs[0]).unwrap().lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["symbol"], "BTCUSDT");
        }

        let curves = files_with_prefix(output.path(), "equity_");
        assert_eq!(curves.len(), 1);
        let curve = std::fs::read_to_string(&curves[0]).unwrap();
        assert_eq!(curve.lines().next(), Some("timestamp,equity"));
        assert_eq!(curve.lines().count(), 1 + (400 - 1 - 193));
    }

    #[test]
    fn missing_data_exits_with_insufficient_data() {
        let data = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let config = write_temp_ini(VALID_INI);

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: config.path().to_path_buf(),
                data: data.path().to_path_buf(),
                output: Some(output.path().to_path_buf()),
            },
        });
        assert_eq!(code, ExitCode::from(5));
        assert!(files_with_prefix(output.path(), "trades_").is_empty());
    }

    #[test]
    fn short_history_is_skipped_when_another_symbol_loads() {
        let data = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_csv_data(data.path(), "BTCUSDT", 400);
        write_csv_data(data.path(), "ETHUSDT", 50);
        let content = VALID_INI.replace("symbol_list = BTCUSDT", "symbol_list = BTCUSDT,ETHUSDT");
        let config = write_temp_ini(&content);

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: config.path().to_path_buf(),
                data: data.path().to_path_buf(),
                output: Some(output.path().to_path_buf()),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(files_with_prefix(output.path(), "trades_").len(), 1);
    }

    #[test]
    fn malformed_csv_exits_with_data_error() {
        let data = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_csv_data(data.path(), "BTCUSDT", 400);
        std::fs::write(
            data.path().join("BTCUSDT_1h.csv"),
            "timestamp,open,high,low,close,volume\n1704067200000,abc,1,1,1,1\n",
        )
        .unwrap();
        let config = write_temp_ini(VALID_INI);

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: config.path().to_path_buf(),
                data: data.path().to_path_buf(),
                output: Some(output.path().to_path_buf()),
            },
        });
        assert_eq!(code, ExitCode::from(3));
    }
}

mod summary_labels {
    use super::*;
    use regimetrader::domain::regime::TrendLabel;

    #[test]
    fn trend_label_joins_regime_and_strategy() {
        let trend = [TrendLabel::Long, TrendLabel::Short, TrendLabel::Sideway];
        assert_eq!(cli::trend_label(&trend, "trend_long"), "long/short/sideway trend_long");
    }
}

mod info_command {
    use super::*;

    #[test]
    fn lists_symbols() {
        let data = TempDir::new().unwrap();
        write_csv_data(data.path(), "BTCUSDT", 30);
        let code = cli::run(Cli {
            command: Command::Info {
                data: data.path().to_path_buf(),
                symbol: None,
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn shows_ranges_for_symbol() {
        let data = TempDir::new().unwrap();
        write_csv_data(data.path(), "BTCUSDT", 30);
        let code = cli::run(Cli {
            command: Command::Info {
                data: data.path().to_path_buf(),
                symbol: Some("btcusdt".into()),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let data = TempDir::new().unwrap();
        let code = cli::run(Cli {
            command: Command::Info {
                data: data.path().to_path_buf(),
                symbol: None,
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }
}
