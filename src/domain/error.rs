//! Domain error types.
//!
//! [`TraderError`] covers the run-terminating failures (configuration and
//! data integrity). Position-level failures are separate, recoverable enums:
//! the engine logs them and treats the action as not having happened.

/// Top-level error type for regimetrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data integrity violation for {symbol} {timeframe}: {reason}")]
    DataIntegrity {
        symbol: String,
        timeframe: String,
        reason: String,
    },

    #[error("failed to read bars for {symbol} {timeframe}: {reason}")]
    DataSource {
        symbol: String,
        timeframe: String,
        reason: String,
    },

    #[error("no data for {symbol} {timeframe}")]
    NoData { symbol: String, timeframe: String },

    #[error("insufficient data for {symbol}: have {bars} primary bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("trade log error: {reason}")]
    TradeLog { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub fn config_missing(section: &str, key: &str) -> Self {
        TraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::DataIntegrity { .. } | TraderError::DataSource { .. } => 3,
            TraderError::TradeLog { .. } => 4,
            TraderError::NoData { .. } | TraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Why an open request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    #[error("position already open for {symbol}")]
    AlreadyOpen { symbol: String },

    #[error("insufficient funds for {symbol}: need {required}, equity {equity}")]
    InsufficientFunds {
        symbol: String,
        required: String,
        equity: String,
    },

    #[error("invalid amount for {symbol}: {amount}")]
    InvalidAmount { symbol: String, amount: String },

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

/// Why a close request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloseError {
    #[error("no open position for {symbol}")]
    NotFound { symbol: String },
}

/// A numeric check that could not be evaluated. Callers treat it as the
/// blocking outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputationError {
    #[error("division by zero computing {what}")]
    DivisionByZero { what: &'static str },

    #[error("{what} is not available at bar {index}")]
    MissingValue { what: &'static str, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn config_errors_exit_with_two() {
        let err = TraderError::config_missing("backtest", "leverage");
        assert_eq!(ExitCode::from(&err), ExitCode::from(2));
        assert_eq!(err.to_string(), "missing config key [backtest] leverage");
    }

    #[test]
    fn data_integrity_exit_code() {
        let err = TraderError::DataIntegrity {
            symbol: "BTCUSDT".into(),
            timeframe: "1h".into(),
            reason: "gap".into(),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::from(3));
    }

    #[test]
    fn open_error_display() {
        let err = OpenError::AlreadyOpen {
            symbol: "ETHUSDT".into(),
        };
        assert_eq!(err.to_string(), "position already open for ETHUSDT");
    }
}
