//! Core domain types and logic.

pub mod account;
pub mod backtest;
pub mod broker;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod indicator_set;
pub mod market_data;
pub mod metrics;
pub mod money;
pub mod ohlcv;
pub mod position;
pub mod regime;
pub mod risk;
pub mod signals;
pub mod sizing;
pub mod strategy;
pub mod universe;
