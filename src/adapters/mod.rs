//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod simulated_order_book;
pub mod trade_log_adapter;
