//! Port traits the domain talks to.

pub mod config_port;
pub mod data_port;
pub mod order_book_port;
pub mod report_port;
