//! Historical market data preparation.
//!
//! Turns a closing-price table supplied by an external market-data source into
//! the log-return matrix and day-0 prices the risk pipeline consumes.

mod history;

pub use history::PriceHistory;
