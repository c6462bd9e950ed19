//! Core domain types and logic.

pub mod ohlcv;
pub mod timeframe;
pub mod indicator;
pub mod indicator_helpers;
pub mod indicator_set;
pub mod signal;
pub mod position;
pub mod sizing;
pub mod execution;
pub mod metrics;
pub mod backtest;
pub mod cancel;
pub mod config_validation;
pub mod error;
