//! Core domain types and logic.

pub mod account;
pub mod alignment;
pub mod backtest;
pub mod config_builder;
pub mod entry;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod pipeline;
pub mod position;
pub mod sweep;
