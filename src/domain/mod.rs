//! Core domain types and logic.

pub mod tick;
pub mod position;
pub mod engine;
pub mod feed;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
