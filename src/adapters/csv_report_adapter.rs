//! CSV result export adapter.
//!
//! Writes two files into the output directory:
//! - `equity.csv`: one row per snapshot timestamp with capital, unrealized
//!   position value and their sum (the equity curve).
//! - `trades.csv`: one row per closed position, in close order.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TicksimError;
use crate::domain::position::{CloseReason, Position};
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn format_utc(time: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(time) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => String::new(),
    }
}

fn reason_label(reason: Option<CloseReason>) -> &'static str {
    match reason {
        Some(CloseReason::SellSignal) => "sell_signal",
        Some(CloseReason::Stoploss) => "stoploss",
        Some(CloseReason::Roi) => "roi",
        None => "",
    }
}

fn report_error(context: &str, err: impl std::fmt::Display) -> TicksimError {
    TicksimError::Report {
        reason: format!("{context}: {err}"),
    }
}

fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), TicksimError> {
    let mut wtr =
        csv::Writer::from_path(path).map_err(|e| report_error("failed to create equity.csv", e))?;
    wtr.write_record(["time", "utc", "capital", "unrealized_value", "equity"])
        .map_err(|e| report_error("failed to write equity.csv", e))?;

    for (&time, &capital) in &result.capital_by_timestamp {
        let unrealized = result
            .unrealized_value_by_timestamp
            .get(&time)
            .copied()
            .unwrap_or(0.0);
        wtr.write_record([
            time.to_string(),
            format_utc(time),
            capital.to_string(),
            unrealized.to_string(),
            (capital + unrealized).to_string(),
        ])
        .map_err(|e| report_error("failed to write equity.csv", e))?;
    }
    wtr.flush()
        .map_err(|e| report_error("failed to flush equity.csv", e))
}

fn write_trades(positions: &[Position], path: &Path) -> Result<(), TicksimError> {
    let mut wtr =
        csv::Writer::from_path(path).map_err(|e| report_error("failed to create trades.csv", e))?;
    wtr.write_record([
        "instrument",
        "opened_at",
        "closed_at",
        "open_price",
        "close_price",
        "size",
        "profit_absolute",
        "profit_percentage",
        "worst_profit_percentage",
        "close_reason",
    ])
    .map_err(|e| report_error("failed to write trades.csv", e))?;

    for position in positions {
        wtr.write_record([
            position.instrument.clone(),
            format_utc(position.opened_at),
            position.closed_at.map(format_utc).unwrap_or_default(),
            position.open_price.to_string(),
            position
                .close_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            position.size.to_string(),
            position.profit_absolute.to_string(),
            position.profit_percentage.to_string(),
            position
                .worst_profit_percentage
                .map(|p| p.to_string())
                .unwrap_or_default(),
            reason_label(position.close_reason).to_string(),
        ])
        .map_err(|e| report_error("failed to write trades.csv", e))?;
    }
    wtr.flush()
        .map_err(|e| report_error("failed to flush trades.csv", e))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), TicksimError> {
        fs::create_dir_all(output_dir)?;
        write_equity(result, &output_dir.join("equity.csv"))?;
        write_trades(&result.closed_positions, &output_dir.join("trades.csv"))
    }
}
