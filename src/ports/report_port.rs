//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TicksimError;

/// Port for exporting the produced artifacts of a run (closed trade log,
/// equity curve) for external reporting.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), TicksimError>;
}
