//! Configuration validation and construction.
//!
//! All recognized config values are checked up front; a simulation never
//! starts on a bad or silently-defaulted parameter.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TicksimError;
use crate::ports::config_port::ConfigPort;

/// Build a [`BacktestConfig`] from `[backtest]`, enforcing presence and the
/// range invariants in one pass.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TicksimError> {
    let built = BacktestConfig {
        starting_capital: require_double(config, "backtest", "starting_capital")?,
        fee_fraction: require_double(config, "backtest", "fee_fraction")?,
        max_open_positions: require_positive_int(config, "backtest", "max_open_positions")?,
        roi_threshold: require_double(config, "backtest", "roi_threshold")?,
        stoploss_threshold: require_double(config, "backtest", "stoploss_threshold")?,
    };
    built.validate()?;
    Ok(built)
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TicksimError> {
    build_backtest_config(config).map(|_| ())
}

/// The `[backtest] instruments` list, comma-separated, order preserved.
pub fn parse_instruments(config: &dyn ConfigPort) -> Result<Vec<String>, TicksimError> {
    let raw = config
        .get_string("backtest", "instruments")
        .ok_or_else(|| TicksimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "instruments".to_string(),
        })?;

    let instruments: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if instruments.is_empty() {
        return Err(TicksimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "instruments".to_string(),
            reason: "at least one instrument is required".to_string(),
        });
    }
    Ok(instruments)
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TicksimError> {
    match config.get_string("strategy", "name") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(TicksimError::ConfigMissing {
            section: "strategy".to_string(),
            key: "name".to_string(),
        }),
    }
}

fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, TicksimError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(TicksimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn require_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, TicksimError> {
    let raw = require_string(config, section, key)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| TicksimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("not a number: {raw}"),
        })
}

fn require_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<usize, TicksimError> {
    let raw = require_string(config, section, key)?;
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 1 => Ok(v as usize),
        Ok(_) => Err(TicksimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be at least 1"),
        }),
        Err(_) => Err(TicksimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("not an integer: {raw}"),
        }),
    }
}
