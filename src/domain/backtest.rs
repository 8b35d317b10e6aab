//! Backtest parameters and the replay loop.

use std::collections::BTreeMap;

use crate::domain::engine::Engine;
use crate::domain::error::TicksimError;
use crate::domain::feed::MarketData;
use crate::domain::position::Position;
use crate::ports::strategy_port::StrategyPort;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub starting_capital: f64,
    /// Fraction of every spend/earn lost to fees, in [0, 1).
    pub fee_fraction: f64,
    pub max_open_positions: usize,
    /// Take-profit threshold, percentage, positive.
    pub roi_threshold: f64,
    /// Stoploss threshold, percentage, negative.
    pub stoploss_threshold: f64,
}

impl BacktestConfig {
    /// Startup invariants. A config that fails here must never reach the
    /// engine; there are no silent defaults.
    pub fn validate(&self) -> Result<(), TicksimError> {
        if !(self.starting_capital.is_finite() && self.starting_capital > 0.0) {
            return Err(invalid(
                "starting_capital",
                "starting_capital must be a positive number",
            ));
        }
        if !(self.fee_fraction.is_finite() && (0.0..1.0).contains(&self.fee_fraction)) {
            return Err(invalid("fee_fraction", "fee_fraction must be in [0, 1)"));
        }
        if self.max_open_positions < 1 {
            return Err(invalid(
                "max_open_positions",
                "max_open_positions must be at least 1",
            ));
        }
        if !(self.roi_threshold.is_finite() && self.roi_threshold > 0.0) {
            return Err(invalid(
                "roi_threshold",
                "roi_threshold must be a positive percentage",
            ));
        }
        if !(self.stoploss_threshold.is_finite() && self.stoploss_threshold < 0.0) {
            return Err(invalid(
                "stoploss_threshold",
                "stoploss_threshold must be a negative percentage",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> TicksimError {
    TicksimError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Everything a run produces, suitable for reporting and export.
///
/// The equity curve reconstructs as
/// `capital_by_timestamp[t] + unrealized_value_by_timestamp[t]`.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub starting_capital: f64,
    pub final_capital: f64,
    pub closed_positions: Vec<Position>,
    pub capital_by_timestamp: BTreeMap<i64, f64>,
    pub unrealized_value_by_timestamp: BTreeMap<i64, f64>,
    pub worst_trade_drawdown: f64,
    pub worst_streak_drawdown: f64,
    pub rejected_entries: usize,
}

impl BacktestResult {
    pub fn equity_at(&self, time: i64) -> f64 {
        let capital = self.capital_by_timestamp.get(&time).copied().unwrap_or(0.0);
        let unrealized = self
            .unrealized_value_by_timestamp
            .get(&time)
            .copied()
            .unwrap_or(0.0);
        capital + unrealized
    }
}

/// Replay every tick in feed order through a freshly built engine.
///
/// Each call owns an independent engine, so concurrent runs (parameter
/// sweeps) never share state.
pub fn run_backtest(
    data: &MarketData,
    config: &BacktestConfig,
    strategy: Box<dyn StrategyPort>,
) -> Result<BacktestResult, TicksimError> {
    let mut engine = Engine::new(config, strategy)?;

    for step in data.replay_order() {
        let Some(ticks) = data.ticks(&step.instrument) else {
            continue;
        };
        let tick = &ticks[step.index];
        engine.process_tick(tick, &ticks[..=step.index]);
    }

    let (
        final_capital,
        closed_positions,
        capital_by_timestamp,
        unrealized_value_by_timestamp,
        worst_trade_drawdown,
        worst_streak_drawdown,
        rejected_entries,
    ) = engine.into_parts();

    Ok(BacktestResult {
        starting_capital: config.starting_capital,
        final_capital,
        closed_positions,
        capital_by_timestamp,
        unrealized_value_by_timestamp,
        worst_trade_drawdown,
        worst_streak_drawdown,
        rejected_entries,
    })
}
