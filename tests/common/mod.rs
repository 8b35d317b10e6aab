#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use ticksim::domain::backtest::BacktestConfig;
use ticksim::domain::error::TicksimError;
use ticksim::domain::position::Position;
use ticksim::domain::tick::Tick;
use ticksim::ports::data_port::DataPort;
use ticksim::ports::strategy_port::{Indicators, StrategyPort};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Tick>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_ticks(mut self, instrument: &str, ticks: Vec<Tick>) -> Self {
        self.data.insert(instrument.to_string(), ticks);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ticks(&self, instrument: &str) -> Result<Vec<Tick>, TicksimError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(TicksimError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(instrument) {
            Some(ticks) => Ok(ticks.clone()),
            None => Err(TicksimError::NoData {
                instrument: instrument.to_string(),
            }),
        }
    }

    fn list_instruments(&self) -> Result<Vec<String>, TicksimError> {
        let mut instruments: Vec<String> = self.data.keys().cloned().collect();
        instruments.sort();
        Ok(instruments)
    }
}

/// Strategy scripted on exact tick timestamps, for deterministic tests.
#[derive(Debug)]
pub struct ScriptedStrategy {
    pub buy_times: HashSet<i64>,
    pub sell_times: HashSet<i64>,
}

impl ScriptedStrategy {
    pub fn new(buy_times: &[i64], sell_times: &[i64]) -> Self {
        Self {
            buy_times: buy_times.iter().copied().collect(),
            sell_times: sell_times.iter().copied().collect(),
        }
    }

    pub fn buy_and_hold() -> Self {
        Self {
            buy_times: HashSet::new(),
            sell_times: HashSet::new(),
        }
    }
}

impl StrategyPort for ScriptedStrategy {
    fn compute_indicators(&self, _history: &[Tick], _current: &Tick) -> Indicators {
        Indicators::new()
    }

    fn should_buy(&self, _indicators: &Indicators, current: &Tick) -> bool {
        self.buy_times.contains(&current.time)
    }

    fn should_sell(&self, _indicators: &Indicators, current: &Tick, _position: &Position) -> bool {
        self.sell_times.contains(&current.time)
    }
}

pub fn make_tick(instrument: &str, time: i64, close: f64) -> Tick {
    Tick {
        instrument: instrument.to_string(),
        time,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        starting_capital: 1000.0,
        fee_fraction: 0.001,
        max_open_positions: 2,
        roi_threshold: 10.0,
        stoploss_threshold: -5.0,
    }
}
