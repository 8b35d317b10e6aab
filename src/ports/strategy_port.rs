//! Strategy port: buy/sell signal generation, consumed by the engine.

use std::collections::HashMap;

use crate::domain::position::Position;
use crate::domain::tick::Tick;

/// Named indicator values produced by a strategy. Opaque to the engine; it
/// only carries the bag from `compute_indicators` to the decision calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indicators {
    values: HashMap<String, f64>,
}

impl Indicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// A strategy is a pure, synchronous function of the data handed to it:
/// given the full tick history it produces indicators, and from those the
/// buy/sell decisions. Implementations live behind this trait and are
/// resolved from configuration, never hard-wired into the engine.
pub trait StrategyPort: std::fmt::Debug {
    fn compute_indicators(&self, history: &[Tick], current: &Tick) -> Indicators;

    fn should_buy(&self, indicators: &Indicators, current: &Tick) -> bool;

    fn should_sell(&self, indicators: &Indicators, current: &Tick, position: &Position) -> bool;
}
