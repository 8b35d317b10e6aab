//! Rate-of-change momentum strategy.
//!
//! Buys when the close has risen over the last `lookback` ticks, sells an
//! open position when it has fallen over the last `sell_lookback` ticks.
//! ROC(n) = ((C[i] - C[i-n]) / C[i-n]) * 100; undefined until n ticks of
//! history exist, in which case no signal fires.

use crate::domain::position::Position;
use crate::domain::tick::Tick;
use crate::ports::config_port::ConfigPort;
use crate::ports::strategy_port::{Indicators, StrategyPort};

const DEFAULT_LOOKBACK: i64 = 5;
const DEFAULT_SELL_LOOKBACK: i64 = 3;

#[derive(Debug)]
pub struct MomentumStrategy {
    lookback: usize,
    sell_lookback: usize,
}

impl MomentumStrategy {
    pub fn new(lookback: usize, sell_lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
            sell_lookback: sell_lookback.max(1),
        }
    }

    /// `[strategy] lookback` and `[strategy] sell_lookback`, with defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self::new(
            config.get_int("strategy", "lookback", DEFAULT_LOOKBACK).max(1) as usize,
            config
                .get_int("strategy", "sell_lookback", DEFAULT_SELL_LOOKBACK)
                .max(1) as usize,
        )
    }
}

fn roc(history: &[Tick], current: &Tick, period: usize) -> Option<f64> {
    // history includes the current tick as its last element
    if history.len() <= period {
        return None;
    }
    let prev_close = history[history.len() - 1 - period].close;
    if prev_close == 0.0 {
        return Some(0.0);
    }
    Some((current.close - prev_close) / prev_close * 100.0)
}

impl StrategyPort for MomentumStrategy {
    fn compute_indicators(&self, history: &[Tick], current: &Tick) -> Indicators {
        let mut indicators = Indicators::new();
        if let Some(value) = roc(history, current, self.lookback) {
            indicators.set("roc_buy", value);
        }
        if let Some(value) = roc(history, current, self.sell_lookback) {
            indicators.set("roc_sell", value);
        }
        indicators
    }

    fn should_buy(&self, indicators: &Indicators, _current: &Tick) -> bool {
        indicators.get("roc_buy").is_some_and(|roc| roc > 0.0)
    }

    fn should_sell(
        &self,
        indicators: &Indicators,
        _current: &Tick,
        _position: &Position,
    ) -> bool {
        indicators.get("roc_sell").is_some_and(|roc| roc < 0.0)
    }
}
