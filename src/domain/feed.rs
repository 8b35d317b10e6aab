//! Per-instrument tick series and the deterministic replay order.

use std::collections::BTreeMap;

use crate::domain::error::TicksimError;
use crate::domain::tick::Tick;

/// One step of a replay: which instrument's series, and the index into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub instrument: String,
    pub index: usize,
}

/// All tick history for one simulation run, keyed by instrument.
///
/// Each series must be in non-decreasing time order; this is validated on
/// insert so the replay contract holds for the whole run.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: BTreeMap<String, Vec<Tick>>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: &str, ticks: Vec<Tick>) -> Result<(), TicksimError> {
        if let Some(w) = ticks.windows(2).find(|w| w[0].time > w[1].time) {
            return Err(TicksimError::Data {
                reason: format!(
                    "ticks for {} out of order: {} after {}",
                    instrument, w[1].time, w[0].time
                ),
            });
        }
        self.series.insert(instrument.to_string(), ticks);
        Ok(())
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn ticks(&self, instrument: &str) -> Option<&[Tick]> {
        self.series.get(instrument).map(Vec::as_slice)
    }

    pub fn tick_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tick_count() == 0
    }

    /// The fixed cross-instrument processing order: ascending by
    /// `(time, instrument)`. Ties on timestamp resolve lexicographically,
    /// so replays of the same data are reproducible.
    pub fn replay_order(&self) -> Vec<ReplayStep> {
        let mut steps: Vec<(i64, ReplayStep)> = self
            .series
            .iter()
            .flat_map(|(instrument, ticks)| {
                ticks.iter().enumerate().map(|(index, tick)| {
                    (
                        tick.time,
                        ReplayStep {
                            instrument: instrument.clone(),
                            index,
                        },
                    )
                })
            })
            .collect();
        steps.sort_by(|a, b| (a.0, &a.1.instrument).cmp(&(b.0, &b.1.instrument)));
        steps.into_iter().map(|(_, step)| step).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tick(instrument: &str, time: i64, close: f64) -> Tick {
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

    #[test]
    fn insert_rejects_out_of_order_ticks() {
        let mut data = MarketData::new();
        let err = data.insert(
            "A/USDT",
            vec![make_tick("A/USDT", 2_000, 100.0), make_tick("A/USDT", 1_000, 99.0)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn insert_accepts_equal_timestamps() {
        let mut data = MarketData::new();
        let ok = data.insert(
            "A/USDT",
            vec![make_tick("A/USDT", 1_000, 100.0), make_tick("A/USDT", 1_000, 101.0)],
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn replay_order_merges_by_time_then_instrument() {
        let mut data = MarketData::new();
        data.insert(
            "B/USDT",
            vec![make_tick("B/USDT", 1_000, 50.0), make_tick("B/USDT", 3_000, 51.0)],
        )
        .unwrap();
        data.insert(
            "A/USDT",
            vec![make_tick("A/USDT", 1_000, 100.0), make_tick("A/USDT", 2_000, 101.0)],
        )
        .unwrap();

        let order = data.replay_order();
        let got: Vec<(&str, usize)> = order
            .iter()
            .map(|s| (s.instrument.as_str(), s.index))
            .collect();

        // shared timestamp 1_000 resolves lexicographically: A before B
        assert_eq!(
            got,
            vec![("A/USDT", 0), ("B/USDT", 0), ("A/USDT", 1), ("B/USDT", 1)]
        );
    }

    #[test]
    fn tick_count_sums_all_series() {
        let mut data = MarketData::new();
        assert!(data.is_empty());
        data.insert("A/USDT", vec![make_tick("A/USDT", 1_000, 100.0)])
            .unwrap();
        data.insert(
            "B/USDT",
            vec![make_tick("B/USDT", 1_000, 50.0), make_tick("B/USDT", 2_000, 51.0)],
        )
        .unwrap();
        assert_eq!(data.tick_count(), 3);
        assert!(!data.is_empty());
    }
}
