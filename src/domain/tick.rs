//! Tick price sample representation.

/// One timestamped OHLCV sample for a tradable instrument.
///
/// The engine only reads `instrument`, `time` and `close`; the remaining
/// fields are passed through untouched to the strategy.
#[derive(Debug, Clone)]
pub struct Tick {
    pub instrument: String,
    /// Epoch milliseconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Tick {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
