//! Position entity: one virtual trade, open or closed.

use crate::domain::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Why a position was closed. Set exactly once, at close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    SellSignal,
    Stoploss,
    Roi,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub instrument: String,
    pub open_price: f64,
    pub current_price: f64,
    /// Set exactly once, at close.
    pub close_price: Option<f64>,
    pub status: PositionStatus,
    /// Amount of the instrument held. Fixed at open, never mutated.
    pub size: f64,
    pub profit_percentage: f64,
    pub profit_absolute: f64,
    /// Running minimum of `profit_percentage` while open. Only defined
    /// once the position has been in loss at least once.
    pub worst_profit_percentage: Option<f64>,
    pub close_reason: Option<CloseReason>,
    /// Epoch milliseconds.
    pub opened_at: i64,
    pub closed_at: Option<i64>,
}

impl Position {
    pub fn open(tick: &Tick, size: f64) -> Self {
        Position {
            instrument: tick.instrument.clone(),
            open_price: tick.close,
            current_price: tick.close,
            close_price: None,
            status: PositionStatus::Open,
            size,
            profit_percentage: 0.0,
            profit_absolute: 0.0,
            worst_profit_percentage: None,
            close_reason: None,
            opened_at: tick.time,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Refresh the current price and derived profit figures for a new tick.
    pub fn update_stats(&mut self, tick: &Tick) {
        self.current_price = tick.close;
        self.profit_percentage = (tick.close - self.open_price) / self.open_price * 100.0;
        self.profit_absolute = self.size * self.current_price - self.size * self.open_price;
    }

    /// Fold the current profit into the per-position drawdown minimum.
    pub fn record_drawdown(&mut self) {
        match self.worst_profit_percentage {
            Some(worst) if worst <= self.profit_percentage => {}
            _ => self.worst_profit_percentage = Some(self.profit_percentage),
        }
    }

    /// Transition to Closed at the current price. A second call is a no-op:
    /// the status is checked so a position can never be closed twice.
    pub fn close(&mut self, reason: CloseReason, time: i64) {
        if self.status == PositionStatus::Closed {
            return;
        }
        self.status = PositionStatus::Closed;
        self.close_reason = Some(reason);
        self.close_price = Some(self.current_price);
        self.closed_at = Some(time);
    }

    /// size * current_price
    pub fn market_value(&self) -> f64 {
        self.size * self.current_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick(time: i64, close: f64) -> Tick {
        Tick {
            instrument: "BTC/USDT".into(),
            time,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn sample_position() -> Position {
        Position::open(&sample_tick(1_000, 100.0), 5.0)
    }

    #[test]
    fn open_initializes_prices_from_tick() {
        let pos = sample_position();
        assert_eq!(pos.instrument, "BTC/USDT");
        assert!(pos.is_open());
        assert!((pos.open_price - 100.0).abs() < f64::EPSILON);
        assert!((pos.current_price - 100.0).abs() < f64::EPSILON);
        assert!((pos.size - 5.0).abs() < f64::EPSILON);
        assert_eq!(pos.opened_at, 1_000);
        assert!(pos.close_price.is_none());
        assert!(pos.close_reason.is_none());
        assert!(pos.closed_at.is_none());
        assert!(pos.worst_profit_percentage.is_none());
    }

    #[test]
    fn update_stats_profit() {
        let mut pos = sample_position();
        pos.update_stats(&sample_tick(2_000, 110.0));
        assert!((pos.current_price - 110.0).abs() < f64::EPSILON);
        assert!((pos.profit_percentage - 10.0).abs() < f64::EPSILON);
        assert!((pos.profit_absolute - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn update_stats_loss() {
        let mut pos = sample_position();
        pos.update_stats(&sample_tick(2_000, 90.0));
        assert!((pos.profit_percentage - (-10.0)).abs() < f64::EPSILON);
        assert!((pos.profit_absolute - (-50.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn record_drawdown_tracks_minimum() {
        let mut pos = sample_position();
        pos.update_stats(&sample_tick(2_000, 95.0));
        pos.record_drawdown();
        assert_eq!(pos.worst_profit_percentage, Some(pos.profit_percentage));

        pos.update_stats(&sample_tick(3_000, 90.0));
        pos.record_drawdown();
        assert!((pos.worst_profit_percentage.unwrap() - (-10.0)).abs() < f64::EPSILON);

        // recovery does not raise the recorded minimum
        pos.update_stats(&sample_tick(4_000, 98.0));
        pos.record_drawdown();
        assert!((pos.worst_profit_percentage.unwrap() - (-10.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn close_sets_fields_once() {
        let mut pos = sample_position();
        pos.update_stats(&sample_tick(2_000, 112.0));
        pos.close(CloseReason::Roi, 2_000);

        assert_eq!(pos.status, PositionStatus::Closed);
        assert_eq!(pos.close_reason, Some(CloseReason::Roi));
        assert!((pos.close_price.unwrap() - 112.0).abs() < f64::EPSILON);
        assert_eq!(pos.closed_at, Some(2_000));
    }

    #[test]
    fn second_close_is_a_noop() {
        let mut pos = sample_position();
        pos.update_stats(&sample_tick(2_000, 112.0));
        pos.close(CloseReason::Roi, 2_000);

        pos.update_stats(&sample_tick(3_000, 80.0));
        pos.close(CloseReason::Stoploss, 3_000);

        assert_eq!(pos.close_reason, Some(CloseReason::Roi));
        assert!((pos.close_price.unwrap() - 112.0).abs() < f64::EPSILON);
        assert_eq!(pos.closed_at, Some(2_000));
    }

    #[test]
    fn market_value() {
        let mut pos = sample_position();
        pos.update_stats(&sample_tick(2_000, 104.0));
        assert!((pos.market_value() - 520.0).abs() < f64::EPSILON);
    }
}
