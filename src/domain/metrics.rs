//! Summary statistics over a finished run.

use crate::domain::backtest::BacktestResult;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub trades_closed: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub worst_trade_drawdown: f64,
    pub worst_streak_drawdown: f64,
    pub rejected_entries: usize,
}

impl Metrics {
    /// Trade-level statistics; profit figures come from the closed log,
    /// return from the capital ledger. Open positions at the end of a run
    /// are deliberately excluded.
    pub fn compute(result: &BacktestResult) -> Self {
        let total_return = if result.starting_capital > 0.0 {
            (result.final_capital - result.starting_capital) / result.starting_capital
        } else {
            0.0
        };

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut win_sum = 0.0;
        let mut loss_sum = 0.0;
        let mut largest_win = 0.0f64;
        let mut largest_loss = 0.0f64;

        for position in &result.closed_positions {
            let pnl = position.profit_absolute;
            if pnl > 0.0 {
                trades_won += 1;
                win_sum += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                loss_sum += pnl;
                largest_loss = largest_loss.min(pnl);
            } else {
                trades_breakeven += 1;
            }
        }

        let trades_closed = result.closed_positions.len();
        let win_rate = if trades_closed > 0 {
            trades_won as f64 / trades_closed as f64
        } else {
            0.0
        };
        let avg_win = if trades_won > 0 {
            win_sum / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            loss_sum / trades_lost as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            trades_closed,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            worst_trade_drawdown: result.worst_trade_drawdown,
            worst_streak_drawdown: result.worst_streak_drawdown,
            rejected_entries: result.rejected_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{CloseReason, Position};
    use crate::domain::tick::Tick;
    use std::collections::BTreeMap;

    fn closed_position(profit_absolute: f64, profit_percentage: f64) -> Position {
        let tick = Tick {
            instrument: "A/USDT".into(),
            time: 1_000,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1000.0,
        };
        let mut position = Position::open(&tick, 1.0);
        position.profit_absolute = profit_absolute;
        position.profit_percentage = profit_percentage;
        position.close(CloseReason::SellSignal, 2_000);
        position
    }

    fn sample_result(closed: Vec<Position>) -> BacktestResult {
        BacktestResult {
            starting_capital: 1000.0,
            final_capital: 1100.0,
            closed_positions: closed,
            capital_by_timestamp: BTreeMap::new(),
            unrealized_value_by_timestamp: BTreeMap::new(),
            worst_trade_drawdown: -4.0,
            worst_streak_drawdown: -6.0,
            rejected_entries: 2,
        }
    }

    #[test]
    fn total_return_from_ledger() {
        let metrics = Metrics::compute(&sample_result(vec![]));
        assert!((metrics.total_return - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn trade_tally() {
        let metrics = Metrics::compute(&sample_result(vec![
            closed_position(50.0, 5.0),
            closed_position(30.0, 3.0),
            closed_position(-20.0, -2.0),
            closed_position(0.0, 0.0),
        ]));

        assert_eq!(metrics.trades_closed, 4);
        assert_eq!(metrics.trades_won, 2);
        assert_eq!(metrics.trades_lost, 1);
        assert_eq!(metrics.trades_breakeven, 1);
        assert!((metrics.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((metrics.avg_win - 40.0).abs() < f64::EPSILON);
        assert!((metrics.avg_loss - (-20.0)).abs() < f64::EPSILON);
        assert!((metrics.largest_win - 50.0).abs() < f64::EPSILON);
        assert!((metrics.largest_loss - (-20.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn no_trades_gives_zeroed_stats() {
        let metrics = Metrics::compute(&sample_result(vec![]));
        assert_eq!(metrics.trades_closed, 0);
        assert!((metrics.win_rate - 0.0).abs() < f64::EPSILON);
        assert!((metrics.avg_win - 0.0).abs() < f64::EPSILON);
        assert!((metrics.avg_loss - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn drawdowns_carried_through() {
        let metrics = Metrics::compute(&sample_result(vec![]));
        assert!((metrics.worst_trade_drawdown - (-4.0)).abs() < f64::EPSILON);
        assert!((metrics.worst_streak_drawdown - (-6.0)).abs() < f64::EPSILON);
        assert_eq!(metrics.rejected_entries, 2);
    }
}
