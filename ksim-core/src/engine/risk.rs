//! Risk engine: validated SL/TP mutation and the per-bar risk pass.

use crate::domain::{CloseReason, Direction, Event, PositionId};
use crate::engine::state::SimulationState;
use crate::error::EngineError;

impl SimulationState {
    /// Set a position's stop-loss and take-profit (0.0 clears either).
    ///
    /// Validated, never clamped: the stop must not sit beyond the liquidation
    /// price on the losing side, the take-profit must sit beyond the open
    /// price on the winning side. A rejected call stores nothing.
    pub fn set_exits(
        &mut self,
        id: PositionId,
        stop_loss: f64,
        take_profit: f64,
    ) -> Result<(), EngineError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(EngineError::PositionNotFound(id))?;
        let pos = &self.positions[index];

        if stop_loss < 0.0 || take_profit < 0.0 {
            return Err(EngineError::InvalidStopOrTakeProfit(
                "prices must be zero (unset) or positive".into(),
            ));
        }

        let direction = pos.direction();
        let liq = pos.liquidation_price;
        if stop_loss > 0.0 && pos.mode.is_margin() && liq > 0.0 {
            let beyond_liq = match direction {
                Direction::Long => stop_loss <= liq,
                Direction::Short => stop_loss >= liq,
            };
            if beyond_liq {
                return Err(EngineError::InvalidStopOrTakeProfit(format!(
                    "{direction} stop-loss {stop_loss:.2} sits beyond the liquidation price {liq:.2}"
                )));
            }
        }
        if take_profit > 0.0 {
            let not_winning = match direction {
                Direction::Long => take_profit <= pos.unit_price,
                Direction::Short => take_profit >= pos.unit_price,
            };
            if not_winning {
                return Err(EngineError::InvalidStopOrTakeProfit(format!(
                    "{direction} take-profit {take_profit:.2} must sit beyond the open price {:.2}",
                    pos.unit_price
                )));
            }
        }

        let pos = &mut self.positions[index];
        pos.stop_loss = stop_loss;
        pos.take_profit = take_profit;
        self.push_event(Event::ExitsUpdated {
            id,
            stop_loss,
            take_profit,
        });
        Ok(())
    }

    /// Per-bar risk pass over the position book, using the bar's high/low.
    ///
    /// Per position, first match wins: forced liquidation (settling exactly at
    /// the liquidation price), then stop-loss, then take-profit. Liquidation
    /// pre-empts a stale stop even when the bar touches both. A fired
    /// condition closes the full remaining quantity. Returns true if anything
    /// fired.
    pub(crate) fn check_risk_triggers(&mut self) -> bool {
        let bar = self.current_bar().clone();
        let mut to_close: Vec<(PositionId, f64, f64, CloseReason)> = Vec::new();

        for pos in &self.positions {
            let direction = pos.direction();
            let liq = pos.liquidation_price;

            let fired = if pos.mode.is_margin() && liq > 0.0 && touched(direction, &bar, liq) {
                Some((liq, CloseReason::Liquidation))
            } else if pos.stop_loss > 0.0 && touched(direction, &bar, pos.stop_loss) {
                Some((pos.stop_loss, CloseReason::StopLoss))
            } else if pos.take_profit > 0.0 && touched_favorable(direction, &bar, pos.take_profit) {
                Some((pos.take_profit, CloseReason::TakeProfit))
            } else {
                None
            };

            if let Some((price, reason)) = fired {
                to_close.push((pos.id, pos.quantity, price, reason));
            }
        }

        let mut any = false;
        for (id, quantity, price, reason) in to_close {
            // settlement triggered by an earlier close empties the book
            if !self.is_active() {
                break;
            }
            if self.close_position_lot(id, quantity, price, reason).is_ok() {
                any = true;
            }
        }
        any
    }
}

/// The bar pierced `level` on the losing side for `direction`.
fn touched(direction: Direction, bar: &crate::domain::Bar, level: f64) -> bool {
    match direction {
        Direction::Long => bar.low <= level,
        Direction::Short => bar.high >= level,
    }
}

/// The bar pierced `level` on the winning side for `direction`.
fn touched_favorable(direction: Direction, bar: &crate::domain::Bar, level: f64) -> bool {
    match direction {
        Direction::Long => bar.high >= level,
        Direction::Short => bar.low <= level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::domain::{Bar, BarSeries, TradeMode};
    use chrono::NaiveDate;

    fn state_with_bars(ohlc: &[(f64, f64, f64)]) -> SimulationState {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = ohlc
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low))| Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close: open,
                volume: 1_000.0,
            })
            .collect();
        SimulationState::new(BarSeries::new(bars).unwrap(), 0, SimConfig::default())
    }

    #[test]
    fn long_stop_below_liquidation_is_rejected() {
        let mut state = state_with_bars(&[(100.0, 100.0, 100.0)]);
        let id = state
            .execute_trade(TradeMode::MarginLong, 10.0, 100.0, 4.0)
            .unwrap();
        // liquidation at 75
        let err = state.set_exits(id, 70.0, 0.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStopOrTakeProfit(_)));
        assert_eq!(state.position(id).unwrap().stop_loss, 0.0);
        state.set_exits(id, 80.0, 0.0).unwrap();
        assert_eq!(state.position(id).unwrap().stop_loss, 80.0);
    }

    #[test]
    fn take_profit_must_be_on_winning_side() {
        let mut state = state_with_bars(&[(100.0, 100.0, 100.0)]);
        let long = state
            .execute_trade(TradeMode::MarginLong, 1.0, 100.0, 2.0)
            .unwrap();
        assert!(state.set_exits(long, 0.0, 95.0).is_err());
        assert!(state.set_exits(long, 0.0, 120.0).is_ok());

        let short = state
            .execute_trade(TradeMode::MarginShort, 1.0, 100.0, 2.0)
            .unwrap();
        assert!(state.set_exits(short, 0.0, 105.0).is_err());
        assert!(state.set_exits(short, 0.0, 80.0).is_ok());
    }

    #[test]
    fn stop_loss_fires_at_the_stop_price() {
        let mut state = state_with_bars(&[(100.0, 100.0, 100.0), (96.0, 97.0, 89.0)]);
        let id = state
            .execute_trade(TradeMode::Spot, 10.0, 100.0, 1.0)
            .unwrap();
        state.set_exits(id, 90.0, 0.0).unwrap();

        state.current_index = 1;
        assert!(state.check_risk_triggers());
        assert!(state.positions().is_empty());
        let tx = &state.transactions()[0];
        assert_eq!(tx.close_price, 90.0);
        assert_eq!(tx.reason, CloseReason::StopLoss);
    }

    #[test]
    fn take_profit_fires_for_short_on_low() {
        let mut state = state_with_bars(&[(100.0, 100.0, 100.0), (95.0, 96.0, 84.0)]);
        let id = state
            .execute_trade(TradeMode::MarginShort, 5.0, 100.0, 2.0)
            .unwrap();
        state.set_exits(id, 0.0, 85.0).unwrap();

        state.current_index = 1;
        assert!(state.check_risk_triggers());
        let tx = &state.transactions()[0];
        assert_eq!(tx.close_price, 85.0);
        assert_eq!(tx.reason, CloseReason::TakeProfit);
        assert!(tx.realized_pnl > 0.0);
    }

    #[test]
    fn liquidation_preempts_stop_loss() {
        // leverage 4 long at 100 → liquidation 75; stop legally above at 80
        let mut state = state_with_bars(&[(100.0, 100.0, 100.0), (82.0, 83.0, 70.0)]);
        let id = state
            .execute_trade(TradeMode::MarginLong, 10.0, 100.0, 4.0)
            .unwrap();
        state.set_exits(id, 80.0, 0.0).unwrap();

        // bar pierces both 80 and 75: liquidation must win and settle at 75
        state.current_index = 1;
        assert!(state.check_risk_triggers());
        let tx = &state.transactions()[0];
        assert_eq!(tx.reason, CloseReason::Liquidation);
        assert_eq!(tx.close_price, 75.0);
    }

    #[test]
    fn only_one_condition_fires_per_position_per_bar() {
        // wide bar touches both stop and take-profit; stop wins
        let mut state = state_with_bars(&[(100.0, 100.0, 100.0), (100.0, 115.0, 88.0)]);
        let id = state
            .execute_trade(TradeMode::Spot, 1.0, 100.0, 1.0)
            .unwrap();
        state.set_exits(id, 90.0, 110.0).unwrap();

        state.current_index = 1;
        state.check_risk_triggers();
        assert_eq!(state.transactions().len(), 1);
        assert_eq!(state.transactions()[0].reason, CloseReason::StopLoss);
    }
}
