//! Open and close trade operations against the account ledger.
//!
//! Both operations are atomic: on any rejection the ledger, the position book,
//! and the transaction log are exactly as they were before the call (a fee
//! debited during validation is refunded before returning).

use crate::domain::{CloseReason, Direction, Event, Position, PositionId, TradeMode, Transaction};
use crate::engine::state::SimulationState;
use crate::error::EngineError;

/// Absolute tolerance for snapping a close quantity to the full remaining
/// quantity, so repeated partial closes cannot strand floating-point dust.
/// Fixed regardless of asset class; see the design notes.
pub const QTY_EPSILON: f64 = 1e-9;

/// Relative slack accepted above the remaining quantity before a close is
/// rejected outright.
const CLOSE_QTY_SLACK: f64 = 1e-6;

impl SimulationState {
    /// Open a position at `price`.
    ///
    /// Debits the open fee, then the required margin (full notional for spot).
    /// Margin positions are exclusive per direction. The liquidation price is
    /// fixed here and never recomputed:
    /// `price * (1 - 1/leverage)` long, `price * (1 + 1/leverage)` short.
    ///
    /// If the fee debit alone wipes out total assets the portfolio is
    /// force-settled and the open is abandoned with `Bankrupt`.
    pub fn execute_trade(
        &mut self,
        mode: TradeMode,
        quantity: f64,
        price: f64,
        leverage: f64,
    ) -> Result<PositionId, EngineError> {
        if !self.is_active() {
            return Err(EngineError::SimulationEnded);
        }
        if quantity <= 0.0 || price <= 0.0 {
            return Err(EngineError::InvalidQuantity);
        }
        let leverage = if mode.is_margin() {
            self.config.clamp_leverage(leverage)
        } else {
            1.0
        };

        let direction = mode.direction();
        if mode.is_margin()
            && self
                .positions
                .iter()
                .any(|p| p.mode.is_margin() && p.direction() == direction)
        {
            return Err(EngineError::PositionConflict(direction));
        }

        let transaction_amount = quantity * price;
        let open_fee = transaction_amount * self.config.fee_rate(mode);

        self.account.cash_balance -= open_fee;
        if self.check_bankruptcy() {
            return Err(EngineError::Bankrupt);
        }

        let required_margin = if mode.is_margin() {
            transaction_amount / leverage
        } else {
            transaction_amount
        };

        if self.account.cash_balance < required_margin {
            // roll back the fee; no state change survives the rejection
            self.account.cash_balance += open_fee;
            return Err(EngineError::InsufficientFunds {
                required: required_margin,
                available: self.account.cash_balance,
            });
        }
        self.account.cash_balance -= required_margin;

        let liquidation_price = if mode.is_margin() {
            match direction {
                Direction::Long => price * (1.0 - 1.0 / leverage),
                Direction::Short => price * (1.0 + 1.0 / leverage),
            }
        } else {
            0.0
        };

        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        self.positions.push(Position {
            id,
            open_date: self.current_bar().date,
            mode,
            unit_price: price,
            quantity,
            initial_quantity: quantity,
            leverage,
            liquidation_price,
            stop_loss: 0.0,
            take_profit: 0.0,
            open_fee,
        });
        self.push_event(Event::PositionOpened {
            id,
            mode,
            quantity,
            price,
        });
        Ok(id)
    }

    /// Close `quantity` of a position at `price`.
    ///
    /// Releases the prorated margin, realizes P&L, debits the close fee, and
    /// appends one `Transaction`. A quantity within `QTY_EPSILON` of the
    /// remaining quantity snaps to a full close; a fully closed position
    /// leaves the book. Re-checks bankruptcy afterwards, since a leveraged
    /// loss can empty the account.
    pub fn close_position_lot(
        &mut self,
        id: PositionId,
        quantity: f64,
        price: f64,
        reason: CloseReason,
    ) -> Result<Transaction, EngineError> {
        let pos_index = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(EngineError::PositionNotFound(id))?;

        let remaining = self.positions[pos_index].quantity;
        if quantity <= 0.0 || quantity > remaining * (1.0 + CLOSE_QTY_SLACK) {
            return Err(EngineError::InvalidCloseQuantity {
                requested: quantity,
                available: remaining,
            });
        }
        let quantity = if (quantity - remaining).abs() < QTY_EPSILON {
            remaining
        } else {
            quantity
        };

        let close_date = self.current_bar().date;
        let pos = &self.positions[pos_index];
        let mode = pos.mode;
        let direction = pos.direction();

        let close_fee = quantity * price * self.config.fee_rate(mode);
        let margin_released = (pos.unit_price * quantity) / pos.leverage;
        let realized_pnl = direction.pnl(quantity, pos.unit_price, price);
        let prorated_open_fee = pos.open_fee * (quantity / pos.initial_quantity);
        let total_fees = prorated_open_fee + close_fee;
        let fully_closed = quantity == remaining;

        let transaction = Transaction {
            position_id: id,
            mode,
            direction,
            leverage: pos.leverage,
            open_date: pos.open_date,
            close_date,
            quantity,
            open_price: pos.unit_price,
            close_price: price,
            realized_pnl,
            total_fees,
            net_pnl: realized_pnl - total_fees,
            reason,
        };

        self.account.cash_balance -= close_fee;
        self.account.cash_balance += margin_released + realized_pnl;
        self.transactions.push(transaction.clone());

        if fully_closed {
            self.positions.remove(pos_index);
        } else {
            let pos = &mut self.positions[pos_index];
            pos.quantity -= quantity;
            pos.open_fee -= prorated_open_fee;
        }

        self.push_event(Event::PositionClosed {
            id,
            mode,
            quantity,
            price,
            realized_pnl,
            reason,
            fully_closed,
        });

        self.check_bankruptcy();
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::domain::{Bar, BarSeries, Direction};
    use chrono::NaiveDate;

    fn flat_state(price: f64) -> SimulationState {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..20)
            .map(|i| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 1_000.0,
            })
            .collect();
        SimulationState::new(BarSeries::new(bars).unwrap(), 0, SimConfig::default())
    }

    #[test]
    fn spot_open_debits_fee_and_full_notional() {
        let mut state = flat_state(100.0);
        state.execute_trade(TradeMode::Spot, 100.0, 100.0, 1.0).unwrap();
        // fee 10_000 * 0.005 = 50, margin = 10_000
        assert_eq!(state.cash_balance(), 100_000.0 - 50.0 - 10_000.0);
        assert_eq!(state.positions().len(), 1);
        assert_eq!(state.positions()[0].liquidation_price, 0.0);
    }

    #[test]
    fn margin_open_sets_liquidation_price() {
        let mut state = flat_state(100.0);
        let id = state
            .execute_trade(TradeMode::MarginLong, 10.0, 100.0, 4.0)
            .unwrap();
        let pos = state.position(id).unwrap();
        assert_eq!(pos.liquidation_price, 75.0);
        // fee 1000 * 0.01 = 10, margin 1000/4 = 250
        assert_eq!(state.cash_balance(), 100_000.0 - 10.0 - 250.0);

        let mut short = flat_state(100.0);
        let id = short
            .execute_trade(TradeMode::MarginShort, 10.0, 100.0, 4.0)
            .unwrap();
        assert_eq!(short.position(id).unwrap().liquidation_price, 125.0);
    }

    #[test]
    fn margin_direction_exclusivity() {
        let mut state = flat_state(100.0);
        state
            .execute_trade(TradeMode::MarginLong, 10.0, 100.0, 2.0)
            .unwrap();
        let cash_before = state.cash_balance();
        let err = state
            .execute_trade(TradeMode::MarginLong, 5.0, 100.0, 2.0)
            .unwrap_err();
        assert_eq!(err, EngineError::PositionConflict(Direction::Long));
        assert_eq!(state.cash_balance(), cash_before);
        // a spot lot and the opposite margin direction are both still allowed
        state.execute_trade(TradeMode::Spot, 1.0, 100.0, 1.0).unwrap();
        state
            .execute_trade(TradeMode::MarginShort, 10.0, 100.0, 2.0)
            .unwrap();
    }

    #[test]
    fn insufficient_margin_refunds_fee() {
        let mut state = flat_state(100.0);
        // notional 2_000_000, margin 2_000_000 > capital
        let err = state
            .execute_trade(TradeMode::Spot, 20_000.0, 100.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        assert_eq!(state.cash_balance(), 100_000.0);
        assert!(state.positions().is_empty());
    }

    #[test]
    fn full_close_removes_position_and_books_transaction() {
        let mut state = flat_state(100.0);
        let id = state
            .execute_trade(TradeMode::MarginLong, 10.0, 100.0, 4.0)
            .unwrap();
        let tx = state
            .close_position_lot(id, 10.0, 110.0, CloseReason::Manual)
            .unwrap();
        assert!(state.positions().is_empty());
        assert_eq!(tx.realized_pnl, 100.0);
        // open fee 10 + close fee 11
        assert!((tx.total_fees - 21.0).abs() < 1e-9);
        assert!((tx.net_pnl - 79.0).abs() < 1e-9);
        assert_eq!(state.transactions().len(), 1);
    }

    #[test]
    fn partial_close_shrinks_quantity_and_prorates_fee() {
        let mut state = flat_state(100.0);
        let id = state
            .execute_trade(TradeMode::MarginLong, 10.0, 100.0, 4.0)
            .unwrap();
        state
            .close_position_lot(id, 4.0, 100.0, CloseReason::Manual)
            .unwrap();
        let pos = state.position(id).unwrap();
        assert!((pos.quantity - 6.0).abs() < 1e-12);
        assert_eq!(pos.initial_quantity, 10.0);
        // 40% of the 10.0 open fee carved out
        assert!((pos.open_fee - 6.0).abs() < 1e-9);
        // liquidation price untouched by the partial close
        assert_eq!(pos.liquidation_price, 75.0);
    }

    #[test]
    fn close_quantity_snaps_within_epsilon() {
        let mut state = flat_state(100.0);
        let id = state
            .execute_trade(TradeMode::Spot, 3.0, 100.0, 1.0)
            .unwrap();
        state
            .close_position_lot(id, 3.0 - 1e-12, 100.0, CloseReason::Manual)
            .unwrap();
        assert!(state.positions().is_empty());
    }

    #[test]
    fn rejects_out_of_range_close_quantity() {
        let mut state = flat_state(100.0);
        let id = state
            .execute_trade(TradeMode::Spot, 3.0, 100.0, 1.0)
            .unwrap();
        let cash_before = state.cash_balance();
        assert!(matches!(
            state.close_position_lot(id, 4.0, 100.0, CloseReason::Manual),
            Err(EngineError::InvalidCloseQuantity { .. })
        ));
        assert!(matches!(
            state.close_position_lot(id, 0.0, 100.0, CloseReason::Manual),
            Err(EngineError::InvalidCloseQuantity { .. })
        ));
        assert_eq!(state.cash_balance(), cash_before);
        assert!(state.transactions().is_empty());
    }

    #[test]
    fn unknown_position_is_rejected_without_mutation() {
        let mut state = flat_state(100.0);
        let err = state
            .close_position_lot(PositionId(42), 1.0, 100.0, CloseReason::Manual)
            .unwrap_err();
        assert_eq!(err, EngineError::PositionNotFound(PositionId(42)));
        assert_eq!(state.cash_balance(), 100_000.0);
    }

    #[test]
    fn flat_close_loses_exactly_the_fees() {
        let mut state = flat_state(100.0);
        let id = state
            .execute_trade(TradeMode::Spot, 10.0, 100.0, 1.0)
            .unwrap();
        let tx = state
            .close_position_lot(id, 10.0, 100.0, CloseReason::Manual)
            .unwrap();
        assert_eq!(tx.realized_pnl, 0.0);
        assert!(tx.net_pnl < 0.0);
        assert!((tx.net_pnl + tx.total_fees).abs() < 1e-12);
    }
}
