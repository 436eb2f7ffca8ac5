//! Pending-order placement, cancellation, and the per-bar trigger pass.

use crate::domain::{Direction, Event, OrderId, OrderKind, PendingOrder, TradeMode};
use crate::engine::state::SimulationState;
use crate::error::EngineError;

impl SimulationState {
    /// Place a conditional order. Funds (margin plus the fee estimated at the
    /// trigger price) are reserved from cash immediately.
    ///
    /// Price sanity is direction-relative against the current bar's open: a
    /// limit order must rest on the favorable side (long strictly below,
    /// short strictly above), a stop order on the breakout side. Margin
    /// exclusivity is enforced against both open positions and other pending
    /// orders of the same direction.
    pub fn place_order(
        &mut self,
        mode: TradeMode,
        kind: OrderKind,
        quantity: f64,
        trigger_price: f64,
        leverage: f64,
    ) -> Result<OrderId, EngineError> {
        if !self.is_active() {
            return Err(EngineError::SimulationEnded);
        }
        if quantity <= 0.0 || trigger_price <= 0.0 {
            return Err(EngineError::InvalidQuantity);
        }
        let leverage = if mode.is_margin() {
            self.config.clamp_leverage(leverage)
        } else {
            1.0
        };

        let direction = mode.direction();
        let market_open = self.current_bar().open;
        let wrong_side = match (kind, direction) {
            (OrderKind::Limit, Direction::Long) => trigger_price >= market_open,
            (OrderKind::Limit, Direction::Short) => trigger_price <= market_open,
            (OrderKind::Stop, Direction::Long) => trigger_price <= market_open,
            (OrderKind::Stop, Direction::Short) => trigger_price >= market_open,
        };
        if wrong_side {
            return Err(EngineError::InvalidOrderPrice {
                kind,
                direction,
                price: trigger_price,
                market_open,
            });
        }

        if mode.is_margin() {
            let conflict = self
                .positions
                .iter()
                .any(|p| p.mode.is_margin() && p.direction() == direction)
                || self
                    .pending_orders
                    .iter()
                    .any(|o| o.mode.is_margin() && o.direction() == direction);
            if conflict {
                return Err(EngineError::PositionConflict(direction));
            }
        }

        let transaction_amount = quantity * trigger_price;
        let estimated_fee = transaction_amount * self.config.fee_rate(mode);
        let required_margin = if mode.is_margin() {
            transaction_amount / leverage
        } else {
            transaction_amount
        };
        let locked_funds = required_margin + estimated_fee;

        if self.account.cash_balance < locked_funds {
            return Err(EngineError::InsufficientFunds {
                required: locked_funds,
                available: self.account.cash_balance,
            });
        }
        self.account.cash_balance -= locked_funds;

        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        self.pending_orders.push(PendingOrder {
            id,
            mode,
            kind,
            quantity,
            trigger_price,
            leverage,
            locked_funds,
            created_index: self.current_index,
        });
        self.push_event(Event::OrderPlaced {
            id,
            kind,
            mode,
            trigger_price,
            locked_funds,
        });
        Ok(id)
    }

    /// Cancel a pending order, refunding its locked funds in full.
    ///
    /// An unknown id is reported but mutates nothing, so cancellation is
    /// effectively idempotent. Returns the refunded amount.
    pub fn cancel_order(&mut self, id: OrderId) -> Result<f64, EngineError> {
        let index = self
            .pending_orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(EngineError::OrderNotFound(id))?;
        let order = self.pending_orders.remove(index);
        self.account.cash_balance += order.locked_funds;
        self.push_event(Event::OrderCancelled {
            id,
            refunded: order.locked_funds,
        });
        Ok(order.locked_funds)
    }

    /// Per-bar trigger pass over the pending-order book.
    ///
    /// Orders are evaluated in insertion order for deterministic replay. A
    /// triggered order is removed and its reserved funds released before the
    /// open-trade operation runs at the fill price; if the open then fails
    /// (fees or margin moved underneath the reservation) the order is reported
    /// as triggered-but-unfundable and stays cancelled. Returns true if any
    /// order triggered.
    pub(crate) fn check_pending_orders(&mut self) -> bool {
        if self.pending_orders.is_empty() {
            return false;
        }
        let bar = self.current_bar().clone();
        let triggered: Vec<(OrderId, f64)> = self
            .pending_orders
            .iter()
            .filter_map(|o| o.fill_price(&bar).map(|price| (o.id, price)))
            .collect();

        let mut any = false;
        for (id, fill_price) in triggered {
            // a bankruptcy inside an earlier fill settles the book; stop here
            if !self.is_active() {
                break;
            }
            let Some(index) = self.pending_orders.iter().position(|o| o.id == id) else {
                continue;
            };
            let order = self.pending_orders.remove(index);
            self.account.cash_balance += order.locked_funds;
            any = true;

            match self.execute_trade(order.mode, order.quantity, fill_price, order.leverage) {
                Ok(_) => self.push_event(Event::OrderFilled {
                    id: order.id,
                    kind: order.kind,
                    mode: order.mode,
                    fill_price,
                }),
                Err(_) => self.push_event(Event::OrderUnfundable {
                    id: order.id,
                    kind: order.kind,
                    mode: order.mode,
                }),
            }
        }
        any
    }
}
