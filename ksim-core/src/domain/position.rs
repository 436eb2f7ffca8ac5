//! Position — an open spot lot or margin position.

use super::mode::{Direction, TradeMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena-style position identifier. Monotonic per simulation; the numeric
/// form is surfaced directly for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// An open position.
///
/// Invariants while open:
/// - `quantity > 0` and `quantity <= initial_quantity` (partial closes only
///   ever shrink it);
/// - at most one margin position exists per direction across the book;
/// - `liquidation_price` is fixed at open time and never recomputed, even
///   after partial closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub open_date: NaiveDate,
    pub mode: TradeMode,
    /// Average open price ("cost").
    pub unit_price: f64,
    pub quantity: f64,
    pub initial_quantity: f64,
    /// 1.0 for spot.
    pub leverage: f64,
    /// 0.0 = none; meaningful only for margin positions.
    pub liquidation_price: f64,
    /// 0.0 = unset.
    pub stop_loss: f64,
    /// 0.0 = unset.
    pub take_profit: f64,
    /// Open fee still attributed to the remaining quantity; partial closes
    /// carve their prorated share out of this.
    pub open_fee: f64,
}

impl Position {
    pub fn direction(&self) -> Direction {
        self.mode.direction()
    }

    /// Margin currently held against the remaining quantity.
    pub fn initial_margin(&self) -> f64 {
        (self.unit_price * self.quantity) / self.leverage
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction().pnl(self.quantity, self.unit_price, price)
    }

    /// Mark-to-market net value at `price`: full notional for spot, held
    /// margin plus unrealized P&L for margin positions.
    pub fn net_value(&self, price: f64) -> f64 {
        if self.mode.is_margin() {
            self.initial_margin() + self.unrealized_pnl(price)
        } else {
            self.quantity * price
        }
    }
}
