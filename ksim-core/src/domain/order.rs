//! Pending conditional orders (limit and stop) with pre-reserved funds.

use super::bar::Bar;
use super::mode::{Direction, TradeMode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena-style order identifier, monotonic per simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fills at a price at least as good as its trigger (rests on the
    /// favorable side of the market).
    Limit,
    /// Fills on a breakout through its trigger.
    Stop,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Stop => write!(f, "stop"),
        }
    }
}

/// An unfilled conditional order.
///
/// `locked_funds` (margin plus the fee estimated at the trigger price) is
/// reserved from the account at creation and released in full either back to
/// cash on cancel/failed fill, or into the open-trade accounting on fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub mode: TradeMode,
    pub kind: OrderKind,
    pub quantity: f64,
    pub trigger_price: f64,
    /// 1.0 for spot.
    pub leverage: f64,
    pub locked_funds: f64,
    /// Bar index at placement time.
    pub created_index: usize,
}

impl PendingOrder {
    pub fn direction(&self) -> Direction {
        self.mode.direction()
    }

    /// If this order triggers within `bar`, the price it fills at.
    ///
    /// Limit orders fill at the better of open and trigger. Stop orders that
    /// gap through their trigger fill at the open, otherwise at the stop level.
    pub fn fill_price(&self, bar: &Bar) -> Option<f64> {
        let t = self.trigger_price;
        match (self.kind, self.direction()) {
            (OrderKind::Limit, Direction::Long) => (bar.low <= t).then(|| bar.open.min(t)),
            (OrderKind::Limit, Direction::Short) => (bar.high >= t).then(|| bar.open.max(t)),
            (OrderKind::Stop, Direction::Long) => {
                (bar.high >= t).then(|| if bar.open >= t { bar.open } else { t })
            }
            (OrderKind::Stop, Direction::Short) => {
                (bar.low <= t).then(|| if bar.open <= t { bar.open } else { t })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(open: f64, high: f64, low: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open,
            high,
            low,
            close: open,
            volume: 0.0,
        }
    }

    fn order(mode: TradeMode, kind: OrderKind, trigger: f64) -> PendingOrder {
        PendingOrder {
            id: OrderId(1),
            mode,
            kind,
            quantity: 1.0,
            trigger_price: trigger,
            leverage: 1.0,
            locked_funds: 0.0,
            created_index: 0,
        }
    }

    #[test]
    fn long_limit_fills_at_better_of_open_and_trigger() {
        let o = order(TradeMode::Spot, OrderKind::Limit, 100.0);
        assert_eq!(o.fill_price(&bar(105.0, 106.0, 98.0)), Some(100.0));
        assert_eq!(o.fill_price(&bar(95.0, 106.0, 94.0)), Some(95.0));
        assert_eq!(o.fill_price(&bar(105.0, 106.0, 101.0)), None);
    }

    #[test]
    fn short_limit_fills_at_better_of_open_and_trigger() {
        let o = order(TradeMode::MarginShort, OrderKind::Limit, 100.0);
        assert_eq!(o.fill_price(&bar(95.0, 101.0, 94.0)), Some(100.0));
        assert_eq!(o.fill_price(&bar(103.0, 104.0, 99.0)), Some(103.0));
        assert_eq!(o.fill_price(&bar(95.0, 99.0, 94.0)), None);
    }

    #[test]
    fn long_stop_gap_through_fills_at_open() {
        let o = order(TradeMode::MarginLong, OrderKind::Stop, 100.0);
        // gapped above the stop: fill at open
        assert_eq!(o.fill_price(&bar(102.0, 103.0, 101.0)), Some(102.0));
        // touched mid-bar: fill at the stop level
        assert_eq!(o.fill_price(&bar(98.0, 101.0, 97.0)), Some(100.0));
        assert_eq!(o.fill_price(&bar(98.0, 99.0, 97.0)), None);
    }

    #[test]
    fn short_stop_gap_through_fills_at_open() {
        let o = order(TradeMode::MarginShort, OrderKind::Stop, 100.0);
        assert_eq!(o.fill_price(&bar(98.0, 99.0, 97.0)), Some(98.0));
        assert_eq!(o.fill_price(&bar(102.0, 103.0, 99.0)), Some(100.0));
        assert_eq!(o.fill_price(&bar(102.0, 103.0, 101.0)), None);
    }
}
