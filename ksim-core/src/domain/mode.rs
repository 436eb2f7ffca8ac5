//! Trade-mode taxonomy: spot vs margin, long vs short.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Signed P&L for a lot opened at `open_price` and marked at `current_price`.
    pub fn pnl(self, quantity: f64, open_price: f64, current_price: f64) -> f64 {
        let diff = match self {
            Direction::Long => current_price - open_price,
            Direction::Short => open_price - current_price,
        };
        diff * quantity
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// The three ways a position can be opened.
///
/// A closed variant set instead of a keyed mode table: direction and margin
/// treatment resolve by pattern match, and no other combination exists
/// (spot-short is not a mode this simulator offers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeMode {
    Spot,
    MarginLong,
    MarginShort,
}

impl TradeMode {
    pub fn direction(self) -> Direction {
        match self {
            TradeMode::Spot | TradeMode::MarginLong => Direction::Long,
            TradeMode::MarginShort => Direction::Short,
        }
    }

    pub fn is_margin(self) -> bool {
        matches!(self, TradeMode::MarginLong | TradeMode::MarginShort)
    }

    pub fn label(self) -> &'static str {
        match self {
            TradeMode::Spot => "spot",
            TradeMode::MarginLong => "margin long",
            TradeMode::MarginShort => "margin short",
        }
    }
}

impl fmt::Display for TradeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
