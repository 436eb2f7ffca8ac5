//! Domain events emitted by the engine for the presentation layer.
//!
//! Every mutating operation appends the events it produced to the simulation
//! state; the consumer drains them after each call and renders them however it
//! likes (banner, toast, log line). This replaces the original single-slot
//! "last message" field, so no event is lost when one bar produces several.

use super::mode::TradeMode;
use super::order::{OrderId, OrderKind};
use super::position::PositionId;
use super::trade::CloseReason;
use serde::{Deserialize, Serialize};

/// How the presentation layer should style an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PositionOpened {
        id: PositionId,
        mode: TradeMode,
        quantity: f64,
        price: f64,
    },
    PositionClosed {
        id: PositionId,
        mode: TradeMode,
        quantity: f64,
        price: f64,
        realized_pnl: f64,
        reason: CloseReason,
        /// False for a partial close.
        fully_closed: bool,
    },
    OrderPlaced {
        id: OrderId,
        kind: OrderKind,
        mode: TradeMode,
        trigger_price: f64,
        locked_funds: f64,
    },
    OrderCancelled {
        id: OrderId,
        refunded: f64,
    },
    OrderFilled {
        id: OrderId,
        kind: OrderKind,
        mode: TradeMode,
        fill_price: f64,
    },
    /// The order triggered but the released funds no longer covered the open
    /// (fees or margin moved underneath it). The order is auto-cancelled.
    OrderUnfundable {
        id: OrderId,
        kind: OrderKind,
        mode: TradeMode,
    },
    ExitsUpdated {
        id: PositionId,
        stop_loss: f64,
        take_profit: f64,
    },
    /// Total assets reached zero; the portfolio was force-settled.
    Bankruptcy,
    Settled {
        forced: bool,
    },
}

impl Event {
    pub fn severity(&self) -> Severity {
        match self {
            Event::PositionOpened { .. }
            | Event::OrderPlaced { .. }
            | Event::OrderFilled { .. }
            | Event::ExitsUpdated { .. } => Severity::Success,
            Event::PositionClosed { realized_pnl, .. } => {
                if *realized_pnl > 0.0 {
                    Severity::Success
                } else {
                    Severity::Error
                }
            }
            Event::OrderCancelled { .. } | Event::Settled { .. } => Severity::Info,
            Event::OrderUnfundable { .. } | Event::Bankruptcy => Severity::Error,
        }
    }
}
