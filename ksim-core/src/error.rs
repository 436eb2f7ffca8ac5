//! Engine errors — every rejection a trading operation can report.
//!
//! All variants are recoverable from the caller's point of view: a rejected
//! operation leaves the simulation state exactly as it was before the call.
//! `Bankrupt` is the one terminal-for-the-run condition; it is raised after
//! the engine has already force-settled the portfolio.

use crate::domain::mode::Direction;
use crate::domain::order::{OrderId, OrderKind};
use crate::domain::position::PositionId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient funds: {required:.2} required, {available:.2} available")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("{kind} {direction} order at {price:.2} is on the wrong side of the market open {market_open:.2}")]
    InvalidOrderPrice {
        kind: OrderKind,
        direction: Direction,
        price: f64,
        market_open: f64,
    },

    #[error("a margin {0} position or pending order already exists")]
    PositionConflict(Direction),

    #[error("close quantity {requested} outside (0, {available}]")]
    InvalidCloseQuantity { requested: f64, available: f64 },

    #[error("position {0} not found")]
    PositionNotFound(PositionId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("invalid stop-loss/take-profit: {0}")]
    InvalidStopOrTakeProfit(String),

    #[error("quantity and price must be positive")]
    InvalidQuantity,

    #[error("simulation is no longer active")]
    SimulationEnded,

    #[error("total assets depleted; portfolio force-settled")]
    Bankrupt,
}
