//! Ksim core — deterministic bar-by-bar trading simulator.
//!
//! The engine owns the account ledger, the position book, the pending-order
//! book, and the simulation clock. Given an immutable OHLCV bar series and a
//! stream of user commands (open, close, place, cancel, advance), it produces
//! ledger mutations, an append-only transaction log, an equity curve, and
//! domain events for a presentation layer. Data retrieval, indicators, and
//! rendering live outside this crate.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod session;

pub use config::{AssetClass, SimConfig};
pub use domain::{
    Bar, BarError, BarSeries, CloseReason, Direction, Event, OrderId, OrderKind, PendingOrder,
    Position, PositionId, Severity, TradeMode, Transaction,
};
pub use engine::{
    AdvanceOutcome, EquitySnapshot, SettlementStats, SimStatus, SimulationState, SpotSummary,
};
pub use error::EngineError;
pub use session::{start_session, SessionError, SessionWindow};
