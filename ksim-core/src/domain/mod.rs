//! Domain types for the Ksim engine.

pub mod bar;
pub mod event;
pub mod mode;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::{Bar, BarError, BarSeries};
pub use event::{Event, Severity};
pub use mode::{Direction, TradeMode};
pub use order::{OrderId, OrderKind, PendingOrder};
pub use position::{Position, PositionId};
pub use trade::{CloseReason, Transaction};
