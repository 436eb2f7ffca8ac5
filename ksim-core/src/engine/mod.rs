//! The simulation engine: state aggregate, trade operations, order triggers,
//! risk rules, and the day-advance clock.
//!
//! Every public operation is atomic with respect to `SimulationState`: it
//! either completes fully or fails before any mutation survives. Within one
//! day advance the ordering is fixed: order triggers, then risk triggers,
//! then revaluation and the equity snapshot, then the bankruptcy check.

pub mod clock;
pub mod orders;
pub mod risk;
pub mod state;
pub mod trading;

pub use clock::{AdvanceOutcome, SettlementStats};
pub use state::{Account, EquitySnapshot, SimStatus, SimulationState, SpotSummary};
pub use trading::QTY_EPSILON;
