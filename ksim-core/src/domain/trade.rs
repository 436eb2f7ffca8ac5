//! Transaction — the append-only record of a closed trade lot.

use super::mode::{Direction, TradeMode};
use super::position::PositionId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a lot was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    /// User-initiated close.
    Manual,
    StopLoss,
    TakeProfit,
    /// Forced liquidation of a margin position.
    Liquidation,
    /// End-of-run or bankruptcy settlement.
    ForcedSettlement,
    /// User settled the whole portfolio early.
    ManualSettlement,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::Manual => "manual close",
            CloseReason::StopLoss => "stop-loss",
            CloseReason::TakeProfit => "take-profit",
            CloseReason::Liquidation => "liquidation",
            CloseReason::ForcedSettlement => "forced settlement",
            CloseReason::ManualSettlement => "manual settlement",
        };
        f.write_str(s)
    }
}

/// Closed-trade record. Immutable once appended to the transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub position_id: PositionId,
    pub mode: TradeMode,
    pub direction: Direction,
    pub leverage: f64,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub quantity: f64,
    pub open_price: f64,
    pub close_price: f64,
    /// Price P&L before fees.
    pub realized_pnl: f64,
    /// Prorated open fee plus close fee.
    pub total_fees: f64,
    pub net_pnl: f64,
    pub reason: CloseReason,
}

impl Transaction {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_roundtrip() {
        let tx = Transaction {
            position_id: PositionId(7),
            mode: TradeMode::MarginLong,
            direction: Direction::Long,
            leverage: 5.0,
            open_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            close_date: NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(),
            quantity: 3.0,
            open_price: 100.0,
            close_price: 110.0,
            realized_pnl: 30.0,
            total_fees: 6.3,
            net_pnl: 23.7,
            reason: CloseReason::TakeProfit,
        };
        let json = serde_json::to_string(&tx).unwrap();
        let deser: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deser);
        assert!(deser.is_winner());
    }
}
