//! Simulation clock: day advance, bankruptcy enforcement, settlement.
//!
//! Each advanced bar runs a fixed sequence: order triggers, then risk
//! triggers, then asset revaluation, equity snapshot, and the bankruptcy
//! check. Reaching the final bar forces settlement.

use crate::domain::{CloseReason, Event};
use crate::engine::state::{EquitySnapshot, SimStatus, SimulationState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Result of an advance call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// The simulation can still step forward.
    pub can_continue: bool,
    /// A fill, risk trigger, bankruptcy, or settlement happened; auto-play
    /// callers pause on this.
    pub event_occurred: bool,
}

/// Final performance figures computed at settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementStats {
    pub final_asset: f64,
    pub total_pnl: f64,
    /// Percent return on initial capital.
    pub roi: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SimulationState {
    /// Advance one bar. At the final bar this settles instead of stepping.
    pub fn advance_one(&mut self) -> AdvanceOutcome {
        if !self.is_active() {
            return AdvanceOutcome {
                can_continue: false,
                event_occurred: false,
            };
        }
        if self.current_index >= self.max_index {
            self.settle_portfolio(true);
            return AdvanceOutcome {
                can_continue: false,
                event_occurred: true,
            };
        }
        let event_occurred = self.step();
        AdvanceOutcome {
            can_continue: self.is_active(),
            event_occurred,
        }
    }

    /// Advance up to `days` bars, stopping early on the first bar that
    /// produced a notable event so an auto-playing caller can pause.
    pub fn advance_n(&mut self, days: usize) -> AdvanceOutcome {
        if !self.is_active() {
            return AdvanceOutcome {
                can_continue: false,
                event_occurred: false,
            };
        }
        let mut event_occurred = false;
        for _ in 0..days {
            if self.current_index >= self.max_index {
                self.settle_portfolio(true);
                return AdvanceOutcome {
                    can_continue: false,
                    event_occurred: true,
                };
            }
            if self.step() {
                event_occurred = true;
                break;
            }
        }
        AdvanceOutcome {
            can_continue: self.is_active(),
            event_occurred,
        }
    }

    /// One bar: triggers, risk, revaluation, snapshot, bankruptcy check.
    /// Returns true if anything notable happened.
    fn step(&mut self) -> bool {
        self.current_index += 1;

        let order_triggered = self.check_pending_orders();
        let risk_triggered = if self.is_active() {
            self.check_risk_triggers()
        } else {
            false
        };

        let equity = self.total_asset_value();
        let date = self.current_bar().date;
        self.equity_history.push(EquitySnapshot { date, equity });

        let bankrupt = self.check_bankruptcy();
        order_triggered || risk_triggered || bankrupt
    }

    /// Close every open position, refund every pending order, and transition
    /// to `Settled`. Idempotent once settled.
    ///
    /// Forced settlement (end of data, bankruptcy) uses the current bar's
    /// close as the reference price; a user-initiated settle uses the open.
    pub fn settle_portfolio(&mut self, forced: bool) {
        if self.status == SimStatus::Settled {
            return;
        }
        self.in_settlement = true;

        let bar = self.current_bar();
        let settle_price = if forced { bar.close } else { bar.open };
        let reason = if forced {
            CloseReason::ForcedSettlement
        } else {
            CloseReason::ManualSettlement
        };

        let open_lots: Vec<_> = self.positions.iter().map(|p| (p.id, p.quantity)).collect();
        for (id, quantity) in open_lots {
            // the id was just read from the book; a failure here means the
            // book changed underneath us, which step ordering rules out
            let _ = self.close_position_lot(id, quantity, settle_price, reason);
        }

        let refunds: f64 = self.pending_orders.iter().map(|o| o.locked_funds).sum();
        self.account.cash_balance += refunds;
        self.pending_orders.clear();

        self.status = SimStatus::Settled;
        self.in_settlement = false;

        let final_asset = self.total_asset_value();
        let total_pnl = final_asset - self.config.initial_capital;
        self.settlement = Some(SettlementStats {
            final_asset,
            total_pnl,
            roi: total_pnl / self.config.initial_capital * 100.0,
            start_date: self.start_date,
            end_date: self.current_bar().date,
        });
        self.push_event(Event::Settled { forced });
    }
}
