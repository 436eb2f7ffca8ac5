//! SimulationState — the single owned aggregate every operation mutates.
//!
//! Holds the account ledger, the position book, the pending-order book, the
//! transaction log, the equity history, and the clock position. All trading
//! operations are `impl SimulationState` blocks in the sibling modules; there
//! is no hidden process-wide state.

use crate::config::SimConfig;
use crate::domain::{
    Bar, BarSeries, Event, PendingOrder, Position, PositionId, Transaction,
};
use crate::engine::clock::SettlementStats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimStatus {
    /// Accepting trades and stepping forward.
    Active,
    /// Terminal: read access only.
    Settled,
}

/// One point on the total-asset curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Aggregate view of all open spot lots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpotSummary {
    pub quantity: f64,
    pub avg_cost: f64,
    pub unrealized_pnl: f64,
}

/// The cash ledger. Balance may only go negative transiently inside an
/// operation that rolls the debit back before returning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Account {
    pub cash_balance: f64,
}

pub struct SimulationState {
    pub(crate) config: SimConfig,
    pub(crate) bars: BarSeries,
    pub(crate) current_index: usize,
    pub(crate) max_index: usize,
    pub(crate) status: SimStatus,
    pub(crate) account: Account,
    pub(crate) positions: Vec<Position>,
    pub(crate) pending_orders: Vec<PendingOrder>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) equity_history: Vec<EquitySnapshot>,
    pub(crate) events: Vec<Event>,
    pub(crate) settlement: Option<SettlementStats>,
    pub(crate) start_date: NaiveDate,
    pub(crate) next_position_id: u64,
    pub(crate) next_order_id: u64,
    /// Re-entrancy guard: bankruptcy checks fired by closes during settlement
    /// must not start a second settlement.
    pub(crate) in_settlement: bool,
}

impl SimulationState {
    /// Start a simulation over `bars`, with the clock at `start_index`
    /// (the first tradable bar; everything before it is observation history).
    ///
    /// `start_index` is clipped to the final bar. The equity history is seeded
    /// with one snapshot at the start date.
    pub fn new(bars: BarSeries, start_index: usize, config: SimConfig) -> Self {
        let start_index = start_index.min(bars.last_index());
        let max_index = bars.last_index();
        let start_date = bars[start_index].date;
        let initial_capital = config.initial_capital;
        Self {
            config,
            bars,
            current_index: start_index,
            max_index,
            status: SimStatus::Active,
            account: Account {
                cash_balance: initial_capital,
            },
            positions: Vec::new(),
            pending_orders: Vec::new(),
            transactions: Vec::new(),
            equity_history: vec![EquitySnapshot {
                date: start_date,
                equity: initial_capital,
            }],
            events: Vec::new(),
            settlement: None,
            start_date,
            next_position_id: 1,
            next_order_id: 1,
            in_settlement: false,
        }
    }

    // ── Read-only view ─────────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn bars(&self) -> &BarSeries {
        &self.bars
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn max_index(&self) -> usize {
        self.max_index
    }

    pub fn current_bar(&self) -> &Bar {
        &self.bars[self.current_index.min(self.max_index)]
    }

    pub fn status(&self) -> SimStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SimStatus::Active
    }

    pub fn cash_balance(&self) -> f64 {
        self.account.cash_balance
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn pending_orders(&self) -> &[PendingOrder] {
        &self.pending_orders
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn equity_history(&self) -> &[EquitySnapshot] {
        &self.equity_history
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Final performance stats; `Some` once settled.
    pub fn settlement(&self) -> Option<&SettlementStats> {
        self.settlement.as_ref()
    }

    /// Drain the events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    // ── Valuation ──────────────────────────────────────────────────────

    /// Price positions are marked at: the current bar's open while active.
    pub fn mark_price(&self) -> f64 {
        self.current_bar().open
    }

    /// Funds reserved across all pending orders.
    pub fn locked_funds(&self) -> f64 {
        self.pending_orders.iter().map(|o| o.locked_funds).sum()
    }

    /// Total asset value: cash + locked order funds + position net values,
    /// marked at the current bar's open. Collapses to cash once settled.
    pub fn total_asset_value(&self) -> f64 {
        if !self.is_active() {
            return self.account.cash_balance;
        }
        let price = self.mark_price();
        let position_value: f64 = self.positions.iter().map(|p| p.net_value(price)).sum();
        self.account.cash_balance + self.locked_funds() + position_value
    }

    /// Unrealized P&L across all open positions at the current mark price.
    pub fn total_unrealized_pnl(&self) -> f64 {
        let price = self.mark_price();
        self.positions.iter().map(|p| p.unrealized_pnl(price)).sum()
    }

    /// Aggregate of all open spot lots (quantity-weighted average cost).
    pub fn spot_summary(&self) -> SpotSummary {
        let price = self.mark_price();
        let spot: Vec<&Position> = self
            .positions
            .iter()
            .filter(|p| !p.mode.is_margin())
            .collect();
        if spot.is_empty() {
            return SpotSummary::default();
        }
        let quantity: f64 = spot.iter().map(|p| p.quantity).sum();
        let cost: f64 = spot.iter().map(|p| p.quantity * p.unit_price).sum();
        SpotSummary {
            quantity,
            avg_cost: if quantity > 0.0 { cost / quantity } else { 0.0 },
            unrealized_pnl: spot.iter().map(|p| p.unrealized_pnl(price)).sum(),
        }
    }

    // ── Bankruptcy ─────────────────────────────────────────────────────

    /// Total asset ≤ 0 is terminal: force-settle and report. Returns true if
    /// the account is bankrupt (whether or not this call performed the
    /// settlement).
    pub(crate) fn check_bankruptcy(&mut self) -> bool {
        if self.total_asset_value() > 0.0 {
            return false;
        }
        if self.is_active() && !self.in_settlement {
            self.settle_portfolio(true);
            self.push_event(Event::Bankruptcy);
        }
        true
    }
}
