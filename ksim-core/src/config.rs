//! Simulation configuration: fee rates, leverage bounds, window sizes, asset classes.

use crate::domain::mode::TradeMode;
use serde::{Deserialize, Serialize};

/// Asset class being simulated. Selects the quantity granularity and the
/// display unit; fee rates are shared across classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Stock,
    Forex,
    Crypto,
}

impl AssetClass {
    /// Human-readable unit label for quantities of this class.
    pub fn unit(self) -> &'static str {
        match self {
            AssetClass::Stock => "shares",
            AssetClass::Forex => "lots",
            AssetClass::Crypto => "coins",
        }
    }

    /// Smallest order quantity (and quantity step) accepted for this class.
    pub fn min_quantity(self) -> f64 {
        match self {
            AssetClass::Stock => 1.0,
            AssetClass::Forex => 100.0,
            AssetClass::Crypto => 0.001,
        }
    }

    /// Default order quantity offered by the front end.
    pub fn default_quantity(self) -> f64 {
        match self {
            AssetClass::Stock => 1000.0,
            AssetClass::Forex => 100.0,
            AssetClass::Crypto => 1.0,
        }
    }
}

/// Engine configuration. Field defaults match the original Ksim rules:
/// 0.5% spot fee, 1% margin fee, 1x–20x leverage, 250 observation bars
/// before the clock starts, 720 simulated bars minimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub initial_capital: f64,
    pub spot_fee_rate: f64,
    pub margin_fee_rate: f64,
    pub min_leverage: f64,
    pub max_leverage: f64,
    /// Bars shown to the user before the first tradable bar.
    pub observation_days: usize,
    /// Bars the simulation window should hold beyond the observation period.
    pub min_simulation_days: usize,
    pub asset_class: AssetClass,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            spot_fee_rate: 0.005,
            margin_fee_rate: 0.01,
            min_leverage: 1.0,
            max_leverage: 20.0,
            observation_days: 250,
            min_simulation_days: 720,
            asset_class: AssetClass::Stock,
        }
    }
}

impl SimConfig {
    /// Fee rate applied to a trade in the given mode.
    pub fn fee_rate(&self, mode: TradeMode) -> f64 {
        if mode.is_margin() {
            self.margin_fee_rate
        } else {
            self.spot_fee_rate
        }
    }

    /// Clamp a requested leverage into the configured bounds.
    pub fn clamp_leverage(&self, leverage: f64) -> f64 {
        leverage.clamp(self.min_leverage, self.max_leverage)
    }

    /// Total bars a full-length session window needs.
    pub fn required_history(&self) -> usize {
        self.observation_days + self.min_simulation_days
    }
}
