//! Bar and BarSeries — the immutable price history the simulation replays.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Basic OHLCV sanity check: positive prices, high/low bracket open and close.
    pub fn is_sane(&self) -> bool {
        self.open > 0.0
            && self.close > 0.0
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarError {
    #[error("bar series is empty")]
    Empty,

    #[error("bar {0} fails OHLC sanity (high/low must bracket open/close, prices positive)")]
    Insane(usize),

    #[error("bar dates not strictly increasing at index {0}")]
    OutOfOrder(usize),
}

/// Immutable, ordered, sanity-checked bar sequence indexed 0..N-1.
///
/// Supplied once at simulation start; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        if bars.is_empty() {
            return Err(BarError::Empty);
        }
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(BarError::Insane(i));
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(BarError::OutOfOrder(i));
            }
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Index of the final bar.
    pub fn last_index(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> &Bar {
        // non-empty by construction
        self.bars.last().unwrap()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    /// Sub-series `[start, start + len)`, clipped to the available range.
    pub fn window(&self, start: usize, len: usize) -> Self {
        let start = start.min(self.bars.len());
        let end = (start + len).min(self.bars.len());
        Self {
            bars: self.bars[start..end].to_vec(),
        }
    }
}

impl std::ops::Index<usize> for BarSeries {
    type Output = Bar;

    fn index(&self, index: usize) -> &Bar {
        &self.bars[index]
    }
}
