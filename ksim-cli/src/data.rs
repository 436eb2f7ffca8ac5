//! Bar-series sources for the CLI: CSV files and a synthetic random walk.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ksim_core::{Bar, BarSeries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::Path;

/// One CSV row: `Date,Open,High,Low,Close,Volume` with ISO dates.
#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "date", alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "open", alias = "Open")]
    open: f64,
    #[serde(alias = "high", alias = "High")]
    high: f64,
    #[serde(alias = "low", alias = "Low")]
    low: f64,
    #[serde(alias = "close", alias = "Close")]
    close: f64,
    #[serde(alias = "volume", alias = "Volume")]
    volume: f64,
}

/// Load a bar series from a CSV file.
pub fn load_csv(path: &Path) -> Result<BarSeries> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvBar>().enumerate() {
        let row = row.with_context(|| format!("bad CSV row {}", i + 2))?;
        bars.push(Bar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    BarSeries::new(bars).context("invalid bar series")
}

/// Geometric random walk, seeded for reproducible demo runs.
pub fn synthetic_series(n: usize, seed: u64) -> BarSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let mut price = 100.0f64;
    let bars = (0..n)
        .map(|i| {
            let drift: f64 = rng.gen_range(-0.025..0.026);
            let open = price;
            price = (price * (1.0 + drift)).max(0.5);
            let close = price;
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.015));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.015));
            Bar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(10_000.0..500_000.0),
            }
        })
        .collect();
    BarSeries::new(bars).expect("synthetic walk is always sane")
}
