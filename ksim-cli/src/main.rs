//! Ksim CLI — drive a simulated trading session from the terminal.
//!
//! Commands:
//! - `run` — replay a bar series (CSV or synthetic) under a scripted demo
//!   strategy and print events, the equity curve endpoints, and the
//!   settlement report
//! - `inspect` — validate a CSV bar series and print its date range

mod data;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ksim_core::{
    session, Event, OrderKind, Severity, SimConfig, SimulationState, TradeMode,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ksim", about = "Ksim — bar-by-bar trading simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo session over a bar series.
    Run {
        /// CSV file with Date,Open,High,Low,Close,Volume columns.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Generate a synthetic series of this many bars instead.
        #[arg(long, default_value_t = 1200)]
        synthetic: usize,

        /// RNG seed for window selection and synthetic data.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// TOML file overriding the engine configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bars to advance per auto-play step.
        #[arg(long, default_value_t = 10)]
        batch: usize,

        /// Write the transaction log and equity curve as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate a CSV bar series and print its range.
    Inspect {
        csv: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            csv,
            synthetic,
            seed,
            config,
            batch,
            report,
        } => run(csv, synthetic, seed, config, batch, report),
        Commands::Inspect { csv } => inspect(&csv),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig> {
    match path {
        None => Ok(SimConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            toml::from_str(&text).context("invalid config file")
        }
    }
}

fn run(
    csv: Option<PathBuf>,
    synthetic: usize,
    seed: u64,
    config_path: Option<PathBuf>,
    batch: usize,
    report: Option<PathBuf>,
) -> Result<()> {
    if batch == 0 {
        bail!("--batch must be at least 1");
    }
    let mut config = load_config(config_path.as_ref())?;
    let bars = match csv {
        Some(path) => data::load_csv(&path)?,
        None => {
            // shrink the window so short synthetic runs still start
            config.observation_days = config.observation_days.min(synthetic / 4);
            data::synthetic_series(synthetic, seed)
        }
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut sim = session::start_session(&bars, config, &mut rng)?;
    println!(
        "session: {} bars, clock starts {} with ${:.0}",
        sim.bars().len(),
        sim.start_date(),
        sim.cash_balance()
    );

    script_demo_trades(&mut sim);
    print_events(&mut sim);

    loop {
        let outcome = sim.advance_n(batch);
        print_events(&mut sim);
        if !outcome.can_continue {
            break;
        }
    }

    let stats = sim
        .settlement()
        .context("advance loop ended without settling")?;
    println!("final asset   ${:.2}", stats.final_asset);
    println!("total p&l     ${:.2}", stats.total_pnl);
    println!("roi           {:.2}%", stats.roi);
    println!("period        {} .. {}", stats.start_date, stats.end_date);
    println!("trades        {}", sim.transactions().len());

    if let Some(path) = report {
        write_report(&sim, &path)?;
        println!("report written to {}", path.display());
    }
    Ok(())
}

/// A small scripted strategy standing in for interactive input: half the
/// capital into spot, a protective stop/target on a leveraged long, and a
/// resting limit bid below the market.
fn script_demo_trades(sim: &mut SimulationState) {
    let open = sim.current_bar().open;
    let spot_qty = (sim.cash_balance() * 0.5 / open).floor().max(1.0);
    let _ = sim.execute_trade(TradeMode::Spot, spot_qty, open, 1.0);

    let margin_qty = (sim.cash_balance() * 0.1 / open).floor().max(1.0);
    if let Ok(id) = sim.execute_trade(TradeMode::MarginLong, margin_qty, open, 3.0) {
        let _ = sim.set_exits(id, open * 0.85, open * 1.3);
    }

    let limit_qty = (sim.cash_balance() * 0.1 / open).floor().max(1.0);
    let _ = sim.place_order(TradeMode::Spot, OrderKind::Limit, limit_qty, open * 0.92, 1.0);
}

fn print_events(sim: &mut SimulationState) {
    let date = sim.current_bar().date;
    for event in sim.drain_events() {
        let tag = match event.severity() {
            Severity::Info => "  ..",
            Severity::Success => "  ok",
            Severity::Error => "  !!",
        };
        println!("{tag} {date} {}", describe(&event));
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::PositionOpened { id, mode, quantity, price } => {
            format!("opened {mode} {id}: {quantity} @ ${price:.2}")
        }
        Event::PositionClosed { id, quantity, price, realized_pnl, reason, .. } => {
            format!("{reason} {id}: {quantity} @ ${price:.2} (p&l ${realized_pnl:.2})")
        }
        Event::OrderPlaced { id, kind, mode, trigger_price, locked_funds } => {
            format!("{kind} order {id} resting: {mode} @ ${trigger_price:.2} (locked ${locked_funds:.2})")
        }
        Event::OrderCancelled { id, refunded } => {
            format!("order {id} cancelled (refunded ${refunded:.2})")
        }
        Event::OrderFilled { id, kind, fill_price, .. } => {
            format!("{kind} order {id} filled @ ${fill_price:.2}")
        }
        Event::OrderUnfundable { id, kind, .. } => {
            format!("{kind} order {id} triggered but could not be funded; cancelled")
        }
        Event::ExitsUpdated { id, stop_loss, take_profit } => {
            format!("{id} exits set: sl ${stop_loss:.2} / tp ${take_profit:.2}")
        }
        Event::Bankruptcy => "total assets depleted; portfolio force-settled".to_string(),
        Event::Settled { forced: true } => "simulation settled (forced)".to_string(),
        Event::Settled { forced: false } => "simulation settled".to_string(),
    }
}

fn write_report(sim: &SimulationState, path: &PathBuf) -> Result<()> {
    let report = serde_json::json!({
        "settlement": sim.settlement(),
        "transactions": sim.transactions(),
        "equity": sim.equity_history(),
    });
    std::fs::write(path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("cannot write {}", path.display()))
}

fn inspect(csv: &PathBuf) -> Result<()> {
    let bars = data::load_csv(csv)?;
    println!(
        "{}: {} bars, {} .. {}",
        csv.display(),
        bars.len(),
        bars[0].date,
        bars.last().date
    );
    Ok(())
}
