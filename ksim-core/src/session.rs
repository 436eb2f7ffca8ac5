//! Session setup: pick a random simulation window out of a longer history.
//!
//! A session shows the user `observation_days` bars of history first, then
//! starts the clock on the bar after the observation period. The window start
//! is drawn randomly so repeated sessions on the same ticker replay different
//! stretches; pass a seeded RNG for reproducible runs.

use crate::config::SimConfig;
use crate::domain::BarSeries;
use crate::engine::state::SimulationState;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("history too short: {have} bars, need at least {need}")]
    InsufficientHistory { have: usize, need: usize },
}

/// A chosen simulation window within the full history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    /// First bar of the window (start of the observation period).
    pub view_start: usize,
    /// Bars in the window.
    pub len: usize,
    /// Clock start, relative to the window.
    pub sim_start: usize,
}

/// Pick a random window of `observation + min_simulation` bars (shorter when
/// the history cannot cover it, as long as the observation period plus at
/// least one tradable bar fit).
pub fn select_window<R: Rng>(
    total_bars: usize,
    config: &SimConfig,
    rng: &mut R,
) -> Result<SessionWindow, SessionError> {
    let observation = config.observation_days;
    let required = config.required_history();
    if total_bars <= observation {
        return Err(SessionError::InsufficientHistory {
            have: total_bars,
            need: observation + 1,
        });
    }
    let window_len = required.min(total_bars);
    let max_start = total_bars - window_len;
    let view_start = if max_start == 0 {
        0
    } else {
        rng.gen_range(0..=max_start)
    };
    Ok(SessionWindow {
        view_start,
        len: window_len,
        sim_start: observation,
    })
}

/// Truncate `bars` to a randomly selected window and start a simulation on it.
pub fn start_session<R: Rng>(
    bars: &BarSeries,
    config: SimConfig,
    rng: &mut R,
) -> Result<SimulationState, SessionError> {
    let window = select_window(bars.len(), &config, rng)?;
    let truncated = bars.window(window.view_start, window.len);
    Ok(SimulationState::new(truncated, window.sim_start, config))
}
