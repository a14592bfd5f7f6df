//! Race configuration.
//!
//! One immutable `RaceConfig` is built at startup and passed by reference
//! into every component constructor. There is no ambient global state.

use serde::{Deserialize, Serialize};

use crate::types::{Checkpoint, Location};

/// Full configuration for one race. Defaults reproduce the standard
/// round-the-world course starting off Les Sables-d'Olonne.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Start/finish point with its finish radius (km).
    pub start: Checkpoint,
    /// Course checkpoint templates, cloned per player at race start.
    pub checkpoints: Vec<Checkpoint>,

    /// Race time limit in real seconds.
    pub time_limit: f64,
    /// Simulated hours per real second.
    pub seconds_to_hours: f64,
    /// Engine frame rate: minimum real-time interval between ticks is
    /// `1 / fps` seconds.
    pub fps: f64,

    /// Points per completed objective; also the scale of the live
    /// distance tiebreaker. Must exceed the largest possible surface
    /// distance (~pi * R km) so checkpoint count dominates ordering.
    pub score_step: i64,
    /// End-of-round points awarded to ranks 1..N.
    pub points_for_grabs: Vec<i64>,
    /// Directory for persisted scores and fastest times.
    pub scores_dir: String,

    /// Catch bot failures and treat them as "no instructions" instead of
    /// propagating. Disable for debugging.
    pub safe_mode: bool,
    /// Optional common start override (e.g. for testing a leg).
    pub start_override: Option<Location>,

    /// Wind grid latitude buckets (longitude buckets = 2x this).
    pub weather_resolution: usize,
    /// Number of random impulse seeds in the wind potential.
    pub weather_seeds: usize,
    /// Gaussian smoothing sigma, in grid cells.
    pub weather_sigma: f64,
    /// Maximum sustained wind speed (km/h).
    pub max_wind_speed: f64,
    /// Simulated hours between wind time buckets (and between forecast
    /// lead times).
    pub weather_update_interval: f64,
    /// Forecast horizon in simulated days.
    pub forecast_length_days: f64,
    /// Real seconds between forecast refreshes handed to bots.
    pub forecast_refresh_interval: f64,

    /// Total cosmetic wind tracers across all shards.
    pub ntracers: usize,
    /// Ring length of the tracer trail buffer.
    pub tracer_lifetime: usize,
    /// Tracers recycled to fresh random positions each tick, per shard.
    pub tracer_renewal_batch: usize,

    /// Downsampled track points published per player for rendering.
    pub max_track_length: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            start: Checkpoint::new(48.333422, -4.773949, 5.0),
            checkpoints: vec![
                Checkpoint::new(2.806318, -168.943864, 2000.0),
                Checkpoint::new(-15.668984, 77.674694, 1200.0),
            ],
            time_limit: 8.0 * 60.0,
            seconds_to_hours: 1.0,
            fps: 30.0,
            score_step: 25_000,
            points_for_grabs: vec![25, 18, 15, 12, 10, 8, 6, 4, 2, 1],
            scores_dir: ".scores".into(),
            safe_mode: true,
            start_override: None,
            weather_resolution: 128,
            weather_seeds: 100,
            weather_sigma: 10.0,
            max_wind_speed: 10.0,
            weather_update_interval: 12.0,
            forecast_length_days: 5.0,
            forecast_refresh_interval: 5.0,
            ntracers: 5000,
            tracer_lifetime: 50,
            tracer_renewal_batch: 5,
            max_track_length: 1000,
        }
    }
}

impl RaceConfig {
    /// Total simulated hours in the race.
    pub fn sim_hours(&self) -> f64 {
        self.time_limit * self.seconds_to_hours
    }

    /// Number of wind time buckets covering the race, at least 1.
    pub fn weather_time_buckets(&self) -> usize {
        let buckets = (self.sim_hours() / self.weather_update_interval).ceil() as usize;
        buckets.max(1)
    }

    /// Number of forecast lead-time slices, at least 1.
    pub fn forecast_leads(&self) -> usize {
        let leads =
            (self.forecast_length_days * 24.0 / self.weather_update_interval).ceil() as usize;
        leads.max(1)
    }

    /// Common start location for all players.
    pub fn start_location(&self) -> Location {
        self.start_override
            .unwrap_or_else(|| self.start.location())
    }
}
