//! The bot call contract and the safe-mode invocation wrapper.

use std::panic::{catch_unwind, AssertUnwindSafe};

use glam::DVec2;

use regatta_core::errors::BotError;
use regatta_core::instructions::Instructions;
use regatta_core::types::Checkpoint;
use regatta_terrain::TerrainGrid;
use regatta_weather::Forecast;

/// Everything a pilot gets to see on one tick.
pub struct BotInputs<'a> {
    /// Sim time since race start, hours.
    pub t: f64,
    /// Tick duration, sim hours.
    pub dt: f64,
    pub longitude: f64,
    pub latitude: f64,
    /// Degrees, 0 = East, 90 = North.
    pub heading: f64,
    /// km/h.
    pub speed: f64,
    /// Unit vector of the current heading.
    pub vector: DVec2,
    /// Imperfect foreknowledge of the wind.
    pub forecast: &'a Forecast,
    /// Sea/land lookup.
    pub terrain: &'a TerrainGrid,
}

/// A ship-controlling bot. Implemented by external collaborators; the
/// engine only relies on this contract.
pub trait Pilot: Send {
    /// Unique team identifier.
    fn team(&self) -> &str;

    /// Intended route, for optional course-preview rendering only.
    /// Never enforced.
    fn course(&self) -> Vec<Checkpoint> {
        Vec::new()
    }

    /// Called once per tick while the ship is still racing. `Ok(None)`
    /// means "no change this tick".
    fn run(&mut self, inputs: &BotInputs<'_>) -> Result<Option<Instructions>, BotError>;
}

/// Invoke a pilot with panic isolation.
///
/// A panicking bot must not take its shard down in safe mode, so the
/// unwind is caught here and converted into a [`BotError`]; the engine
/// decides whether to swallow or propagate it.
pub fn invoke_pilot(
    pilot: &mut dyn Pilot,
    inputs: &BotInputs<'_>,
) -> Result<Option<Instructions>, BotError> {
    match catch_unwind(AssertUnwindSafe(|| pilot.run(inputs))) {
        Ok(result) => result,
        Err(payload) => Err(BotError::Panicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
