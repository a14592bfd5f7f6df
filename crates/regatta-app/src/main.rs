//! Headless demo race: a handful of course-following pilots on a
//! synthetic ocean with one island, standings logged as they sail.
//!
//! Usage: `regatta-app [config.json] [terrain.bin]`. The config file is
//! a JSON `RaceConfig`; the terrain file is the binary sea-mask cache
//! format. Both fall back to built-in demo values.

use std::error::Error;
use std::path::Path;

use log::info;

use regatta_app::orchestrator::{self, RaceOutcome};
use regatta_app::render::LogSink;
use regatta_core::config::RaceConfig;
use regatta_core::errors::BotError;
use regatta_core::geo;
use regatta_core::instructions::Instructions;
use regatta_core::types::{Checkpoint, Location};
use regatta_sim::bot::{BotInputs, Pilot};
use regatta_terrain::{cache, TerrainGrid};

/// Sails the configured course: full sail toward the next checkpoint it
/// has not yet passed, then back to the finish.
struct CourseFollower {
    team: String,
    course: Vec<Checkpoint>,
    finish: Location,
    next: usize,
}

impl CourseFollower {
    fn boxed(team: &str, config: &RaceConfig) -> Box<dyn Pilot> {
        Box::new(Self {
            team: team.to_string(),
            course: config.checkpoints.clone(),
            finish: config.start.location(),
            next: 0,
        })
    }
}

impl Pilot for CourseFollower {
    fn team(&self) -> &str {
        &self.team
    }

    fn course(&self) -> Vec<Checkpoint> {
        self.course.clone()
    }

    fn run(&mut self, inputs: &BotInputs<'_>) -> Result<Option<Instructions>, BotError> {
        while let Some(checkpoint) = self.course.get(self.next) {
            let d = geo::distance_on_surface(
                inputs.longitude,
                inputs.latitude,
                checkpoint.longitude,
                checkpoint.latitude,
            );
            if d >= checkpoint.radius {
                break;
            }
            self.next += 1;
        }
        let target = self
            .course
            .get(self.next)
            .map(Checkpoint::location)
            .unwrap_or(self.finish);
        Ok(Some(Instructions::goto(target).with_sail(1.0)))
    }
}

fn demo_config() -> RaceConfig {
    RaceConfig {
        // A couple of simulated weeks squeezed into half a real minute.
        time_limit: 30.0,
        seconds_to_hours: 12.0,
        weather_resolution: 64,
        ..RaceConfig::default()
    }
}

/// Open ocean with one island in the mid-Atlantic, coarse 2-degree cells.
fn demo_terrain() -> TerrainGrid {
    let width = 180;
    let height = 90;
    let mut rows = vec![vec![1u8; width]; height];
    for row in rows.iter_mut().take(52).skip(48) {
        for cell in row.iter_mut().take(78).skip(74) {
            *cell = 0;
        }
    }
    TerrainGrid::from_rows(&rows)
}

fn load_inputs(args: &[String]) -> Result<(RaceConfig, TerrainGrid), Box<dyn Error>> {
    let config = match args.first() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => demo_config(),
    };
    let terrain = match args.get(1) {
        Some(path) => cache::load(Path::new(path))?,
        None => demo_terrain(),
    };
    Ok((config, terrain))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config, terrain) = load_inputs(&args)?;

    let teams = ["albatross", "petrel", "kestrel", "frigatebird"];
    let bots: Vec<Box<dyn Pilot>> = teams
        .iter()
        .map(|team| CourseFollower::boxed(team, &config))
        .collect();

    let mut sink = LogSink::new(2.0);
    let RaceOutcome {
        leaderboard,
        fastest_times,
    } = orchestrator::run_race(bots, config, terrain, 42, 2, &mut sink)?;

    for entry in &leaderboard {
        info!(
            "{}: +{} this round, {} total",
            entry.team, entry.round_score, entry.total_score
        );
    }
    for time in &fastest_times {
        info!("fastest: {} in {:.1} simulated hours", time.team, time.hours);
    }
    Ok(())
}
