//! Race setup and thread lifecycle.
//!
//! One engine thread per shard over a contiguous slice of the roster,
//! plus the caller's thread driving the render sink. The shards share
//! the wind field, terrain, clock, control flags and buffers; nothing
//! else crosses thread boundaries.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

use regatta_core::config::RaceConfig;
use regatta_core::state::{FastestTime, LeaderboardEntry};
use regatta_core::types::RaceClock;
use regatta_sim::bot::Pilot;
use regatta_sim::buffers::{ControlFlags, SharedBuffers, ShardWriter};
use regatta_sim::engine::{Engine, EngineSetup, RaceReport};
use regatta_sim::scores::{FileScoreStore, ScoreStore};
use regatta_terrain::TerrainGrid;
use regatta_weather::WindField;

use crate::render::{RaceView, RenderSink, SinkControl};

/// Merged end-of-race results across all shards.
#[derive(Debug, Clone, Default)]
pub struct RaceOutcome {
    /// Full-roster round leaderboard, best first.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Best finish times on record, fastest first.
    pub fastest_times: Vec<FastestTime>,
}

/// Run one complete race and return the merged outcome.
///
/// Partitions the pilots into `n_shards` contiguous near-even groups,
/// generates the wind once from `seed`, spawns the engine threads, and
/// drives `sink` on the calling thread until every shard has shut down.
/// The sink may stop the race early; the time limit stops it otherwise.
pub fn run_race(
    bots: Vec<Box<dyn Pilot>>,
    config: RaceConfig,
    terrain: TerrainGrid,
    seed: u64,
    n_shards: usize,
    sink: &mut dyn RenderSink,
) -> io::Result<RaceOutcome> {
    if bots.is_empty() {
        return Ok(RaceOutcome::default());
    }
    let n_shards = n_shards.clamp(1, bots.len());
    let roster: Vec<String> = bots.iter().map(|b| b.team().to_string()).collect();
    info!(
        "starting race: {} teams on {} shards, seed {seed}",
        roster.len(),
        n_shards
    );

    let config = Arc::new(config);
    let field = Arc::new(WindField::generate(&config, seed));
    let terrain = Arc::new(terrain);

    let tracer_count = config.ntracers / n_shards;
    let tracer_stride = tracer_count * config.tracer_lifetime * 3;
    let buffers = SharedBuffers::new(
        roster.len(),
        n_shards,
        config.max_track_length,
        tracer_stride,
    );
    let flags = ControlFlags::new(n_shards);

    let start = Instant::now();
    let clock = RaceClock::new(start, config.seconds_to_hours);
    let store: Arc<dyn ScoreStore> = Arc::new(FileScoreStore::new(&config.scores_dir));

    let mut handles = Vec::with_capacity(n_shards);
    let mut bots = bots;
    for (shard, range) in partition(roster.len(), n_shards).into_iter().enumerate() {
        let shard_bots: Vec<Box<dyn Pilot>> = bots.drain(..range.len()).collect();
        let mut engine = Engine::new(EngineSetup {
            shard,
            config: config.clone(),
            clock,
            field: field.clone(),
            terrain: terrain.clone(),
            roster: roster.clone(),
            bots: shard_bots,
            writer: ShardWriter::new(buffers.clone(), shard, range.start, range.end),
            flags: flags.clone(),
            store: store.clone(),
            tracer_count,
            tracer_seed: seed ^ shard as u64,
        });
        let spawned = thread::Builder::new()
            .name(format!("engine-{shard}"))
            .spawn(move || engine.run());
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Wind down whatever already started before bailing out.
                flags.request_stop();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(e);
            }
        }
    }

    let frame = Duration::from_secs_f64(1.0 / config.fps);
    while !flags.all_shut_down() {
        let view = RaceView {
            buffers: &buffers,
            roster: &roster,
            elapsed_seconds: clock.elapsed_seconds(Instant::now()),
        };
        if sink.frame(&view) == SinkControl::Stop {
            flags.request_stop();
        }
        thread::sleep(frame);
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.join() {
            Ok(report) => reports.push(report),
            Err(_) => warn!("an engine thread panicked; its report is lost"),
        }
    }
    Ok(merge_reports(reports))
}

/// Contiguous near-even roster split: sizes differ by at most one.
fn partition(n_players: usize, n_shards: usize) -> Vec<std::ops::Range<usize>> {
    let base = n_players / n_shards;
    let extra = n_players % n_shards;
    let mut ranges = Vec::with_capacity(n_shards);
    let mut begin = 0;
    for shard in 0..n_shards {
        let len = base + usize::from(shard < extra);
        ranges.push(begin..begin + len);
        begin += len;
    }
    ranges
}

/// Every shard computes the same full-roster leaderboard; fastest times
/// are per-shard and need concatenating.
fn merge_reports(reports: Vec<RaceReport>) -> RaceOutcome {
    let leaderboard = reports
        .iter()
        .map(|r| r.leaderboard.clone())
        .max_by_key(|board| board.len())
        .unwrap_or_default();

    let mut fastest_times: Vec<FastestTime> = reports
        .into_iter()
        .flat_map(|r| r.fastest_times)
        .collect();
    fastest_times.sort_by(|a, b| a.hours.total_cmp(&b.hours).then_with(|| a.team.cmp(&b.team)));
    fastest_times.dedup_by(|a, b| a.team == b.team);

    RaceOutcome {
        leaderboard,
        fastest_times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_core::errors::BotError;
    use regatta_core::instructions::Instructions;
    use regatta_core::types::Checkpoint;
    use regatta_sim::bot::BotInputs;

    struct IdlePilot {
        team: String,
    }

    impl Pilot for IdlePilot {
        fn team(&self) -> &str {
            &self.team
        }

        fn run(&mut self, _inputs: &BotInputs<'_>) -> Result<Option<Instructions>, BotError> {
            Ok(None)
        }
    }

    struct StopImmediately;

    impl RenderSink for StopImmediately {
        fn frame(&mut self, _view: &RaceView<'_>) -> SinkControl {
            SinkControl::Stop
        }
    }

    #[test]
    fn test_partition_is_contiguous_and_even() {
        assert_eq!(partition(7, 3), vec![0..3, 3..5, 5..7]);
        assert_eq!(partition(4, 4), vec![0..1, 1..2, 2..3, 3..4]);
        assert_eq!(partition(3, 1), vec![0..3]);
    }

    #[test]
    fn test_sink_can_stop_a_race_early() {
        let config = RaceConfig {
            time_limit: 60.0,
            fps: 30.0,
            weather_resolution: 8,
            weather_seeds: 5,
            weather_sigma: 1.5,
            ntracers: 16,
            tracer_lifetime: 3,
            max_track_length: 8,
            scores_dir: format!(
                "{}/regatta-orc-{}",
                std::env::temp_dir().display(),
                std::process::id()
            ),
            start: Checkpoint::new(0.0, 0.0, 10.0),
            checkpoints: vec![Checkpoint::new(0.0, -120.0, 50.0)],
            ..RaceConfig::default()
        };
        let scores_dir = config.scores_dir.clone();
        let bots: Vec<Box<dyn Pilot>> = vec![
            Box::new(IdlePilot { team: "a".into() }),
            Box::new(IdlePilot { team: "b".into() }),
            Box::new(IdlePilot { team: "c".into() }),
        ];
        let outcome = run_race(
            bots,
            config,
            TerrainGrid::all_sea(8, 4),
            1,
            2,
            &mut StopImmediately,
        )
        .unwrap();
        assert_eq!(outcome.leaderboard.len(), 3);
        assert_eq!(outcome.leaderboard[0].round_score, 25);
        std::fs::remove_dir_all(scores_dir).ok();
    }

    #[test]
    fn test_empty_roster_is_a_noop() {
        let outcome = run_race(
            Vec::new(),
            RaceConfig::default(),
            TerrainGrid::all_sea(4, 2),
            1,
            4,
            &mut StopImmediately,
        )
        .unwrap();
        assert!(outcome.leaderboard.is_empty());
    }
}
