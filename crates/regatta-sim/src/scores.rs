//! Checkpoint/arrival state to points, leaderboards, and persistence.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{info, warn};

use regatta_core::config::RaceConfig;
use regatta_core::errors::ScoreIoError;
use regatta_core::geo::distance_on_surface;
use regatta_core::state::{FastestTime, LeaderboardEntry};

use crate::player::Player;

/// Live points for the leaderboard, recomputable every tick.
///
/// `checkpoints_reached * score_step + finish_bonus` plus a distance
/// tiebreaker of `score_step - floor(distance to the next objective)`.
/// The next objective is the finish point once every checkpoint is
/// reached, otherwise the nearest not-yet-reached checkpoint; exactly one
/// distance term is added.
pub fn live_points(player: &Player, config: &RaceConfig) -> i64 {
    let reached = player.checkpoints_reached() as i64;
    let mut points = reached * config.score_step + player.bonus;

    let next_objective = player
        .checkpoints
        .iter()
        .filter(|c| !c.reached)
        .map(|c| {
            distance_on_surface(
                player.longitude,
                player.latitude,
                c.longitude,
                c.latitude,
            )
        })
        .fold(None::<f64>, |best, d| {
            Some(best.map_or(d, |b| b.min(d)))
        });

    let dist = next_objective.unwrap_or_else(|| {
        distance_on_surface(
            player.longitude,
            player.latitude,
            config.start.longitude,
            config.start.latitude,
        )
    });

    points += config.score_step - dist.floor() as i64;
    points
}

/// Rank teams by live points, descending; ties broken by team name so
/// rankings are stable across runs.
pub fn rank_teams(points_by_team: &[(String, i64)]) -> Vec<String> {
    let mut ranked: Vec<_> = points_by_team.to_vec();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(team, _)| team).collect()
}

/// End-of-round finalization: walk the global ranking, hand out the
/// points-for-grabs table, merge into cumulative persisted scores.
///
/// `own_teams` limits which teams this caller persists (each shard owns
/// its own players); the returned leaderboard covers the full ranking.
pub fn finalize_scores(
    ranking: &[String],
    config: &RaceConfig,
    store: &dyn ScoreStore,
    own_teams: &[String],
) -> Result<Vec<LeaderboardEntry>, ScoreIoError> {
    let all_teams: Vec<String> = ranking.to_vec();
    let cumulative = store.read_scores(&all_teams)?;

    let mut leaderboard = Vec::with_capacity(ranking.len());
    for (rank, team) in ranking.iter().enumerate() {
        let round_score = config.points_for_grabs.get(rank).copied().unwrap_or(0);
        let total_score = cumulative.get(team).copied().unwrap_or(0) + round_score;
        leaderboard.push(LeaderboardEntry {
            team: team.clone(),
            round_score,
            total_score,
        });
    }

    let own: HashMap<String, i64> = leaderboard
        .iter()
        .filter(|e| own_teams.contains(&e.team))
        .map(|e| (e.team.clone(), e.total_score))
        .collect();
    store.write_scores(&own)?;

    for entry in &leaderboard {
        info!(
            "final: {} scored {} this round ({} total)",
            entry.team, entry.round_score, entry.total_score
        );
    }
    Ok(leaderboard)
}

/// Merge this round's arrival times into the persisted per-team minima
/// and return the top finishers, fastest first.
pub fn finalize_fastest_times(
    arrivals: &HashMap<String, f64>,
    store: &dyn ScoreStore,
    own_teams: &[String],
) -> Result<Vec<FastestTime>, ScoreIoError> {
    let teams: Vec<String> = own_teams.to_vec();
    let mut best = store.read_fastest_times(&teams)?;
    for (team, &hours) in arrivals {
        let entry = best.entry(team.clone()).or_insert(f64::INFINITY);
        if hours < *entry {
            *entry = hours;
        }
    }
    store.write_fastest_times(&best)?;

    let mut times: Vec<FastestTime> = best
        .into_iter()
        .map(|(team, hours)| FastestTime { team, hours })
        .collect();
    times.sort_by(|a, b| a.hours.total_cmp(&b.hours).then_with(|| a.team.cmp(&b.team)));
    Ok(times)
}

/// Score/time persistence collaborator, keyed by team name.
pub trait ScoreStore: Send + Sync {
    /// Cumulative scores; missing teams default to 0.
    fn read_scores(&self, teams: &[String]) -> Result<HashMap<String, i64>, ScoreIoError>;
    fn write_scores(&self, scores: &HashMap<String, i64>) -> Result<(), ScoreIoError>;
    /// Best finish times in sim hours; missing teams default to infinity.
    fn read_fastest_times(&self, teams: &[String]) -> Result<HashMap<String, f64>, ScoreIoError>;
    fn write_fastest_times(&self, times: &HashMap<String, f64>) -> Result<(), ScoreIoError>;
}

/// `ScoreStore` over plain text files: one `team: value` line per team,
/// `scores.txt` and `times.txt` under the configured directory.
pub struct FileScoreStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileScoreStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Locked read: the rewrite path truncates the file before writing,
    /// so an unlocked reader could observe a half-written file.
    fn read_records(&self, file: &str) -> Result<HashMap<String, String>, ScoreIoError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_records_unlocked(file)
    }

    fn read_records_unlocked(&self, file: &str) -> Result<HashMap<String, String>, ScoreIoError> {
        let path = self.dir.join(file);
        let mut records = HashMap::new();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (team, value) = line
                .split_once(':')
                .ok_or_else(|| ScoreIoError::Malformed(line.to_string()))?;
            records.insert(team.trim().to_string(), value.trim().to_string());
        }
        Ok(records)
    }

    fn write_records(
        &self,
        file: &str,
        updates: impl Iterator<Item = (String, String)>,
    ) -> Result<(), ScoreIoError> {
        // Read-merge-rewrite under the lock: shards only ever write their
        // own teams but share the file.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.read_records_unlocked(file)?;
        records.extend(updates);

        std::fs::create_dir_all(&self.dir)?;
        let mut lines: Vec<_> = records.into_iter().collect();
        lines.sort();
        let mut out = std::fs::File::create(self.dir.join(file))?;
        for (team, value) in lines {
            writeln!(out, "{team}: {value}")?;
        }
        Ok(())
    }
}

impl ScoreStore for FileScoreStore {
    fn read_scores(&self, teams: &[String]) -> Result<HashMap<String, i64>, ScoreIoError> {
        let records = self.read_records("scores.txt")?;
        let mut scores = HashMap::new();
        for team in teams {
            let value = match records.get(team) {
                Some(raw) => raw
                    .parse::<i64>()
                    .map_err(|_| ScoreIoError::Malformed(raw.clone()))?,
                None => 0,
            };
            scores.insert(team.clone(), value);
        }
        Ok(scores)
    }

    fn write_scores(&self, scores: &HashMap<String, i64>) -> Result<(), ScoreIoError> {
        self.write_records(
            "scores.txt",
            scores.iter().map(|(t, v)| (t.clone(), v.to_string())),
        )
    }

    fn read_fastest_times(&self, teams: &[String]) -> Result<HashMap<String, f64>, ScoreIoError> {
        let records = self.read_records("times.txt")?;
        let mut times = HashMap::new();
        for team in teams {
            let value = match records.get(team) {
                Some(raw) => raw
                    .parse::<f64>()
                    .map_err(|_| ScoreIoError::Malformed(raw.clone()))?,
                None => f64::INFINITY,
            };
            times.insert(team.clone(), value);
        }
        Ok(times)
    }

    fn write_fastest_times(&self, times: &HashMap<String, f64>) -> Result<(), ScoreIoError> {
        self.write_records(
            "times.txt",
            times
                .iter()
                .filter(|(_, v)| v.is_finite())
                .map(|(t, v)| (t.clone(), v.to_string())),
        )
    }
}

/// In-memory store for tests and throwaway races.
#[derive(Default)]
pub struct MemoryScoreStore {
    scores: Mutex<HashMap<String, i64>>,
    times: Mutex<HashMap<String, f64>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn read_scores(&self, teams: &[String]) -> Result<HashMap<String, i64>, ScoreIoError> {
        let stored = self.scores.lock().unwrap_or_else(|e| e.into_inner());
        Ok(teams
            .iter()
            .map(|t| (t.clone(), stored.get(t).copied().unwrap_or(0)))
            .collect())
    }

    fn write_scores(&self, scores: &HashMap<String, i64>) -> Result<(), ScoreIoError> {
        self.scores
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(scores.iter().map(|(t, v)| (t.clone(), *v)));
        Ok(())
    }

    fn read_fastest_times(&self, teams: &[String]) -> Result<HashMap<String, f64>, ScoreIoError> {
        let stored = self.times.lock().unwrap_or_else(|e| e.into_inner());
        Ok(teams
            .iter()
            .map(|t| (t.clone(), stored.get(t).copied().unwrap_or(f64::INFINITY)))
            .collect())
    }

    fn write_fastest_times(&self, times: &HashMap<String, f64>) -> Result<(), ScoreIoError> {
        self.times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(times.iter().map(|(t, v)| (t.clone(), *v)));
        Ok(())
    }
}

/// Log a persistence failure without letting it abort a shutdown path.
pub fn log_store_error(context: &str, result: Result<(), ScoreIoError>) {
    if let Err(e) = result {
        warn!("{context}: {e}");
    }
}
