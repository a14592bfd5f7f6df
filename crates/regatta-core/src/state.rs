//! Read-only display rows published across the render boundary.

use serde::{Deserialize, Serialize};

/// Per-player status row mirrored into the shared status table each tick.
///
/// Column order matches the shared buffer layout: points, distance
/// travelled (km), speed (km/h), checkpoints reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatusRow {
    pub points: f64,
    pub distance_travelled: f64,
    pub speed: f64,
    pub checkpoints_reached: f64,
}

impl PlayerStatusRow {
    pub const WIDTH: usize = 4;

    pub fn to_array(self) -> [f64; Self::WIDTH] {
        [
            self.points,
            self.distance_travelled,
            self.speed,
            self.checkpoints_reached,
        ]
    }

    pub fn from_array(a: [f64; Self::WIDTH]) -> Self {
        Self {
            points: a[0],
            distance_travelled: a[1],
            speed: a[2],
            checkpoints_reached: a[3],
        }
    }
}

/// One line of the end-of-race leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub team: String,
    /// Points scored this round (from the points-for-grabs table).
    pub round_score: i64,
    /// Cumulative persisted score including this round.
    pub total_score: i64,
}

/// A team's best finish time across rounds, in simulated hours.
/// `f64::INFINITY` means the team has never finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastestTime {
    pub team: String,
    pub hours: f64,
}
