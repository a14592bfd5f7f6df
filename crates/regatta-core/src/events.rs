//! Race events emitted by the engine each tick.

use serde::{Deserialize, Serialize};

/// Something noteworthy that happened during a tick. The orchestration
/// layer consumes these for logging and end-of-race reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    /// A player entered a checkpoint's capture radius.
    CheckpointReached { team: String, index: usize },
    /// A player completed the course and crossed the finish radius.
    PlayerArrived {
        team: String,
        /// 1-based finish position across the whole roster.
        rank: usize,
        /// Simulated hours since race start at the moment of arrival.
        sim_time: f64,
    },
    /// The race hit its time limit or every player arrived.
    RaceOver,
}
