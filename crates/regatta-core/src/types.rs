//! Fundamental race types: locations, checkpoints, the race clock.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// A point on the globe in degrees.
/// Longitude is in [-180, 180), latitude in [-90, 90].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

impl Location {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A required waypoint: a location plus a capture radius in km.
///
/// The configured course holds immutable templates; each player gets its
/// own clones at race start with `reached = false`. Once `reached` flips
/// to true for a player it never reverts within a race.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Capture radius (km).
    pub radius: f64,
    #[serde(default)]
    pub reached: bool,
}

impl Checkpoint {
    pub fn new(latitude: f64, longitude: f64, radius: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius,
            reached: false,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.longitude, self.latitude)
    }
}

/// Wall-clock anchored simulation time, shared by all shards.
///
/// Every worker derives elapsed time from the same start instant so that
/// elapsed-time math is consistent across the whole race. Real seconds are
/// scaled into simulated hours by the configured acceleration factor.
#[derive(Debug, Clone, Copy)]
pub struct RaceClock {
    start: Instant,
    /// Simulated hours per real second.
    seconds_to_hours: f64,
}

impl RaceClock {
    pub fn new(start: Instant, seconds_to_hours: f64) -> Self {
        Self {
            start,
            seconds_to_hours,
        }
    }

    /// Anchor a clock at the current instant.
    pub fn start_now(seconds_to_hours: f64) -> Self {
        Self::new(Instant::now(), seconds_to_hours)
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    /// Real seconds elapsed since the race start.
    pub fn elapsed_seconds(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.start).as_secs_f64()
    }

    /// Simulated hours elapsed since the race start.
    pub fn elapsed_hours(&self, now: Instant) -> f64 {
        self.elapsed_seconds(now) * self.seconds_to_hours
    }

    /// Convert a real-time delta in seconds to simulated hours.
    pub fn to_sim_hours(&self, real_seconds: f64) -> f64 {
        real_seconds * self.seconds_to_hours
    }
}
