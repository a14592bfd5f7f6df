//! Per-ship mutable state and the wind-driven movement model.

use glam::DVec2;

use regatta_core::config::RaceConfig;
use regatta_core::errors::InstructionError;
use regatta_core::geo;
use regatta_core::instructions::{Directive, Instructions};
use regatta_core::types::{Checkpoint, Location};

/// Hard cap on path samples. Near a pole the km-to-longitude conversion
/// degenerates and the nominal sample count explodes.
const MAX_PATH_SAMPLES: usize = 4096;

/// One racing ship. Created at race setup, mutated every tick by the
/// engine, never destroyed during a race; an arrived ship stops moving
/// but stays in all bookkeeping until race end.
#[derive(Debug, Clone)]
pub struct Player {
    pub team: String,
    /// Display color derived from the team name ("#rrggbb").
    pub color: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Degrees, 0 = East, 90 = North; always in [0, 360).
    pub heading: f64,
    /// Current speed (km/h), derived from the last wind force.
    pub speed: f64,
    /// Sail trim in [0, 1].
    pub sail: f64,
    /// Per-player checkpoint clones; `reached` flips one way only.
    pub checkpoints: Vec<Checkpoint>,
    pub arrived: bool,
    pub distance_travelled: f64,
    /// Finish bonus, assigned once on arrival.
    pub bonus: i64,
    /// Sim time of arrival in hours, if arrived.
    pub arrival_time: Option<f64>,
    /// Last-tick position deltas, published for rendering.
    pub dlat: f64,
    pub dlon: f64,
}

impl Player {
    pub fn new(team: impl Into<String>, config: &RaceConfig) -> Self {
        let team = team.into();
        let start = config.start_location();
        Self {
            color: team_color(&team),
            team,
            longitude: start.longitude,
            latitude: start.latitude,
            heading: 180.0,
            speed: 0.0,
            sail: 1.0,
            checkpoints: config.checkpoints.clone(),
            arrived: false,
            distance_travelled: 0.0,
            bonus: 0,
            arrival_time: None,
            dlat: 0.0,
            dlon: 0.0,
        }
    }

    pub fn position(&self) -> Location {
        Location::new(self.longitude, self.latitude)
    }

    /// Number of checkpoints this player has captured.
    pub fn checkpoints_reached(&self) -> usize {
        self.checkpoints.iter().filter(|c| c.reached).count()
    }

    /// Set the heading angle in degrees (0 = East, 90 = North), stored
    /// normalized into [0, 360).
    pub fn set_heading(&mut self, angle: f64) {
        self.heading = geo::normalize_heading(angle);
    }

    /// Unit vector of the current heading.
    pub fn heading_vector(&self) -> DVec2 {
        geo::heading_vector(self.heading)
    }

    /// Set the heading from a direction vector. A zero-magnitude vector
    /// is ignored rather than poisoning the heading with NaN.
    pub fn set_vector(&mut self, vec: DVec2) {
        let norm = vec.length();
        if norm < f64::EPSILON {
            return;
        }
        let unit = vec / norm;
        let mut angle = unit.x.clamp(-1.0, 1.0).acos().to_degrees();
        if unit.y < 0.0 {
            angle = 360.0 - angle;
        }
        self.set_heading(angle);
    }

    /// Point the ship toward a location along the great circle.
    pub fn goto(&mut self, target: Location) {
        self.set_heading(geo::initial_bearing(self.position(), target));
    }

    /// Apply a decoded pilot instruction. Malformed instructions are
    /// rejected whole; no field is applied.
    pub fn apply_instructions(&mut self, instructions: &Instructions) -> Result<(), InstructionError> {
        let (directive, sail) = instructions.decode()?;
        match directive {
            Some(Directive::Goto(loc)) => self.goto(loc),
            Some(Directive::SetHeading(angle)) => self.set_heading(angle),
            Some(Directive::SetVector(vec)) => self.set_vector(vec),
            Some(Directive::TurnLeft(deg)) => self.set_heading(self.heading + deg),
            Some(Directive::TurnRight(deg)) => self.set_heading(self.heading - deg),
            None => {}
        }
        if let Some(sail) = sail {
            self.sail = sail.clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Effective propulsion for a ship vector in a given wind (km/h).
    ///
    /// The ship's heading is blended toward the wind direction; the
    /// blend's projection back onto the heading, scaled by the wind
    /// magnitude, is what actually drives the hull. Sailing with the
    /// wind is fast, close-hauled into it is slow. An approximation,
    /// not hydrodynamics.
    pub fn wind_force(ship_vector: DVec2, wind: DVec2) -> DVec2 {
        let norm = wind.length();
        if norm < f64::EPSILON {
            return DVec2::ZERO;
        }
        let vsum = ship_vector + wind / norm;
        let vsum_len = vsum.length();
        if vsum_len < f64::EPSILON {
            // Dead into the wind: no usable projection.
            return DVec2::ZERO;
        }
        let resultant = vsum / vsum_len;
        let mag = ship_vector.dot(resultant).abs();
        mag * norm * ship_vector
    }

    /// Ray-traced path for one tick of duration `dt` hours under `wind`.
    ///
    /// Returns densely sampled (lat, lon) waypoints from the current
    /// position to the displacement endpoint, every sample wrapped onto
    /// the globe. The engine walks this path against the terrain and
    /// stops the ship at the last sea sample, which is what prevents
    /// tunnelling through land at high speed. Also refreshes `speed`.
    pub fn get_path(&mut self, dt: f64, wind: DVec2) -> (Vec<f64>, Vec<f64>) {
        let force = Self::wind_force(self.heading_vector(), wind);
        self.speed = force.length();

        let step_km = force * dt * self.sail;
        let dist = DVec2::new(
            geo::lon_degs_from_length(step_km.x, self.latitude),
            geo::lat_degs_from_length(step_km.y),
        );

        let norm = dist.length();
        let samples = (norm.ceil() as usize)
            .saturating_add(1)
            .clamp(20, MAX_PATH_SAMPLES);
        let mut lats = Vec::with_capacity(samples);
        let mut lons = Vec::with_capacity(samples);
        for i in 0..samples {
            let f = i as f64 / (samples - 1) as f64;
            let (lat, lon) = geo::wrap(self.latitude + dist.y * f, self.longitude + dist.x * f);
            lats.push(lat);
            lons.push(lon);
        }
        (lats, lons)
    }
}

/// Deterministic display color for a team name.
///
/// FNV-1a fold of the name; the low 24 bits become the RGB channels.
pub fn team_color(team: &str) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in team.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("#{:06x}", hash & 0xffffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player() -> Player {
        Player::new("testers", &RaceConfig::default())
    }

    #[test]
    fn test_heading_normalized() {
        let mut p = test_player();
        p.set_heading(450.0);
        assert!((p.heading - 90.0).abs() < 1e-12);
        p.set_heading(-90.0);
        assert!((p.heading - 270.0).abs() < 1e-12);

        let mut q = test_player();
        p.set_heading(123.4);
        q.set_heading(123.4 + 360.0);
        assert!((p.heading - q.heading).abs() < 1e-12);
    }

    #[test]
    fn test_set_vector_cardinals() {
        let mut p = test_player();
        p.set_vector(DVec2::new(1.0, 0.0));
        assert!((p.heading - 0.0).abs() < 1e-9);
        p.set_vector(DVec2::new(0.0, 1.0));
        assert!((p.heading - 90.0).abs() < 1e-9);
        p.set_vector(DVec2::new(-1.0, 0.0));
        assert!((p.heading - 180.0).abs() < 1e-9);
        p.set_vector(DVec2::new(0.0, -1.0));
        assert!((p.heading - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_vector_zero_is_ignored() {
        let mut p = test_player();
        p.set_heading(42.0);
        p.set_vector(DVec2::ZERO);
        assert!((p.heading - 42.0).abs() < 1e-12);
        assert!(p.heading.is_finite());
    }

    #[test]
    fn test_turn_instructions() {
        let mut p = test_player();
        p.set_heading(0.0);
        p.apply_instructions(&Instructions::left(90.0)).unwrap();
        assert!((p.heading - 90.0).abs() < 1e-12);
        p.apply_instructions(&Instructions::right(180.0)).unwrap();
        assert!((p.heading - 270.0).abs() < 1e-12);
    }

    #[test]
    fn test_multi_directive_rejected_and_nothing_applied() {
        let mut p = test_player();
        p.set_heading(10.0);
        p.sail = 1.0;
        let mut bad = Instructions::heading(90.0).with_sail(0.2);
        bad.right = Some(45.0);
        assert!(p.apply_instructions(&bad).is_err());
        assert!((p.heading - 10.0).abs() < 1e-12);
        assert!((p.sail - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sail_clamped() {
        let mut p = test_player();
        p.apply_instructions(&Instructions::default().with_sail(3.0))
            .unwrap();
        assert!((p.sail - 1.0).abs() < 1e-12);
        p.apply_instructions(&Instructions::default().with_sail(-0.5))
            .unwrap();
        assert!(p.sail.abs() < 1e-12);
    }

    #[test]
    fn test_goto_points_east_along_equator() {
        let mut p = test_player();
        p.longitude = 0.0;
        p.latitude = 0.0;
        p.goto(Location::new(10.0, 0.0));
        assert!(p.heading < 1e-9 || (p.heading - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_force_downwind_beats_crosswind() {
        let ship = DVec2::new(1.0, 0.0);
        let downwind = Player::wind_force(ship, DVec2::new(10.0, 0.0)).length();
        let crosswind = Player::wind_force(ship, DVec2::new(0.0, 10.0)).length();
        assert!(downwind > crosswind);
    }

    #[test]
    fn test_wind_force_headwind_is_dead_zone() {
        let ship = DVec2::new(1.0, 0.0);
        let force = Player::wind_force(ship, DVec2::new(-10.0, 0.0));
        assert!(force.length() < 1e-9);
    }

    #[test]
    fn test_wind_force_zero_wind_no_nan() {
        let force = Player::wind_force(DVec2::new(1.0, 0.0), DVec2::ZERO);
        assert_eq!(force, DVec2::ZERO);
    }

    #[test]
    fn test_path_is_dense_and_wrapped() {
        let mut p = test_player();
        p.longitude = 179.9;
        p.latitude = 0.0;
        p.set_heading(0.0); // due east, across the antimeridian
        let (lats, lons) = p.get_path(24.0, DVec2::new(10.0, 0.0));
        assert!(lats.len() >= 20);
        assert_eq!(lats.len(), lons.len());
        for (&lat, &lon) in lats.iter().zip(&lons) {
            assert!((-90.0..=90.0).contains(&lat));
            assert!((-180.0..180.0).contains(&lon));
        }
        // The path must actually cross to the other side.
        assert!(lons.last().copied().unwrap() < 0.0);
    }

    #[test]
    fn test_path_endpoint_matches_displacement() {
        let mut p = test_player();
        p.longitude = 0.0;
        p.latitude = 0.0;
        p.set_heading(0.0);
        let wind = DVec2::new(10.0, 0.0);
        let (_, lons) = p.get_path(1.0, wind);
        // Downwind at 10 km/h for one hour: 10 km east.
        let expected = geo::lon_degs_from_length(10.0, 0.0);
        assert!((lons.last().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_path_at_pole_stays_bounded() {
        let mut p = test_player();
        p.longitude = 0.0;
        p.latitude = 90.0;
        p.set_heading(0.0);
        let (lats, lons) = p.get_path(1.0, DVec2::new(10.0, 0.0));
        assert_eq!(lats.len(), lons.len());
        assert!(lats.len() >= 20);
        assert!(lats.len() <= MAX_PATH_SAMPLES);
        for &lat in &lats {
            assert!((-90.0..=90.0).contains(&lat));
        }
    }

    #[test]
    fn test_zero_sail_means_no_movement() {
        let mut p = test_player();
        p.sail = 0.0;
        let (lats, lons) = p.get_path(1.0, DVec2::new(10.0, 0.0));
        assert!((lats[0] - lats.last().unwrap()).abs() < 1e-12);
        assert!((lons[0] - lons.last().unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_team_color_is_stable_and_well_formed() {
        let a = team_color("alpha");
        let b = team_color("alpha");
        let c = team_color("beta");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 7);
        assert!(a.starts_with('#'));
    }

    #[test]
    fn test_checkpoints_cloned_per_player() {
        let config = RaceConfig::default();
        let mut p = Player::new("a", &config);
        let q = Player::new("b", &config);
        p.checkpoints[0].reached = true;
        assert!(!q.checkpoints[0].reached);
        assert!(!config.checkpoints[0].reached);
    }
}
