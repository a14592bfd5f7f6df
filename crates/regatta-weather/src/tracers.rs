//! Cosmetic wind tracer particles.
//!
//! Each engine shard owns one pool. A pool keeps a short ring of
//! historical rows so the renderer can draw fading trails; every tick the
//! ring advances by one row, the newest row is the previous row advected
//! by the wind, and a small rotating batch of tracers is respawned at
//! random positions to keep the population visually fresh. Tracers never
//! affect race logic.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use regatta_core::geo;

use crate::field::WindField;

#[derive(Debug)]
pub struct TracerPool {
    /// Number of tracers in this pool.
    count: usize,
    /// Ring length (trail rows).
    lifetime: usize,
    /// Ring head: index of the newest row.
    head: usize,
    /// (lat, lon) per row per tracer, indexed [row][tracer].
    lat: Vec<f64>,
    lon: Vec<f64>,
    /// Tracers respawned per tick.
    renewal_batch: usize,
    /// Rotating respawn cursor.
    cursor: usize,
    rng: ChaCha8Rng,
}

impl TracerPool {
    pub fn new(count: usize, lifetime: usize, renewal_batch: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut lat = Vec::with_capacity(lifetime * count);
        let mut lon = Vec::with_capacity(lifetime * count);
        for _ in 0..lifetime * count {
            lat.push(rng.gen_range(-90.0..90.0));
            lon.push(rng.gen_range(-180.0..180.0));
        }
        Self {
            count,
            lifetime,
            head: 0,
            lat,
            lon,
            renewal_batch: renewal_batch.min(count),
            cursor: 0,
            rng,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn lifetime(&self) -> usize {
        self.lifetime
    }

    /// Advance the pool by one tick: roll the ring, advect the newest row
    /// from the previous one, respawn the renewal batch.
    pub fn step(&mut self, field: &WindField, t_hours: f64, dt_hours: f64) {
        if self.count == 0 || self.lifetime == 0 {
            return;
        }
        let prev = self.head;
        self.head = (self.head + self.lifetime - 1) % self.lifetime;

        for i in 0..self.count {
            let lat = self.lat[prev * self.count + i];
            let lon = self.lon[prev * self.count + i];
            let wind = field.get_uv(lat, lon, t_hours);
            let (new_lat, new_lon) = geo::wrap(lat + wind.y * dt_hours, lon + wind.x * dt_hours);
            self.lat[self.head * self.count + i] = new_lat;
            self.lon[self.head * self.count + i] = new_lon;
        }

        for _ in 0..self.renewal_batch {
            let i = self.head * self.count + self.cursor;
            self.lat[i] = self.rng.gen_range(-90.0..90.0);
            self.lon[i] = self.rng.gen_range(-180.0..180.0);
            self.cursor = (self.cursor + 1) % self.count;
        }
    }

    /// Number of f64 values written by [`Self::write_positions_xyz`].
    pub fn xyz_len(&self) -> usize {
        self.lifetime * self.count * 3
    }

    /// Project every ring row to Cartesian render coordinates, newest row
    /// first, into `out` (length [`Self::xyz_len`]).
    pub fn write_positions_xyz(&self, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.xyz_len());
        for age in 0..self.lifetime {
            let row = (self.head + age) % self.lifetime;
            for i in 0..self.count {
                let lat = self.lat[row * self.count + i];
                let lon = self.lon[row * self.count + i];
                let (x, y, z) = geo::to_cartesian(geo::lon_to_phi(lon), geo::lat_to_theta(lat));
                let o = (age * self.count + i) * 3;
                out[o] = x;
                out[o + 1] = y;
                out[o + 2] = z;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_core::config::RaceConfig;

    fn test_field() -> WindField {
        let config = RaceConfig {
            weather_resolution: 8,
            weather_seeds: 10,
            weather_sigma: 1.5,
            time_limit: 60.0,
            ..RaceConfig::default()
        };
        WindField::generate(&config, 42)
    }

    #[test]
    fn test_positions_stay_on_globe() {
        let field = test_field();
        let mut pool = TracerPool::new(64, 5, 4, 1);
        for tick in 0..50 {
            pool.step(&field, tick as f64 * 0.1, 0.5);
        }
        for (&lat, &lon) in pool.lat.iter().zip(&pool.lon) {
            assert!((-90.0..=90.0).contains(&lat));
            assert!((-180.0..180.0).contains(&lon));
        }
    }

    #[test]
    fn test_renewal_cursor_rotates_through_pool() {
        let field = test_field();
        let mut pool = TracerPool::new(10, 3, 4, 1);
        pool.step(&field, 0.0, 0.1);
        assert_eq!(pool.cursor, 4);
        pool.step(&field, 0.1, 0.1);
        assert_eq!(pool.cursor, 8);
        pool.step(&field, 0.2, 0.1);
        assert_eq!(pool.cursor, 2);
    }

    #[test]
    fn test_xyz_buffer_shape_and_radius() {
        let field = test_field();
        let mut pool = TracerPool::new(16, 4, 2, 7);
        pool.step(&field, 0.0, 0.5);
        let mut out = vec![0.0; pool.xyz_len()];
        pool.write_positions_xyz(&mut out);
        assert_eq!(out.len(), 16 * 4 * 3);
        for p in out.chunks_exact(3) {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((r - regatta_core::geo::EARTH_RADIUS_KM).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_pool_is_harmless() {
        let field = test_field();
        let mut pool = TracerPool::new(0, 0, 5, 1);
        pool.step(&field, 0.0, 0.1);
        assert_eq!(pool.xyz_len(), 0);
    }
}
