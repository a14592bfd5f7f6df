//! The lead-time-degraded wind forecast exposed to bots.

use glam::DVec2;

/// A stack of forecast slices at fixed lead-time offsets.
///
/// Slice 0 is the instantaneous field at the forecast's issue time; later
/// slices are progressively blended toward a smoothed climatology. Built
/// by [`crate::WindField::forecast`] and refreshed on a coarse interval,
/// so bots always see a slightly stale but cheap-to-query view.
#[derive(Debug, Clone)]
pub struct Forecast {
    nx: usize,
    ny: usize,
    dlon: f64,
    dlat: f64,
    /// Sim time (hours) covered by each slice.
    times: Vec<f64>,
    /// (u, v) per slice, indexed [lead][lat][lon].
    u: Vec<f64>,
    v: Vec<f64>,
}

impl Forecast {
    pub(crate) fn new(
        nx: usize,
        ny: usize,
        dlon: f64,
        dlat: f64,
        times: Vec<f64>,
        u: Vec<f64>,
        v: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(u.len(), times.len() * ny * nx);
        debug_assert_eq!(v.len(), u.len());
        Self {
            nx,
            ny,
            dlon,
            dlat,
            times,
            u,
            v,
        }
    }

    /// Number of lead-time slices.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Sim times (hours) covered by the slices.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Forecast wind at a position for the given lead slice. Lead indices
    /// past the horizon clamp to the last slice; positions are wrapped
    /// and clamped like the ground-truth field.
    pub fn get_uv(&self, lat: f64, lon: f64, lead: usize) -> DVec2 {
        let lead = lead.min(self.times.len().saturating_sub(1));
        let (lat, lon) = regatta_core::geo::wrap(lat, lon);
        let iv = (((lat + 90.0) / self.dlat) as isize).clamp(0, self.ny as isize - 1) as usize;
        let iu = (((lon + 180.0) / self.dlon) as isize).clamp(0, self.nx as isize - 1) as usize;
        let i = (lead * self.ny + iv) * self.nx + iu;
        DVec2::new(self.u[i], self.v[i])
    }
}

#[cfg(test)]
mod tests {
    use regatta_core::config::RaceConfig;

    use crate::field::WindField;

    fn small_config() -> RaceConfig {
        RaceConfig {
            weather_resolution: 16,
            weather_seeds: 20,
            weather_sigma: 2.0,
            time_limit: 240.0,
            seconds_to_hours: 1.0,
            weather_update_interval: 12.0,
            forecast_length_days: 2.0,
            ..RaceConfig::default()
        }
    }

    #[test]
    fn test_lead_zero_equals_instantaneous_field() {
        let config = small_config();
        let field = WindField::generate(&config, 5);
        let forecast = field.forecast(0.0);
        for (lat, lon) in [(0.0, 0.0), (40.0, -30.0), (-20.0, 150.0)] {
            let truth = field.get_uv(lat, lon, 0.0);
            let predicted = forecast.get_uv(lat, lon, 0);
            assert!((truth - predicted).length() < 1e-12);
        }
    }

    #[test]
    fn test_slice_count_matches_horizon() {
        let config = small_config();
        let field = WindField::generate(&config, 5);
        let forecast = field.forecast(0.0);
        assert_eq!(forecast.len(), config.forecast_leads());
        assert!(!forecast.is_empty());
    }

    #[test]
    fn test_lead_times_step_by_update_interval() {
        let config = small_config();
        let field = WindField::generate(&config, 5);
        let forecast = field.forecast(24.0);
        let times = forecast.times();
        assert!((times[0] - 24.0).abs() < 1e-12);
        for pair in times.windows(2) {
            assert!((pair[1] - pair[0] - config.weather_update_interval).abs() < 1e-12);
        }
    }

    #[test]
    fn test_lead_index_clamps_to_horizon() {
        let config = small_config();
        let field = WindField::generate(&config, 5);
        let forecast = field.forecast(0.0);
        let last = forecast.get_uv(10.0, 10.0, forecast.len() - 1);
        let beyond = forecast.get_uv(10.0, 10.0, forecast.len() + 10);
        assert_eq!(last, beyond);
    }
}
