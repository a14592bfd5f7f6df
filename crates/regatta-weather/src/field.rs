//! Ground-truth wind field generation.
//!
//! A deterministic-given-seed, spatially and temporally smooth vector
//! field over a periodic (time, lat, lon) grid. Random impulse seeds are
//! smoothed into a scalar potential; the potential's value picks the wind
//! direction and its gradient magnitude picks the sustained speed (flat
//! potential = steady flow = fast, steep potential = turbulent = slow).

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use regatta_core::config::RaceConfig;

use crate::forecast::Forecast;

/// Impulse amplitude dropped at each seed cell before smoothing.
const SEED_AMPLITUDE: f64 = 10_000.0;

/// The authoritative wind field. Never mutated after generation; bots
/// only ever see the derived [`Forecast`].
#[derive(Debug, Clone)]
pub struct WindField {
    nx: usize,
    ny: usize,
    nt: usize,
    /// Degrees per longitude bucket.
    dlon: f64,
    /// Degrees per latitude bucket.
    dlat: f64,
    /// Simulated hours per time bucket.
    time_step: f64,
    /// (u, v) in km/h, indexed [t][lat][lon], speed already applied.
    u: Vec<f64>,
    v: Vec<f64>,
    /// Heavily box-blurred copies used as the far-lead forecast
    /// climatology; precomputed here so forecast construction is a cheap
    /// linear blend.
    smooth_u: Vec<f64>,
    smooth_v: Vec<f64>,
    n_leads: usize,
}

impl WindField {
    /// Generate the field for a race. The same seed always produces the
    /// same weather.
    pub fn generate(config: &RaceConfig, seed: u64) -> Self {
        let ny = config.weather_resolution;
        let nx = ny * 2;
        let nt = config.weather_time_buckets();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut potential = vec![0.0f64; nt * ny * nx];
        // Keep seeds out of the polar third of the grid so the trade
        // winds live in sailable latitudes.
        let margin = ny / 3;
        for _ in 0..config.weather_seeds {
            let x = rng.gen_range(0..nx);
            let y = rng.gen_range(0..ny - margin) + margin / 2;
            let t = rng.gen_range(0..nt);
            potential[(t * ny + y) * nx + x] = SEED_AMPLITUDE;
        }

        gaussian_blur_wrap(&mut potential, nt, ny, nx, config.weather_sigma);
        normalize_max(&mut potential);

        let mut u = vec![0.0f64; potential.len()];
        let mut v = vec![0.0f64; potential.len()];
        for (i, &p) in potential.iter().enumerate() {
            let angle = ((p * 360.0 + 180.0) % 360.0).to_radians();
            u[i] = angle.cos();
            v[i] = angle.sin();
        }

        let mut grad = gradient_magnitude(&potential, nt, ny, nx);
        normalize_max(&mut grad);
        for i in 0..u.len() {
            let speed = (1.0 - grad[i]) * config.max_wind_speed;
            u[i] *= speed;
            v[i] *= speed;
        }

        let mut smooth_u = u.clone();
        let mut smooth_v = v.clone();
        // Spatial-only box blur; wide enough to wash out everything but
        // the planetary-scale structure.
        let radius = (ny / 8).max(1);
        for _ in 0..2 {
            box_blur_spatial(&mut smooth_u, nt, ny, nx, radius);
            box_blur_spatial(&mut smooth_v, nt, ny, nx, radius);
        }

        Self {
            nx,
            ny,
            nt,
            dlon: 360.0 / nx as f64,
            dlat: 180.0 / ny as f64,
            time_step: config.weather_update_interval,
            u,
            v,
            smooth_u,
            smooth_v,
            n_leads: config.forecast_leads(),
        }
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Nearest-cell time bucket for a sim time in hours, wrapping modulo
    /// the field period.
    fn time_index(&self, t_hours: f64) -> usize {
        let steps = (t_hours / self.time_step).max(0.0) as usize;
        steps % self.nt
    }

    fn cell_index(&self, lat: f64, lon: f64) -> usize {
        let (lat, lon) = regatta_core::geo::wrap(lat, lon);
        let iv = (((lat + 90.0) / self.dlat) as isize).clamp(0, self.ny as isize - 1) as usize;
        let iu = (((lon + 180.0) / self.dlon) as isize).clamp(0, self.nx as isize - 1) as usize;
        iv * self.nx + iu
    }

    /// Wind vector (km/h) at a position and sim time.
    pub fn get_uv(&self, lat: f64, lon: f64, t_hours: f64) -> DVec2 {
        let base = self.time_index(t_hours) * self.ny * self.nx + self.cell_index(lat, lon);
        DVec2::new(self.u[base], self.v[base])
    }

    /// Batch lookup for a set of positions at one sim time.
    pub fn get_uv_many(&self, lats: &[f64], lons: &[f64], t_hours: f64) -> Vec<DVec2> {
        debug_assert_eq!(lats.len(), lons.len());
        let plane = self.time_index(t_hours) * self.ny * self.nx;
        lats.iter()
            .zip(lons)
            .map(|(&lat, &lon)| {
                let i = plane + self.cell_index(lat, lon);
                DVec2::new(self.u[i], self.v[i])
            })
            .collect()
    }

    /// Build the forecast visible to bots at sim time `t_hours`.
    ///
    /// Slice `k` covers lead time `k * weather_update_interval` and blends
    /// the instantaneous field toward the precomputed climatology with a
    /// weight growing linearly in `k` (weight 0 at lead 0, 1 at the
    /// horizon): near-term forecasts are accurate, far ones regress to
    /// smoothed climatology.
    pub fn forecast(&self, t_hours: f64) -> Forecast {
        let plane = self.ny * self.nx;
        let mut times = Vec::with_capacity(self.n_leads);
        let mut u = Vec::with_capacity(self.n_leads * plane);
        let mut v = Vec::with_capacity(self.n_leads * plane);

        for k in 0..self.n_leads {
            let lead_hours = k as f64 * self.time_step;
            let w = if self.n_leads > 1 {
                k as f64 / (self.n_leads - 1) as f64
            } else {
                0.0
            };
            let base = self.time_index(t_hours + lead_hours) * plane;
            times.push(t_hours + lead_hours);
            for i in base..base + plane {
                u.push((1.0 - w) * self.u[i] + w * self.smooth_u[i]);
                v.push((1.0 - w) * self.v[i] + w * self.smooth_v[i]);
            }
        }

        Forecast::new(self.nx, self.ny, self.dlon, self.dlat, times, u, v)
    }
}

/// Normalize a buffer by its maximum, leaving an all-zero buffer alone.
fn normalize_max(data: &mut [f64]) {
    let max = data.iter().cloned().fold(0.0f64, f64::max);
    if max > 0.0 {
        for x in data.iter_mut() {
            *x /= max;
        }
    }
}

/// Separable Gaussian blur with wrap-around on all three axes.
fn gaussian_blur_wrap(data: &mut Vec<f64>, nt: usize, ny: usize, nx: usize, sigma: f64) {
    let kernel = gaussian_kernel(sigma);
    blur_axis(data, nt, ny, nx, Axis::T, &kernel);
    blur_axis(data, nt, ny, nx, Axis::Y, &kernel);
    blur_axis(data, nt, ny, nx, Axis::X, &kernel);
}

/// Normalized 1D Gaussian kernel truncated at 3 sigma.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil().max(1.0) as i64;
    let mut kernel = Vec::with_capacity(2 * radius as usize + 1);
    for i in -radius..=radius {
        kernel.push((-(i as f64).powi(2) / (2.0 * sigma * sigma)).exp());
    }
    let sum: f64 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

enum Axis {
    T,
    Y,
    X,
}

fn blur_axis(data: &mut Vec<f64>, nt: usize, ny: usize, nx: usize, axis: Axis, kernel: &[f64]) {
    let radius = (kernel.len() / 2) as i64;
    let mut out = vec![0.0f64; data.len()];
    let len = match axis {
        Axis::T => nt,
        Axis::Y => ny,
        Axis::X => nx,
    } as i64;

    for t in 0..nt {
        for y in 0..ny {
            for x in 0..nx {
                let mut acc = 0.0;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let offset = ki as i64 - radius;
                    let (st, sy, sx) = match axis {
                        Axis::T => ((t as i64 + offset).rem_euclid(len) as usize, y, x),
                        Axis::Y => (t, (y as i64 + offset).rem_euclid(len) as usize, x),
                        Axis::X => (t, y, (x as i64 + offset).rem_euclid(len) as usize),
                    };
                    acc += kv * data[(st * ny + sy) * nx + sx];
                }
                out[(t * ny + y) * nx + x] = acc;
            }
        }
    }
    *data = out;
}

/// |sum of central-difference gradients| along all three (periodic) axes.
fn gradient_magnitude(data: &[f64], nt: usize, ny: usize, nx: usize) -> Vec<f64> {
    let mut out = vec![0.0f64; data.len()];
    let at = |t: usize, y: usize, x: usize| data[(t * ny + y) * nx + x];
    for t in 0..nt {
        let tp = (t + 1) % nt;
        let tm = (t + nt - 1) % nt;
        for y in 0..ny {
            let yp = (y + 1) % ny;
            let ym = (y + ny - 1) % ny;
            for x in 0..nx {
                let xp = (x + 1) % nx;
                let xm = (x + nx - 1) % nx;
                let gt = (at(tp, y, x) - at(tm, y, x)) / 2.0;
                let gy = (at(t, yp, x) - at(t, ym, x)) / 2.0;
                let gx = (at(t, y, xp) - at(t, y, xm)) / 2.0;
                out[(t * ny + y) * nx + x] = (gt + gy + gx).abs();
            }
        }
    }
    out
}

/// In-place box blur over the two spatial axes, wrap-around, one pass.
fn box_blur_spatial(data: &mut Vec<f64>, nt: usize, ny: usize, nx: usize, radius: usize) {
    let r = radius as i64;
    let norm = 1.0 / (2 * radius + 1) as f64;
    let mut out = vec![0.0f64; data.len()];

    // Latitude axis.
    for t in 0..nt {
        for y in 0..ny {
            for x in 0..nx {
                let mut acc = 0.0;
                for dy in -r..=r {
                    let sy = (y as i64 + dy).rem_euclid(ny as i64) as usize;
                    acc += data[(t * ny + sy) * nx + x];
                }
                out[(t * ny + y) * nx + x] = acc * norm;
            }
        }
    }
    // Longitude axis.
    for t in 0..nt {
        for y in 0..ny {
            for x in 0..nx {
                let mut acc = 0.0;
                for dx in -r..=r {
                    let sx = (x as i64 + dx).rem_euclid(nx as i64) as usize;
                    acc += out[(t * ny + y) * nx + sx];
                }
                data[(t * ny + y) * nx + x] = acc * norm;
            }
        }
    }
}
