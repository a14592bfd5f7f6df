//! Great-circle geodesy on the race sphere.
//!
//! All functions are pure. Angles are degrees unless noted; distances are
//! km on a sphere of radius [`EARTH_RADIUS_KM`]. The heading convention
//! throughout the engine is 0 = East, 90 = North, 180 = West, 270 = South.

use glam::DVec2;

use crate::types::Location;

/// Mean sphere radius (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Normalize a heading angle into [0, 360).
pub fn normalize_heading(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Haversine great-circle distance between two points, in km.
pub fn distance_on_surface(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lon1 = lon1.to_radians();
    let lat1 = lat1.to_radians();
    let lon2 = lon2.to_radians();
    let lat2 = lat2.to_radians();
    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial bearing of the shortest path from `origin` to `to`, remapped
/// into the engine's heading convention (0 = East, 90 = North).
pub fn initial_bearing(origin: Location, to: Location) -> f64 {
    let lon1 = origin.longitude.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon2 = to.longitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let dlon = lon2 - lon1;
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let bearing = -y.atan2(x) + std::f64::consts::FRAC_PI_2;
    normalize_heading(bearing.to_degrees())
}

/// Degrees of longitude spanned by `length_km` at a given latitude.
/// Longitude circles shrink toward the poles via cos(latitude).
pub fn lon_degs_from_length(length_km: f64, latitude: f64) -> f64 {
    length_km / ((std::f64::consts::PI * EARTH_RADIUS_KM * latitude.to_radians().cos()) / 180.0)
}

/// Degrees of latitude spanned by `length_km` (constant at all longitudes).
pub fn lat_degs_from_length(length_km: f64) -> f64 {
    length_km / (2.0 * std::f64::consts::PI * EARTH_RADIUS_KM) * 360.0
}

/// Wrap a (lat, lon) pair back onto the globe.
///
/// Crossing a pole (|lat| > 90) reflects the latitude and shifts the
/// longitude by 180; the longitude is then normalized into [-180, 180).
pub fn wrap(lat: f64, lon: f64) -> (f64, f64) {
    let crossed = lat > 90.0 || lat < -90.0;
    let out_lat = lat.min(180.0 - lat).max(-180.0 - lat);
    let mut out_lon = lon;
    if crossed {
        out_lon += 180.0;
    }
    out_lon = (out_lon + 180.0).rem_euclid(360.0) - 180.0;
    (out_lat, out_lon)
}

/// Shorter-way absolute difference between two longitudes.
pub fn longitude_difference(lon1: f64, lon2: f64) -> f64 {
    let diff = (lon1 - lon2).abs();
    diff.min(360.0 - diff)
}

/// Colatitude angle (radians) for a latitude in degrees.
pub fn lat_to_theta(lat: f64) -> f64 {
    (90.0 - lat).to_radians()
}

/// Azimuthal angle (radians) for a longitude in degrees.
pub fn lon_to_phi(lon: f64) -> f64 {
    (lon.rem_euclid(360.0) + 180.0).to_radians()
}

/// Spherical-to-Cartesian projection onto the race sphere.
///
/// Used by the rendering boundary; the track and tracer buffers publish
/// positions in this basis.
pub fn to_cartesian(phi: f64, theta: f64) -> (f64, f64, f64) {
    let r = EARTH_RADIUS_KM;
    let x = r * theta.sin() * phi.cos();
    let y = r * theta.sin() * phi.sin();
    let z = r * theta.cos();
    (x, y, z)
}

/// Unit vector for a heading angle in degrees.
pub fn heading_vector(heading: f64) -> DVec2 {
    let h = heading.to_radians();
    DVec2::new(h.cos(), h.sin())
}
