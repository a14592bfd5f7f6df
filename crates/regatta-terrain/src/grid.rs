//! TerrainGrid: packed sea/land raster with nearest-cell queries.

use regatta_core::geo;

/// Boolean sea/land raster over an equirectangular lat/lon grid.
///
/// One bit per cell, row-major from the south edge up (row 0 = -90°),
/// bit 1 = sea (navigable), bit 0 = land. Immutable after construction.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    /// Columns (west to east), spanning [-180, 180).
    width: usize,
    /// Rows (south to north), spanning [-90, 90].
    height: usize,
    /// Packed cells, `(height * width + 7) / 8` bytes.
    bits: Vec<u8>,
    /// Degrees of longitude per column.
    dlon: f64,
    /// Degrees of latitude per row.
    dlat: f64,
}

impl TerrainGrid {
    /// Build from a pre-packed bit mask. `bits` must hold at least
    /// `width * height` bits.
    pub fn from_sea_mask(width: usize, height: usize, bits: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "terrain grid must be non-empty");
        assert!(
            bits.len() * 8 >= width * height,
            "sea mask too small for {width}x{height} grid"
        );
        Self {
            width,
            height,
            bits,
            dlon: 360.0 / width as f64,
            dlat: 180.0 / height as f64,
        }
    }

    /// Build from unpacked rows (south to north), nonzero = sea.
    /// Intended for tests and small synthetic worlds.
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut bits = vec![0u8; (width * height).div_ceil(8)];
        for (r, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), width, "ragged terrain rows");
            for (c, &cell) in row.iter().enumerate() {
                if cell != 0 {
                    let idx = r * width + c;
                    bits[idx / 8] |= 1 << (idx % 8);
                }
            }
        }
        Self::from_sea_mask(width, height, bits)
    }

    /// An open-ocean world of the given resolution.
    pub fn all_sea(width: usize, height: usize) -> Self {
        Self::from_sea_mask(width, height, vec![0xFF; (width * height).div_ceil(8)])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Degrees of longitude per cell.
    pub fn dlon(&self) -> f64 {
        self.dlon
    }

    /// Degrees of latitude per cell.
    pub fn dlat(&self) -> f64 {
        self.dlat
    }

    pub(crate) fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Nearest-cell sea lookup. Out-of-range coordinates are wrapped onto
    /// the globe and then clamped to the grid extents, never indexed out
    /// of bounds.
    pub fn is_sea(&self, lat: f64, lon: f64) -> bool {
        let (lat, lon) = geo::wrap(lat, lon);
        let row = (((lat + 90.0) / self.dlat) as isize).clamp(0, self.height as isize - 1);
        let col = (((lon + 180.0) / self.dlon) as isize).clamp(0, self.width as isize - 1);
        let idx = row as usize * self.width + col as usize;
        self.bits[idx / 8] & (1 << (idx % 8)) != 0
    }

    /// Vectorized lookup along a sampled path. Slices must be equal length.
    pub fn terrain_along(&self, lats: &[f64], lons: &[f64]) -> Vec<bool> {
        debug_assert_eq!(lats.len(), lons.len());
        lats.iter()
            .zip(lons)
            .map(|(&lat, &lon)| self.is_sea(lat, lon))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 world: all sea except a land cell in the north-east quadrant.
    fn island_grid() -> TerrainGrid {
        TerrainGrid::from_rows(&[
            vec![1, 1, 1, 1],
            vec![1, 1, 1, 1],
            vec![1, 1, 0, 1],
            vec![1, 1, 1, 1],
        ])
    }

    #[test]
    fn test_sea_and_land_lookup() {
        let grid = island_grid();
        // Row 2 col 2 spans lat [0, 45), lon [0, 90): land.
        assert!(!grid.is_sea(20.0, 45.0));
        // South-west quadrant is open sea.
        assert!(grid.is_sea(-45.0, -90.0));
    }

    #[test]
    fn test_out_of_range_is_wrapped_not_panicking() {
        let grid = island_grid();
        // Over-the-pole latitude reflects into range.
        let _ = grid.is_sea(95.0, 10.0);
        // Longitude far out of range wraps.
        let _ = grid.is_sea(0.0, 720.0);
        // Exact boundary values clamp to the last cell.
        let _ = grid.is_sea(90.0, 180.0);
    }

    #[test]
    fn test_wrapped_longitude_consistency() {
        let grid = island_grid();
        assert_eq!(grid.is_sea(20.0, 45.0), grid.is_sea(20.0, 45.0 + 360.0));
    }

    #[test]
    fn test_terrain_along_path() {
        let grid = island_grid();
        let lats = [20.0, 20.0, 20.0];
        let lons = [-45.0, 45.0, 135.0];
        assert_eq!(grid.terrain_along(&lats, &lons), vec![true, false, true]);
    }

    #[test]
    fn test_all_sea() {
        let grid = TerrainGrid::all_sea(8, 4);
        for lat in [-80.0, 0.0, 80.0] {
            for lon in [-170.0, 0.0, 170.0] {
                assert!(grid.is_sea(lat, lon));
            }
        }
    }

    #[test]
    fn test_cell_widths() {
        let grid = TerrainGrid::all_sea(360, 180);
        assert!((grid.dlon() - 1.0).abs() < 1e-12);
        assert!((grid.dlat() - 1.0).abs() < 1e-12);
    }
}
