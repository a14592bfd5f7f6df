//! Binary cache format for the rasterized sea mask.
//!
//! Rasterizing the world map image is the slow part of startup, so the
//! packed mask can be dumped to disk once and reloaded on later runs.
//! Layout: 4-byte magic, u16 version, u32 width, u32 height (little
//! endian), then the packed bits.

use std::io;
use std::path::Path;

use crate::grid::TerrainGrid;

const MAGIC: [u8; 4] = *b"RSEA";
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 14;

/// Write a grid's packed mask to `path`.
pub fn save(grid: &TerrainGrid, path: &Path) -> io::Result<()> {
    let mut out = Vec::with_capacity(HEADER_SIZE + grid.bits().len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(grid.width() as u32).to_le_bytes());
    out.extend_from_slice(&(grid.height() as u32).to_le_bytes());
    out.extend_from_slice(grid.bits());
    std::fs::write(path, out)
}

/// Load a grid previously written by [`save`].
pub fn load(path: &Path) -> io::Result<TerrainGrid> {
    let data = std::fs::read(path)?;
    parse(&data)
}

/// Parse a cached mask from a byte buffer.
pub fn parse(data: &[u8]) -> io::Result<TerrainGrid> {
    if data.len() < HEADER_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file too small for sea-mask header",
        ));
    }
    if data[0..4] != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid sea-mask magic bytes",
        ));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported sea-mask version: {version}"),
        ));
    }
    let width = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;
    let height = u32::from_le_bytes([data[10], data[11], data[12], data[13]]) as usize;

    let expected = (width * height).div_ceil(8);
    let payload = &data[HEADER_SIZE..];
    if payload.len() < expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "sea-mask payload truncated: {} bytes, expected {expected}",
                payload.len()
            ),
        ));
    }
    Ok(TerrainGrid::from_sea_mask(
        width,
        height,
        payload[..expected].to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let grid = TerrainGrid::from_rows(&[vec![1, 0, 1], vec![0, 1, 0], vec![1, 1, 1]]);
        let dir = std::env::temp_dir().join("regatta-terrain-cache-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mask.rsea");

        save(&grid, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.width(), grid.width());
        assert_eq!(loaded.height(), grid.height());
        for lat in [-60.0, 0.0, 60.0] {
            for lon in [-120.0, 0.0, 120.0] {
                assert_eq!(loaded.is_sea(lat, lon), grid.is_sea(lat, lon));
            }
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = parse(b"NOPE\x01\x00\x01\x00\x00\x00\x01\x00\x00\x00").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC);
        data.extend_from_slice(&VERSION.to_le_bytes());
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&100u32.to_le_bytes());
        // No payload at all.
        let err = parse(&data).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
