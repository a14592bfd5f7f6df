//! Sea/land terrain raster for the race world.
//!
//! The raster itself comes from an external collaborator (a rasterized
//! world map); this crate owns the lookup grid and a binary cache format.

pub mod cache;
pub mod grid;

pub use grid::TerrainGrid;
