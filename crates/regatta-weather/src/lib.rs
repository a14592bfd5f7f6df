//! Procedural wind for the race: the ground-truth field, the degraded
//! forecast handed to bots, and the cosmetic tracer particles.

pub mod field;
pub mod forecast;
pub mod tracers;

pub use field::WindField;
pub use forecast::Forecast;
pub use tracers::TracerPool;
