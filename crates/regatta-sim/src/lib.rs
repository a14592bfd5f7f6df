//! Race simulation: ships, scoring, shared buffers, and the engine.
//!
//! An [`engine::Engine`] owns one shard of the player roster and runs the
//! authoritative per-tick update against the wind field and terrain,
//! publishing results through the lock-free shared buffers in
//! [`buffers`]. Completely headless: rendering only ever reads the
//! buffers.

pub mod bot;
pub mod buffers;
pub mod engine;
pub mod player;
pub mod scores;
