//! Core types and definitions for the regatta race simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! locations, checkpoints, pilot instructions, geodesy helpers, race
//! configuration, events, and errors. It has no dependency on any
//! runtime framework.

pub mod config;
pub mod errors;
pub mod events;
pub mod geo;
pub mod instructions;
pub mod state;
pub mod types;
