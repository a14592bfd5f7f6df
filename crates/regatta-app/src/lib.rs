//! Race orchestration: shard partitioning, thread lifecycle, and the
//! read-only render boundary over the shared buffers.

pub mod orchestrator;
pub mod render;
