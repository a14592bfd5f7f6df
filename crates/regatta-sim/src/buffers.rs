//! Lock-free shared buffers between engine shards and the renderer.
//!
//! All cross-thread race state flows through fixed-size numeric tables:
//! a per-player status row, a per-player downsampled track history, and
//! a per-shard tracer position pool, plus a handful of monotone control
//! flags. There are no locks on the hot path. Each shard writes only its
//! own disjoint row range (enforced by the writer views handed out at
//! setup) and the renderer only reads, so every cell is single-writer.
//! Values are f64 bit patterns in relaxed atomics: a reader may observe
//! a frame mixing old and new cells, which is acceptable for a soft
//! real-time display, but never a torn value.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use regatta_core::state::PlayerStatusRow;

/// A fixed-size table of f64 cells with relaxed atomic access.
#[derive(Debug)]
pub struct AtomicF64Grid {
    cells: Vec<AtomicU64>,
}

impl AtomicF64Grid {
    pub fn zeroed(len: usize) -> Self {
        let mut cells = Vec::with_capacity(len);
        cells.resize_with(len, || AtomicU64::new(0.0f64.to_bits()));
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, i: usize) -> f64 {
        f64::from_bits(self.cells[i].load(Ordering::Relaxed))
    }

    pub fn set(&self, i: usize, value: f64) {
        self.cells[i].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Copy a contiguous range into `out`.
    pub fn read_range(&self, start: usize, out: &mut [f64]) {
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = self.get(start + k);
        }
    }

    /// Store a contiguous range from `values`.
    pub fn write_range(&self, start: usize, values: &[f64]) {
        for (k, &v) in values.iter().enumerate() {
            self.set(start + k, v);
        }
    }
}

/// All shared numeric tables for one race, sized once at setup.
#[derive(Debug)]
pub struct SharedBuffers {
    n_players: usize,
    n_shards: usize,
    max_track_length: usize,
    /// f64 values per shard in the tracer pool table.
    tracer_stride: usize,
    /// `n_players x PlayerStatusRow::WIDTH`.
    status: AtomicF64Grid,
    /// `n_players x max_track_length x 3` Cartesian track points.
    tracks: AtomicF64Grid,
    /// `n_shards x tracer_stride` Cartesian tracer positions.
    tracers: AtomicF64Grid,
}

impl SharedBuffers {
    pub fn new(
        n_players: usize,
        n_shards: usize,
        max_track_length: usize,
        tracer_stride: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            n_players,
            n_shards,
            max_track_length,
            tracer_stride,
            status: AtomicF64Grid::zeroed(n_players * PlayerStatusRow::WIDTH),
            tracks: AtomicF64Grid::zeroed(n_players * max_track_length * 3),
            tracers: AtomicF64Grid::zeroed(n_shards * tracer_stride),
        })
    }

    pub fn n_players(&self) -> usize {
        self.n_players
    }

    pub fn n_shards(&self) -> usize {
        self.n_shards
    }

    pub fn max_track_length(&self) -> usize {
        self.max_track_length
    }

    pub fn tracer_stride(&self) -> usize {
        self.tracer_stride
    }

    /// Renderer-side read of one player's status row.
    pub fn read_status(&self, player: usize) -> PlayerStatusRow {
        let mut row = [0.0; PlayerStatusRow::WIDTH];
        self.status
            .read_range(player * PlayerStatusRow::WIDTH, &mut row);
        PlayerStatusRow::from_array(row)
    }

    /// Renderer-side read of one player's full track (xyz triplets).
    pub fn read_track(&self, player: usize, out: &mut Vec<f64>) {
        out.resize(self.max_track_length * 3, 0.0);
        self.tracks
            .read_range(player * self.max_track_length * 3, out);
    }

    /// Renderer-side read of one shard's tracer positions.
    pub fn read_tracers(&self, shard: usize, out: &mut Vec<f64>) {
        out.resize(self.tracer_stride, 0.0);
        self.tracers.read_range(shard * self.tracer_stride, out);
    }
}

/// Write access for one shard, restricted to its own player range and
/// its own tracer slice. Constructed once per shard by the orchestrator;
/// ranges never overlap between shards.
#[derive(Debug)]
pub struct ShardWriter {
    buffers: Arc<SharedBuffers>,
    shard: usize,
    player_begin: usize,
    player_end: usize,
}

impl ShardWriter {
    pub fn new(
        buffers: Arc<SharedBuffers>,
        shard: usize,
        player_begin: usize,
        player_end: usize,
    ) -> Self {
        assert!(shard < buffers.n_shards, "shard index out of range");
        assert!(
            player_begin <= player_end && player_end <= buffers.n_players,
            "player range out of bounds"
        );
        Self {
            buffers,
            shard,
            player_begin,
            player_end,
        }
    }

    /// Read access to the underlying tables, e.g. for reading other
    /// shards' status rows during finalization.
    pub fn buffers(&self) -> &SharedBuffers {
        &self.buffers
    }

    /// First global player index owned by this shard.
    pub fn player_begin(&self) -> usize {
        self.player_begin
    }

    /// One past the last global player index owned by this shard.
    pub fn player_end(&self) -> usize {
        self.player_end
    }

    fn check_owned(&self, player: usize) {
        assert!(
            (self.player_begin..self.player_end).contains(&player),
            "shard {} does not own player {player}",
            self.shard
        );
    }

    pub fn write_status(&self, player: usize, row: PlayerStatusRow) {
        self.check_owned(player);
        self.buffers
            .status
            .write_range(player * PlayerStatusRow::WIDTH, &row.to_array());
    }

    /// Publish one player's downsampled track (xyz triplets, length
    /// `max_track_length * 3`).
    pub fn write_track(&self, player: usize, xyz: &[f64]) {
        self.check_owned(player);
        debug_assert_eq!(xyz.len(), self.buffers.max_track_length * 3);
        self.buffers
            .tracks
            .write_range(player * self.buffers.max_track_length * 3, xyz);
    }

    /// Publish this shard's tracer positions (length `tracer_stride`).
    pub fn write_tracers(&self, xyz: &[f64]) {
        debug_assert_eq!(xyz.len(), self.buffers.tracer_stride);
        self.buffers
            .tracers
            .write_range(self.shard * self.buffers.tracer_stride, xyz);
    }
}

/// Cross-process control scalars. All monotone (once true, stays true)
/// except `paused`, so racy polling is harmless.
#[derive(Debug)]
pub struct ControlFlags {
    paused: AtomicBool,
    stop: AtomicBool,
    all_arrived: AtomicBool,
    shutdown: Vec<AtomicBool>,
    /// Total players that have arrived, across every shard. fetch_add
    /// here is what serializes finish order.
    arrived_count: AtomicUsize,
}

impl ControlFlags {
    pub fn new(n_shards: usize) -> Arc<Self> {
        let mut shutdown = Vec::with_capacity(n_shards);
        shutdown.resize_with(n_shards, || AtomicBool::new(false));
        Arc::new(Self {
            paused: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            all_arrived: AtomicBool::new(false),
            shutdown,
            arrived_count: AtomicUsize::new(0),
        })
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn all_arrived(&self) -> bool {
        self.all_arrived.load(Ordering::Relaxed)
    }

    pub fn set_all_arrived(&self) {
        self.all_arrived.store(true, Ordering::Relaxed);
    }

    pub fn mark_shutdown(&self, shard: usize) {
        self.shutdown[shard].store(true, Ordering::Relaxed);
    }

    pub fn all_shut_down(&self) -> bool {
        self.shutdown.iter().all(|f| f.load(Ordering::Relaxed))
    }

    /// Claim the next finish position. Returns the 0-based arrival order.
    pub fn claim_arrival(&self) -> usize {
        self.arrived_count.fetch_add(1, Ordering::Relaxed)
    }

    pub fn arrived_count(&self) -> usize {
        self.arrived_count.load(Ordering::Relaxed)
    }
}
