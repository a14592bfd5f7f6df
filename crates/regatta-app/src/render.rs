//! The render boundary.
//!
//! Rendering never touches engine state: a sink is handed a [`RaceView`]
//! over the shared buffers once per frame and may request a race stop,
//! nothing more. Any actual display layer (terminal, GUI, headless
//! recorder) plugs in behind [`RenderSink`].

use log::info;

use regatta_core::state::PlayerStatusRow;
use regatta_sim::buffers::SharedBuffers;

/// What the sink tells the orchestrator after each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    /// Stop the race, like closing the window in a live viewer.
    Stop,
}

/// Read-only snapshot handle for one render frame.
pub struct RaceView<'a> {
    pub buffers: &'a SharedBuffers,
    /// Team names in buffer-row order.
    pub roster: &'a [String],
    /// Real seconds since race start.
    pub elapsed_seconds: f64,
}

impl RaceView<'_> {
    /// Current standings, best first: (team, status row).
    pub fn standings(&self) -> Vec<(String, PlayerStatusRow)> {
        let mut rows: Vec<(String, PlayerStatusRow)> = self
            .roster
            .iter()
            .enumerate()
            .map(|(i, team)| (team.clone(), self.buffers.read_status(i)))
            .collect();
        rows.sort_by(|a, b| {
            b.1.points
                .total_cmp(&a.1.points)
                .then_with(|| a.0.cmp(&b.0))
        });
        rows
    }
}

/// A frame consumer driven by the orchestrator's render loop.
pub trait RenderSink {
    fn frame(&mut self, view: &RaceView<'_>) -> SinkControl;
}

/// Headless sink that logs the standings on a coarse interval.
pub struct LogSink {
    /// Real seconds between standings reports.
    interval: f64,
    last_report: f64,
}

impl LogSink {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last_report: f64::NEG_INFINITY,
        }
    }
}

impl RenderSink for LogSink {
    fn frame(&mut self, view: &RaceView<'_>) -> SinkControl {
        if view.elapsed_seconds - self.last_report >= self.interval {
            self.last_report = view.elapsed_seconds;
            for (place, (team, row)) in view.standings().iter().enumerate() {
                info!(
                    "[{:>6.1}s] #{} {}: {} pts, {:.0} km sailed, {} checkpoints",
                    view.elapsed_seconds,
                    place + 1,
                    team,
                    row.points as i64,
                    row.distance_travelled,
                    row.checkpoints_reached as i64,
                );
            }
        }
        SinkControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_sim::buffers::ShardWriter;
    use std::sync::Arc;

    fn view_fixture() -> (Arc<SharedBuffers>, Vec<String>) {
        let buffers = SharedBuffers::new(2, 1, 4, 3);
        let writer = ShardWriter::new(buffers.clone(), 0, 0, 2);
        writer.write_status(
            0,
            PlayerStatusRow {
                points: 10.0,
                ..PlayerStatusRow::default()
            },
        );
        writer.write_status(
            1,
            PlayerStatusRow {
                points: 90.0,
                ..PlayerStatusRow::default()
            },
        );
        (buffers, vec!["slow".into(), "fast".into()])
    }

    #[test]
    fn test_standings_sorted_by_points() {
        let (buffers, roster) = view_fixture();
        let view = RaceView {
            buffers: &buffers,
            roster: &roster,
            elapsed_seconds: 1.0,
        };
        let standings = view.standings();
        assert_eq!(standings[0].0, "fast");
        assert_eq!(standings[1].0, "slow");
    }

    #[test]
    fn test_log_sink_never_stops_the_race() {
        let (buffers, roster) = view_fixture();
        let mut sink = LogSink::new(5.0);
        for k in 0..20 {
            let view = RaceView {
                buffers: &buffers,
                roster: &roster,
                elapsed_seconds: k as f64,
            };
            assert_eq!(sink.frame(&view), SinkControl::Continue);
        }
    }
}
