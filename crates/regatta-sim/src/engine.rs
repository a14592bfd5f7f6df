//! The per-shard simulation engine and its real-time tick loop.
//!
//! Each engine owns a contiguous slice of the roster and is the only
//! writer of those players' rows in the shared buffers. All shards share
//! the same wind field, terrain, clock and control flags; finish order
//! is serialized through the shared arrival counter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use regatta_core::config::RaceConfig;
use regatta_core::errors::BotError;
use regatta_core::events::RaceEvent;
use regatta_core::geo;
use regatta_core::state::{FastestTime, LeaderboardEntry, PlayerStatusRow};
use regatta_core::types::RaceClock;
use regatta_terrain::TerrainGrid;
use regatta_weather::{Forecast, TracerPool, WindField};

use crate::bot::{invoke_pilot, BotInputs, Pilot};
use crate::buffers::{ControlFlags, ShardWriter};
use crate::player::Player;
use crate::scores::{
    finalize_fastest_times, finalize_scores, live_points, log_store_error, rank_teams, ScoreStore,
};

/// Everything an engine shard needs at construction. Built once per
/// shard by the orchestration layer.
pub struct EngineSetup {
    pub shard: usize,
    pub config: Arc<RaceConfig>,
    pub clock: RaceClock,
    pub field: Arc<WindField>,
    pub terrain: Arc<TerrainGrid>,
    /// Full roster in global buffer-row order, all shards included.
    pub roster: Vec<String>,
    /// Pilots for this shard only, aligned with the writer's row range.
    pub bots: Vec<Box<dyn Pilot>>,
    pub writer: ShardWriter,
    pub flags: Arc<ControlFlags>,
    /// Shared across shards so concurrent finalization serializes on one
    /// store instead of clobbering files.
    pub store: Arc<dyn ScoreStore>,
    /// Cosmetic tracers owned by this shard.
    pub tracer_count: usize,
    pub tracer_seed: u64,
}

/// End-of-race results reported by one shard after finalization. The
/// leaderboard covers the full roster; every shard computes the same one.
#[derive(Debug, Clone)]
pub struct RaceReport {
    pub shard: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub fastest_times: Vec<FastestTime>,
}

/// One shard of the race simulation.
pub struct Engine {
    shard: usize,
    config: Arc<RaceConfig>,
    clock: RaceClock,
    field: Arc<WindField>,
    terrain: Arc<TerrainGrid>,
    roster: Vec<String>,
    players: Vec<Player>,
    bots: Vec<Box<dyn Pilot>>,
    writer: ShardWriter,
    flags: Arc<ControlFlags>,
    store: Arc<dyn ScoreStore>,
    tracers: TracerPool,
    tracer_xyz: Vec<f64>,
    forecast: Forecast,
    /// Real seconds of the last forecast refresh.
    last_forecast_refresh: f64,
    /// Full-resolution xyz track history per local player.
    tracks: Vec<Vec<f64>>,
    /// Sim arrival times (hours) for this shard's finishers.
    arrivals: HashMap<String, f64>,
    last_tick: Option<Instant>,
    race_over_emitted: bool,
}

impl Engine {
    pub fn new(setup: EngineSetup) -> Self {
        let begin = setup.writer.player_begin();
        let end = setup.writer.player_end();
        assert_eq!(
            setup.bots.len(),
            end - begin,
            "one pilot per owned roster row"
        );
        for (i, bot) in setup.bots.iter().enumerate() {
            assert_eq!(
                bot.team(),
                setup.roster[begin + i],
                "pilot order must match the roster slice"
            );
        }

        let players: Vec<Player> = setup.roster[begin..end]
            .iter()
            .map(|team| Player::new(team.clone(), &setup.config))
            .collect();
        let tracks = players
            .iter()
            .map(|p| {
                let (x, y, z) = position_xyz(p);
                vec![x, y, z]
            })
            .collect();

        let tracers = TracerPool::new(
            setup.tracer_count,
            setup.config.tracer_lifetime,
            setup.config.tracer_renewal_batch,
            setup.tracer_seed,
        );
        let tracer_xyz = vec![0.0; tracers.xyz_len()];
        let forecast = setup.field.forecast(0.0);

        Self {
            shard: setup.shard,
            config: setup.config,
            clock: setup.clock,
            field: setup.field,
            terrain: setup.terrain,
            roster: setup.roster,
            players,
            bots: setup.bots,
            writer: setup.writer,
            flags: setup.flags,
            store: setup.store,
            tracers,
            tracer_xyz,
            forecast,
            last_forecast_refresh: 0.0,
            tracks,
            arrivals: HashMap::new(),
            last_tick: None,
            race_over_emitted: false,
        }
    }

    pub fn shard(&self) -> usize {
        self.shard
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Team names owned by this shard.
    fn own_teams(&self) -> Vec<String> {
        self.players.iter().map(|p| p.team.clone()).collect()
    }

    /// Advance the shard by one tick anchored at `now`.
    ///
    /// In safe mode a failing bot is logged and treated as "no
    /// instructions"; otherwise the failure is returned and the caller
    /// is expected to stop the race.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<RaceEvent>, BotError> {
        if self.flags.is_paused() {
            // Paused time must not turn into a huge dt on resume.
            self.last_tick = Some(now);
            return Ok(Vec::new());
        }

        let last = match self.last_tick {
            Some(last) => last,
            None => {
                self.last_tick = Some(now);
                return Ok(Vec::new());
            }
        };
        let dt_real = now.saturating_duration_since(last).as_secs_f64();
        if dt_real < 1.0 / self.config.fps {
            return Ok(Vec::new());
        }
        self.last_tick = Some(now);

        let t = self.clock.elapsed_hours(now);
        let dt = self.clock.to_sim_hours(dt_real);
        let mut events = Vec::new();

        self.tracers.step(&self.field, t, dt);
        self.tracers.write_positions_xyz(&mut self.tracer_xyz);
        self.writer.write_tracers(&self.tracer_xyz);

        let elapsed = self.clock.elapsed_seconds(now);
        if elapsed - self.last_forecast_refresh >= self.config.forecast_refresh_interval {
            self.forecast = self.field.forecast(t);
            self.last_forecast_refresh = elapsed;
            debug!("shard {}: forecast refreshed at t={t:.2}h", self.shard);
        }

        self.run_bots(t, dt)?;
        self.move_players(t, dt, &mut events);
        self.publish_status();
        self.check_race_end(elapsed, &mut events);

        Ok(events)
    }

    /// Give every still-racing pilot its turn at the helm.
    fn run_bots(&mut self, t: f64, dt: f64) -> Result<(), BotError> {
        for (player, bot) in self.players.iter_mut().zip(&mut self.bots) {
            if player.arrived {
                continue;
            }
            let inputs = BotInputs {
                t,
                dt,
                longitude: player.longitude,
                latitude: player.latitude,
                heading: player.heading,
                speed: player.speed,
                vector: player.heading_vector(),
                forecast: &self.forecast,
                terrain: &self.terrain,
            };
            // Panics are always caught at the invocation boundary; safe
            // mode only decides whether the failure stops the race.
            match invoke_pilot(bot.as_mut(), &inputs) {
                Ok(Some(instructions)) => {
                    if let Err(e) = player.apply_instructions(&instructions) {
                        warn!("team {}: instructions rejected: {e}", player.team);
                    }
                }
                Ok(None) => {}
                Err(e) if self.config.safe_mode => {
                    warn!("team {}: bot failure ignored: {e}", player.team);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Move every ship along its wind-driven path, stopping at land, then
    /// update checkpoint and arrival state.
    fn move_players(&mut self, t: f64, dt: f64, events: &mut Vec<RaceEvent>) {
        let lats: Vec<f64> = self.players.iter().map(|p| p.latitude).collect();
        let lons: Vec<f64> = self.players.iter().map(|p| p.longitude).collect();
        let winds = self.field.get_uv_many(&lats, &lons, t);

        for (i, player) in self.players.iter_mut().enumerate() {
            if player.arrived {
                player.speed = 0.0;
                continue;
            }

            let (path_lats, path_lons) = player.get_path(dt, winds[i]);
            let sea = self.terrain.terrain_along(&path_lats, &path_lons);
            let stop = match sea.iter().position(|&s| !s) {
                Some(first_land) => first_land.saturating_sub(1),
                None => path_lats.len() - 1,
            };
            if stop > 0 {
                let (new_lat, new_lon) = (path_lats[stop], path_lons[stop]);
                player.distance_travelled += geo::distance_on_surface(
                    player.longitude,
                    player.latitude,
                    new_lon,
                    new_lat,
                );
                player.dlat = new_lat - player.latitude;
                // Signed shortest-way longitude delta, antimeridian aware.
                let mut dlon = new_lon - player.longitude;
                if dlon > 180.0 {
                    dlon -= 360.0;
                } else if dlon < -180.0 {
                    dlon += 360.0;
                }
                player.dlon = dlon;
                player.latitude = new_lat;
                player.longitude = new_lon;
            } else {
                player.dlat = 0.0;
                player.dlon = 0.0;
                player.speed = 0.0;
            }

            for (index, checkpoint) in player.checkpoints.iter_mut().enumerate() {
                if checkpoint.reached {
                    continue;
                }
                let d = geo::distance_on_surface(
                    player.longitude,
                    player.latitude,
                    checkpoint.longitude,
                    checkpoint.latitude,
                );
                if d < checkpoint.radius {
                    checkpoint.reached = true;
                    info!("team {} reached checkpoint {index}", player.team);
                    events.push(RaceEvent::CheckpointReached {
                        team: player.team.clone(),
                        index,
                    });
                }
            }

            let all_reached = player.checkpoints.iter().all(|c| c.reached);
            if all_reached {
                let to_finish = geo::distance_on_surface(
                    player.longitude,
                    player.latitude,
                    self.config.start.longitude,
                    self.config.start.latitude,
                );
                if to_finish < self.config.start.radius {
                    let arrived_before = self.flags.claim_arrival();
                    player.arrived = true;
                    player.speed = 0.0;
                    player.bonus =
                        self.config.score_step * (self.roster.len() - arrived_before) as i64;
                    player.arrival_time = Some(t + dt);
                    self.arrivals.insert(player.team.clone(), t + dt);
                    info!(
                        "team {} arrived in position {} at t={:.2}h",
                        player.team,
                        arrived_before + 1,
                        t + dt
                    );
                    events.push(RaceEvent::PlayerArrived {
                        team: player.team.clone(),
                        rank: arrived_before + 1,
                        sim_time: t + dt,
                    });
                }
            }

            let (x, y, z) = position_xyz(player);
            self.tracks[i].extend_from_slice(&[x, y, z]);
        }

        for i in 0..self.players.len() {
            self.publish_track(i);
        }
    }

    /// Publish one player's track, downsampled to the configured length,
    /// newest point first.
    fn publish_track(&self, local: usize) {
        let hist = &self.tracks[local];
        let n = hist.len() / 3;
        let m = self.config.max_track_length;
        if n == 0 || m == 0 {
            return;
        }
        let mut out = vec![0.0; m * 3];
        for k in 0..m {
            let back = ((k * n) / m).min(n - 1);
            let src = (n - 1 - back) * 3;
            out[k * 3..k * 3 + 3].copy_from_slice(&hist[src..src + 3]);
        }
        self.writer
            .write_track(self.writer.player_begin() + local, &out);
    }

    fn publish_status(&self) {
        for (i, player) in self.players.iter().enumerate() {
            self.writer.write_status(
                self.writer.player_begin() + i,
                PlayerStatusRow {
                    points: live_points(player, &self.config) as f64,
                    distance_travelled: player.distance_travelled,
                    speed: player.speed,
                    checkpoints_reached: player.checkpoints_reached() as f64,
                },
            );
        }
    }

    fn check_race_end(&mut self, elapsed_seconds: f64, events: &mut Vec<RaceEvent>) {
        if self.flags.arrived_count() >= self.roster.len() {
            self.flags.set_all_arrived();
        }
        let time_up = elapsed_seconds >= self.config.time_limit;
        if (time_up || self.flags.all_arrived()) && !self.race_over_emitted {
            self.race_over_emitted = true;
            self.flags.request_stop();
            events.push(RaceEvent::RaceOver);
        }
    }

    /// Drive the tick loop in real time until the race stops, then
    /// finalize and report. Runs on the shard's own thread.
    pub fn run(&mut self) -> RaceReport {
        let frame = Duration::from_secs_f64(1.0 / self.config.fps);
        let mut next_tick = Instant::now() + frame;

        while !self.flags.stop_requested() {
            match self.tick(Instant::now()) {
                Ok(events) => {
                    for event in &events {
                        debug!("shard {}: {event:?}", self.shard);
                    }
                }
                Err(e) => {
                    warn!("shard {}: stopping on bot failure: {e}", self.shard);
                    self.flags.request_stop();
                    break;
                }
            }

            let now = Instant::now();
            if now < next_tick {
                std::thread::sleep(next_tick - now);
            } else if now > next_tick + 2 * frame {
                // Way behind schedule; drop the backlog instead of
                // fast-forwarding through it.
                next_tick = now;
            }
            next_tick += frame;
        }

        let report = self.finalize();
        self.flags.mark_shutdown(self.shard);
        report
    }

    /// End-of-race scoring: rank the full roster from the shared status
    /// table, hand out round points, persist this shard's teams.
    fn finalize(&mut self) -> RaceReport {
        // One last publish so the global table reflects final state.
        self.publish_status();

        let ranking = rank_teams(&self.global_points());
        let own = self.own_teams();

        let leaderboard = match finalize_scores(&ranking, &self.config, self.store.as_ref(), &own) {
            Ok(board) => board,
            Err(e) => {
                log_store_error("round scores", Err(e));
                Vec::new()
            }
        };
        let fastest_times =
            match finalize_fastest_times(&self.arrivals, self.store.as_ref(), &own) {
                Ok(times) => times,
                Err(e) => {
                    log_store_error("fastest times", Err(e));
                    Vec::new()
                }
            };

        RaceReport {
            shard: self.shard,
            leaderboard,
            fastest_times,
        }
    }

    /// Live points for the whole roster, read back from the shared
    /// status table so cross-shard players are included.
    fn global_points(&self) -> Vec<(String, i64)> {
        let begin = self.writer.player_begin();
        let end = self.writer.player_end();
        self.roster
            .iter()
            .enumerate()
            .map(|(row, team)| {
                // Own rows come from local state; foreign rows from the
                // shared table.
                let points = if (begin..end).contains(&row) {
                    live_points(&self.players[row - begin], &self.config)
                } else {
                    self.writer.buffers().read_status(row).points as i64
                };
                (team.clone(), points)
            })
            .collect()
    }
}

fn position_xyz(player: &Player) -> (f64, f64, f64) {
    geo::to_cartesian(
        geo::lon_to_phi(player.longitude),
        geo::lat_to_theta(player.latitude),
    )
}
