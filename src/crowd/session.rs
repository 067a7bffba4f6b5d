//! Crowd session
//!
//! Owns every crowd subsystem for one run and steps them with an explicit
//! `tick(dt)`. Collaborators (track, enemies, UI) talk to the crowd only through
//! this type: they inject the obstacle oracle at construction, push gate, kill
//! and lock events in, and read the presentation frame and drained events out.
//!
//! Per-frame order: drain pending spawns, run at most one fixed flocking step,
//! then integrate and refresh the presentation frame.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::config::{ConfigError, CrowdConfig};
use crate::crowd::frame::PresentationFrame;
use crate::crowd::gate::{FlowState, Gate};
use crate::crowd::locks::{TargetLockLedger, UnitRef};
use crate::crowd::oracle::ObstacleOracle;
use crate::crowd::pool::AgentHandle;
use crate::crowd::population::{KillOutcome, PopulationController, PopulationState, RemovalCause};
use crate::crowd::systems::{integrate, FlockingSolver, IntegrationParams};
use crate::crowd::targeting;
use crate::metrics::SimMetrics;
use crate::util::vec2::Vec2;

/// Signals for collaborators (HUD, audio, effects)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CrowdEvent {
    /// Total units changed, leader included
    PopulationChanged { total: u32 },
    /// A single agent died; position is in world space
    UnitKilled { handle: AgentHandle, position: Vec2 },
    /// Agents removed in bulk
    UnitsRemoved { count: u32, cause: RemovalCause },
    GameOver { final_total: u32, peak_total: u32 },
}

/// Outcome of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub final_total: u32,
    pub peak_total: u32,
    pub spawned: u64,
    pub removed: u64,
    pub game_over: bool,
    pub metrics: SimMetrics,
}

type EventQueue = SmallVec<[CrowdEvent; 8]>;

/// One run of the crowd simulation
pub struct CrowdSession<O: ObstacleOracle> {
    config: CrowdConfig,
    oracle: O,
    population: PopulationController,
    solver: FlockingSolver,
    integration: IntegrationParams,
    locks: TargetLockLedger,
    leader: Vec2,
    tick: u64,
    frame: PresentationFrame,
    events: EventQueue,
    metrics: SimMetrics,
    /// Mystery gate rolls (spawn jitter has its own stream)
    rng: StdRng,
    /// Total reported by the last PopulationChanged event
    reported_total: u32,
}

impl<O: ObstacleOracle> CrowdSession<O> {
    /// Validate `config` and allocate every structure for a new run
    pub fn start(config: CrowdConfig, oracle: O) -> Result<Self, ConfigError> {
        config.validate()?;

        let session = Self {
            population: PopulationController::new(&config),
            solver: FlockingSolver::new(&config),
            integration: IntegrationParams::from_config(&config),
            locks: TargetLockLedger::new(),
            leader: Vec2::ZERO,
            tick: 0,
            frame: PresentationFrame::with_capacity(config.initial_capacity),
            events: EventQueue::new(),
            metrics: SimMetrics::new(),
            rng: Self::gate_rng(&config),
            reported_total: 1,
            oracle,
            config,
        };

        info!(
            max_total = session.config.max_total,
            logic_hz = session.config.logic_hz,
            seed = session.config.seed,
            "Crowd session started"
        );
        Ok(session)
    }

    fn gate_rng(config: &CrowdConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed.rotate_left(32) ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Tear down the run and start over with the same config and oracle
    pub fn restart(&mut self) {
        self.population.reset();
        self.solver.reset();
        self.locks.clear();
        self.leader = Vec2::ZERO;
        self.tick = 0;
        self.frame.refresh(0, Vec2::ZERO, 1, self.population.store());
        self.events.clear();
        self.metrics.reset();
        self.rng = Self::gate_rng(&self.config);
        self.reported_total = 1;
        self.sync_metrics();
        info!("Crowd session restarted");
    }

    /// End the run and report how it went
    pub fn end(mut self) -> SessionSummary {
        self.sync_metrics();
        let summary = SessionSummary {
            frames: self.tick,
            final_total: self.population.total(),
            peak_total: self.population.peak_total(),
            spawned: self.population.spawned(),
            removed: self.population.removed(),
            game_over: self.population.is_game_over(),
            metrics: self.metrics,
        };
        info!(
            frames = summary.frames,
            peak = summary.peak_total,
            game_over = summary.game_over,
            "Crowd session ended"
        );
        summary
    }

    // ========================================================================
    // Frame stepping
    // ========================================================================

    /// Advance the simulation by one rendered frame
    pub fn tick(&mut self, dt: f32) {
        self.tick += 1;
        self.metrics.frames += 1;

        if self.population.is_game_over() {
            return;
        }

        self.population.drain_pending_spawns();

        let store = self.population.store_mut();
        if let Some(stats) = self.solver.advance(dt, store) {
            self.metrics.logic_steps += 1;
            #[cfg(feature = "metrics_extended")]
            {
                self.metrics.neighbor_candidates += stats.candidates;
                self.metrics.saturated_queries += stats.saturated_queries;
            }
            #[cfg(not(feature = "metrics_extended"))]
            let _ = stats;
        }

        let clamped = integrate(store, self.leader, &self.oracle, &self.integration, dt);
        self.metrics.lane_clamps += clamped as u64;

        self.frame.refresh(
            self.tick,
            self.leader,
            self.population.total(),
            self.population.store(),
        );
        self.after_population_change();
    }

    /// Move the leader; agents are stored relative to it
    pub fn set_leader_position(&mut self, position: Vec2) {
        if position.is_finite() {
            self.leader = position;
        }
    }

    #[inline]
    pub fn leader_position(&self) -> Vec2 {
        self.leader
    }

    // ========================================================================
    // Population events
    // ========================================================================

    /// Apply a gate to the current total; returns live agents removed
    pub fn apply_gate(&mut self, gate: Gate) -> u32 {
        if self.population.is_game_over() {
            return 0;
        }
        let before = self.population.count() as u32;
        let removed = self.population.apply_gate(gate);
        self.metrics.gates_applied += 1;

        if self.population.is_game_over() {
            self.report_removed(before, RemovalCause::GameOver);
        } else {
            self.report_removed(removed, RemovalCause::Gate);
        }
        self.after_population_change();
        removed
    }

    /// Resolve a mystery gate for `flow`, apply it and return what it became
    pub fn apply_mystery_gate(&mut self, flow: FlowState) -> Gate {
        let gate = Gate::resolve_mystery(flow, &mut self.rng);
        debug!(?flow, gate = %gate, "Mystery gate resolved");
        self.apply_gate(gate);
        gate
    }

    /// Queue spawns outside the gate path (pickups, rewards)
    pub fn request_spawn(&mut self, n: u32) -> u32 {
        let accepted = self.population.request_spawn(n);
        self.after_population_change();
        accepted
    }

    /// Remove up to `amount` agents from the tail (deadlock resolution)
    pub fn sacrifice(&mut self, amount: u32) -> u32 {
        let removed = self.population.sacrifice(amount);
        self.report_removed(removed, RemovalCause::Sacrifice);
        self.after_population_change();
        removed
    }

    /// Kill a unit; hitting the leader sacrifices an agent or ends the game
    pub fn try_kill(&mut self, unit: UnitRef) -> bool {
        let before = self.population.count() as u32;
        let outcome = self.population.kill(unit);
        match outcome {
            KillOutcome::Killed { handle, position } | KillOutcome::Sacrificed { handle, position } => {
                self.events.push(CrowdEvent::UnitKilled {
                    handle,
                    position: self.leader + position,
                });
            }
            KillOutcome::GameOver => self.report_removed(before, RemovalCause::GameOver),
            KillOutcome::Missed => {}
        }
        self.after_population_change();
        outcome.succeeded()
    }

    /// Kill the front-row agent closest to `enemy`, or end the game when only the
    /// leader is left
    pub fn kill_frontline(&mut self, enemy: Vec2) -> bool {
        if self.population.is_game_over() {
            return false;
        }
        match targeting::frontline_victim(self.population.store(), self.leader, enemy) {
            Some(handle) => self.try_kill(UnitRef::Agent(handle)),
            None => self.try_kill(UnitRef::Leader),
        }
    }

    // ========================================================================
    // Target locks and queries
    // ========================================================================

    pub fn add_lock(&mut self, unit: UnitRef) {
        self.locks.add_lock(unit);
    }

    pub fn remove_lock(&mut self, unit: UnitRef) {
        self.locks.remove_lock(unit);
    }

    #[inline]
    pub fn lock_count(&self, unit: UnitRef) -> u32 {
        self.locks.lock_count(unit)
    }

    #[inline]
    pub fn locks(&self) -> &TargetLockLedger {
        &self.locks
    }

    pub fn frontline_unit(&self) -> Option<UnitRef> {
        if self.population.is_game_over() {
            return None;
        }
        Some(targeting::frontline_unit(self.population.store(), self.leader))
    }

    pub fn closest_unit(&self, position: Vec2) -> Option<UnitRef> {
        if self.population.is_game_over() {
            return None;
        }
        Some(targeting::closest_unit(self.population.store(), self.leader, position))
    }

    /// World position of a live unit
    pub fn unit_position(&self, unit: UnitRef) -> Option<Vec2> {
        if self.population.is_game_over() {
            return None;
        }
        match unit {
            UnitRef::Leader => Some(self.leader),
            UnitRef::Agent(handle) => {
                let store = self.population.store();
                store
                    .slot_of(handle)
                    .map(|slot| targeting::world_position(store, self.leader, slot))
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Poses as of the last tick
    #[inline]
    pub fn frame(&self) -> &PresentationFrame {
        &self.frame
    }

    /// Take every event raised since the last drain
    pub fn drain_events(&mut self) -> impl Iterator<Item = CrowdEvent> + '_ {
        self.events.drain(..)
    }

    #[inline]
    pub fn population(&self) -> &PopulationController {
        &self.population
    }

    #[inline]
    pub fn state(&self) -> PopulationState {
        self.population.state()
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.population.is_game_over()
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.population.total()
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn config(&self) -> &CrowdConfig {
        &self.config
    }

    #[inline]
    pub fn solver(&self) -> &FlockingSolver {
        &self.solver
    }

    #[inline]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The track generator updates fences in place
    #[inline]
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    #[inline]
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// For host-side measurements such as tick time
    #[inline]
    pub fn metrics_mut(&mut self) -> &mut SimMetrics {
        &mut self.metrics
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn report_removed(&mut self, count: u32, cause: RemovalCause) {
        if count > 0 {
            debug!(count, ?cause, "Agents removed");
            self.events.push(CrowdEvent::UnitsRemoved { count, cause });
        }
    }

    /// Emit population and game-over events for whatever changed
    fn after_population_change(&mut self) {
        let total = self.population.total();
        if self.population.is_game_over() {
            if self.reported_total != 0 {
                let final_total = self.reported_total;
                self.reported_total = 0;
                // Released handles must not linger in the last frame
                self.frame.refresh(self.tick, self.leader, 0, self.population.store());
                self.metrics.game_overs += 1;
                self.events.push(CrowdEvent::PopulationChanged { total: 0 });
                self.events.push(CrowdEvent::GameOver {
                    final_total,
                    peak_total: self.population.peak_total(),
                });
            }
        } else if total != self.reported_total {
            self.reported_total = total;
            self.events.push(CrowdEvent::PopulationChanged { total });
        }
        self.sync_metrics();
    }

    fn sync_metrics(&mut self) {
        self.metrics.spawned = self.population.spawned();
        self.metrics.removed = self.population.removed();
        self.metrics.total = self.population.total();
        self.metrics.peak_total = self.population.peak_total();
    }
}
