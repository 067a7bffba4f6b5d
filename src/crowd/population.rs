//! Population controller
//!
//! Sole owner of agent membership: spawns are queued and drained in small
//! batches per frame, removals go through swap-remove and hand the render handle
//! back to the pool exactly once. The leader is not stored as an agent but is
//! counted in every total (`total = count + 1`).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CrowdConfig;
use crate::crowd::constants::spawn::{
    COLUMNS, COLUMN_CENTER, COLUMN_SPACING, FIRST_ROW_Z, JITTER_X, MAX_ABS_X, ROW_JITTER, ROW_STEP,
};
use crate::crowd::gate::Gate;
use crate::crowd::locks::UnitRef;
use crate::crowd::pool::{AgentHandle, HandlePool};
use crate::crowd::store::AgentStore;
use crate::util::vec2::Vec2;

/// Controller state; `GameOver` is terminal until the session restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopulationState {
    Active,
    GameOver,
}

/// Why agents left the crowd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalCause {
    Gate,
    Sacrifice,
    Kill,
    GameOver,
}

/// Result of a kill request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KillOutcome {
    /// The targeted agent died; position is local to the leader
    Killed { handle: AgentHandle, position: Vec2 },
    /// The leader was hit and a tail agent died in its place
    Sacrificed { handle: AgentHandle, position: Vec2 },
    /// The leader was hit with no agents left
    GameOver,
    /// Handle not live, or the session already ended
    Missed,
}

impl KillOutcome {
    #[inline]
    pub fn succeeded(&self) -> bool {
        !matches!(self, KillOutcome::Missed)
    }
}

/// Spawn position for the agent about to take slot `count`
pub fn spawn_position<R: Rng>(count: usize, tail_z: Option<f32>, rng: &mut R) -> Vec2 {
    let column = (count % COLUMNS) as f32;
    let jitter = rng.gen_range(-JITTER_X..=JITTER_X);
    let x = ((column - COLUMN_CENTER) * COLUMN_SPACING + jitter).clamp(-MAX_ABS_X, MAX_ABS_X);
    let z = tail_z.unwrap_or(FIRST_ROW_Z) + ROW_STEP + rng.gen_range(0.0..ROW_JITTER);
    Vec2::new(x, z)
}

/// Owns the agent store, the handle pool and the population state machine
#[derive(Debug, Clone)]
pub struct PopulationController {
    store: AgentStore,
    pool: HandlePool,
    /// Spawns accepted but not yet placed
    pending: u32,
    max_total: u32,
    spawn_batch: u32,
    model_yaw: f32,
    state: PopulationState,
    peak_total: u32,
    spawned: u64,
    removed: u64,
    seed: u64,
    rng: StdRng,
}

impl PopulationController {
    pub fn new(config: &CrowdConfig) -> Self {
        Self {
            store: AgentStore::with_capacity(config.initial_capacity),
            pool: HandlePool::with_prewarm(config.pool_prewarm),
            pending: 0,
            max_total: config.max_total,
            spawn_batch: config.spawn_batch,
            model_yaw: config.model_yaw,
            state: PopulationState::Active,
            peak_total: 1,
            spawned: 0,
            removed: 0,
            seed: config.seed,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Remove every agent and return to `Active` with a fresh RNG
    pub fn reset(&mut self) {
        self.release_all();
        self.pending = 0;
        self.state = PopulationState::Active;
        self.peak_total = 1;
        self.spawned = 0;
        self.removed = 0;
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    #[inline]
    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    /// Per-agent values only; membership changes must go through the controller
    #[inline]
    pub(crate) fn store_mut(&mut self) -> &mut AgentStore {
        &mut self.store
    }

    #[inline]
    pub fn pool(&self) -> &HandlePool {
        &self.pool
    }

    #[inline]
    pub fn state(&self) -> PopulationState {
        self.state
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.state == PopulationState::GameOver
    }

    /// Live agents (leader excluded)
    #[inline]
    pub fn count(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Live units including the leader; 0 once the game is over
    pub fn total(&self) -> u32 {
        match self.state {
            PopulationState::Active => self.store.len() as u32 + 1,
            PopulationState::GameOver => 0,
        }
    }

    /// Total once every pending spawn has been placed
    pub fn projected_total(&self) -> u32 {
        match self.state {
            PopulationState::Active => self.total().saturating_add(self.pending),
            PopulationState::GameOver => 0,
        }
    }

    #[inline]
    pub fn peak_total(&self) -> u32 {
        self.peak_total
    }

    #[inline]
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    #[inline]
    pub fn removed(&self) -> u64 {
        self.removed
    }

    #[inline]
    pub fn max_total(&self) -> u32 {
        self.max_total
    }

    /// Queue `n` spawns, clamped to the room left under the ceiling
    /// Returns how many were accepted
    pub fn request_spawn(&mut self, n: u32) -> u32 {
        if self.is_game_over() {
            return 0;
        }
        let room = self.max_total.saturating_sub(self.projected_total());
        let accepted = n.min(room);
        self.pending += accepted;
        accepted
    }

    /// Place up to one batch of pending spawns; returns how many were placed
    pub fn drain_pending_spawns(&mut self) -> u32 {
        if self.is_game_over() || self.pending == 0 {
            return 0;
        }
        let batch = self.pending.min(self.spawn_batch);
        self.store.ensure_capacity(self.store.len() + batch as usize);

        for _ in 0..batch {
            let handle = self.pool.acquire();
            let position = spawn_position(self.store.len(), self.store.tail_z(), &mut self.rng);
            self.store.push(handle, position, self.model_yaw);
        }

        self.pending -= batch;
        self.spawned += u64::from(batch);
        self.peak_total = self.peak_total.max(self.total());
        batch
    }

    /// Swap-remove the agent at `index` and release its handle
    pub fn remove_at(&mut self, index: usize) -> Option<AgentHandle> {
        if self.is_game_over() {
            return None;
        }
        let handle = self.store.swap_remove(index)?;
        let released = self.pool.release(handle);
        debug_assert!(released, "handle {handle:?} released twice");
        self.removed += 1;
        Some(handle)
    }

    /// Remove up to `n` agents from the tail; returns how many were removed
    fn remove_tail(&mut self, n: u32) -> u32 {
        let mut removed = 0;
        while removed < n {
            let Some(handle) = self.store.pop() else {
                break;
            };
            let released = self.pool.release(handle);
            debug_assert!(released, "handle {handle:?} released twice");
            removed += 1;
        }
        self.removed += u64::from(removed);
        removed
    }

    fn release_all(&mut self) -> u32 {
        let count = self.store.len() as u32;
        for &handle in self.store.handles() {
            let released = self.pool.release(handle);
            debug_assert!(released, "handle {handle:?} released twice");
        }
        self.store.clear();
        self.removed += u64::from(count);
        count
    }

    fn enter_game_over(&mut self) -> u32 {
        let removed = self.release_all();
        self.pending = 0;
        self.state = PopulationState::GameOver;
        info!(peak = self.peak_total, removed, "Crowd wiped out, game over");
        removed
    }

    /// Resize the population to `target_total` units (leader included)
    ///
    /// The target is floored first; a non-finite or non-positive result removes
    /// everything and ends the game. The difference is taken against the live
    /// total: growth queues spawns, shrinking removes live agents from the tail
    /// and leaves pending spawns queued. Returns the number of agents removed.
    pub fn apply_population_delta(&mut self, target_total: f64) -> u32 {
        if self.is_game_over() {
            return 0;
        }
        let target = target_total.floor();
        if !target.is_finite() || target <= 0.0 {
            return self.enter_game_over();
        }

        let diff = target - f64::from(self.total());

        if diff > 0.0 {
            let wanted = diff.min(f64::from(u32::MAX)) as u32;
            let accepted = self.request_spawn(wanted);
            debug!(target, wanted, accepted, "Population grow");
            0
        } else if diff < 0.0 {
            let shrink = (-diff).min(self.store.len() as f64) as u32;
            let removed = self.remove_tail(shrink);
            debug!(target, removed, pending = self.pending, "Population shrink");
            removed
        } else {
            0
        }
    }

    /// Apply a gate to the live total
    pub fn apply_gate(&mut self, gate: Gate) -> u32 {
        if self.is_game_over() {
            return 0;
        }
        let current = self.total();
        let target = gate.target_total(current);
        debug!(gate = %gate, current, target, "Gate triggered");
        self.apply_population_delta(target)
    }

    /// Remove up to `amount` agents from the tail without touching the state
    pub fn sacrifice(&mut self, amount: u32) -> u32 {
        if self.is_game_over() {
            return 0;
        }
        self.remove_tail(amount)
    }

    /// Kill a unit
    ///
    /// Hitting the leader sacrifices the tail agent instead, or ends the game when
    /// no agents are left.
    pub fn kill(&mut self, unit: UnitRef) -> KillOutcome {
        if self.is_game_over() {
            return KillOutcome::Missed;
        }
        match unit {
            UnitRef::Leader => {
                let Some(last) = self.store.len().checked_sub(1) else {
                    self.enter_game_over();
                    return KillOutcome::GameOver;
                };
                let position = self.store.position(last);
                match self.remove_at(last) {
                    Some(handle) => KillOutcome::Sacrificed { handle, position },
                    None => KillOutcome::Missed,
                }
            }
            UnitRef::Agent(handle) => {
                let Some(slot) = self.store.slot_of(handle) else {
                    return KillOutcome::Missed;
                };
                let position = self.store.position(slot);
                match self.remove_at(slot) {
                    Some(handle) => KillOutcome::Killed { handle, position },
                    None => KillOutcome::Missed,
                }
            }
        }
    }

    /// `kill` reduced to success/failure
    #[inline]
    pub fn try_kill(&mut self, unit: UnitRef) -> bool {
        self.kill(unit).succeeded()
    }
}
