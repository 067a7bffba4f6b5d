//! Agent store (Structure of Arrays)
//!
//! Positions and velocities live in parallel `f32` arrays indexed `0..len`, so
//! the flocking and integration passes walk contiguous memory. The live prefix is
//! always dense: removal is swap-remove, never a tombstone. Arrays are sized to
//! the capacity and only grow (doubling) when a push would overflow it.

use crate::crowd::constants::population::MIN_STORE_CAPACITY;
use crate::crowd::pool::AgentHandle;
use crate::util::vec2::Vec2;

const NO_SLOT: u32 = u32::MAX;

/// Mutable view of the live prefix of every lane
pub struct AgentLanesMut<'a> {
    pub pos_x: &'a mut [f32],
    pub pos_z: &'a mut [f32],
    pub vel_x: &'a mut [f32],
    pub vel_z: &'a mut [f32],
    pub yaw: &'a mut [f32],
}

/// Dense SoA storage for all active agents
#[derive(Debug, Clone, Default)]
pub struct AgentStore {
    /// Number of live agents
    count: usize,
    /// Length of every numeric lane
    capacity: usize,

    // === Simulation lanes ===
    pos_x: Vec<f32>,
    pos_z: Vec<f32>,
    vel_x: Vec<f32>,
    vel_z: Vec<f32>,

    // === Presentation lanes ===
    /// Smoothed heading in degrees (never read by the simulation)
    yaw: Vec<f32>,
    /// Render handle bound to each live slot
    handles: Vec<AgentHandle>,
    /// Map from handle to dense slot (NO_SLOT when not live)
    slot_of: Vec<u32>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with room for `capacity` agents
    pub fn with_capacity(capacity: usize) -> Self {
        let mut store = Self::new();
        store.ensure_capacity(capacity);
        store
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grow every lane so `needed` agents fit, preserving contents
    ///
    /// New capacity is the largest of `needed`, double the current capacity and
    /// the minimum floor.
    pub fn ensure_capacity(&mut self, needed: usize) {
        if needed <= self.capacity {
            return;
        }
        let new_capacity = needed.max(self.capacity * 2).max(MIN_STORE_CAPACITY);

        self.pos_x.resize(new_capacity, 0.0);
        self.pos_z.resize(new_capacity, 0.0);
        self.vel_x.resize(new_capacity, 0.0);
        self.vel_z.resize(new_capacity, 0.0);
        self.yaw.resize(new_capacity, 0.0);
        self.handles.reserve(new_capacity - self.handles.len());

        self.capacity = new_capacity;
    }

    /// Append an agent at rest and return its slot
    pub fn push(&mut self, handle: AgentHandle, position: Vec2, yaw: f32) -> usize {
        self.ensure_capacity(self.count + 1);
        let index = self.count;

        self.pos_x[index] = position.x;
        self.pos_z[index] = position.z;
        self.vel_x[index] = 0.0;
        self.vel_z[index] = 0.0;
        self.yaw[index] = yaw;
        self.handles.push(handle);

        if handle.index() >= self.slot_of.len() {
            self.slot_of.resize(handle.index() + 1, NO_SLOT);
        }
        self.slot_of[handle.index()] = index as u32;

        self.count += 1;
        index
    }

    /// Remove the agent at `index` by moving the last agent into its slot (O(1))
    /// Returns the removed agent's handle, or None if `index` is out of range
    pub fn swap_remove(&mut self, index: usize) -> Option<AgentHandle> {
        if index >= self.count {
            return None;
        }
        let last = self.count - 1;

        if index != last {
            self.pos_x[index] = self.pos_x[last];
            self.pos_z[index] = self.pos_z[last];
            self.vel_x[index] = self.vel_x[last];
            self.vel_z[index] = self.vel_z[last];
            self.yaw[index] = self.yaw[last];

            let moved = self.handles[last];
            self.slot_of[moved.index()] = index as u32;
        }

        let removed = self.handles.swap_remove(index);
        self.slot_of[removed.index()] = NO_SLOT;
        self.count -= 1;
        Some(removed)
    }

    /// Remove the tail agent
    #[inline]
    pub fn pop(&mut self) -> Option<AgentHandle> {
        self.count.checked_sub(1).and_then(|last| self.swap_remove(last))
    }

    /// Drop every agent, keeping the allocated lanes
    pub fn clear(&mut self) {
        for handle in self.handles.drain(..) {
            self.slot_of[handle.index()] = NO_SLOT;
        }
        self.count = 0;
    }

    /// Dense slot currently holding `handle`
    #[inline]
    pub fn slot_of(&self, handle: AgentHandle) -> Option<usize> {
        match self.slot_of.get(handle.index()) {
            Some(&slot) if slot != NO_SLOT => Some(slot as usize),
            _ => None,
        }
    }

    #[inline]
    pub fn handle(&self, index: usize) -> Option<AgentHandle> {
        self.handles.get(index).copied()
    }

    #[inline]
    pub fn handles(&self) -> &[AgentHandle] {
        &self.handles
    }

    /// Local position of agent `index` (relative to the leader)
    #[inline]
    pub fn position(&self, index: usize) -> Vec2 {
        Vec2::new(self.pos_x[index], self.pos_z[index])
    }

    #[inline]
    pub fn velocity(&self, index: usize) -> Vec2 {
        Vec2::new(self.vel_x[index], self.vel_z[index])
    }

    #[inline]
    pub fn yaw(&self, index: usize) -> f32 {
        self.yaw[index]
    }

    pub fn set_position(&mut self, index: usize, position: Vec2) {
        if index < self.count {
            self.pos_x[index] = position.x;
            self.pos_z[index] = position.z;
        }
    }

    pub fn set_velocity(&mut self, index: usize, velocity: Vec2) {
        if index < self.count {
            self.vel_x[index] = velocity.x;
            self.vel_z[index] = velocity.z;
        }
    }

    /// Local Z of the last agent (where new rows are appended behind)
    #[inline]
    pub fn tail_z(&self) -> Option<f32> {
        self.count.checked_sub(1).map(|last| self.pos_z[last])
    }

    #[inline]
    pub fn pos_x(&self) -> &[f32] {
        &self.pos_x[..self.count]
    }

    #[inline]
    pub fn pos_z(&self) -> &[f32] {
        &self.pos_z[..self.count]
    }

    #[inline]
    pub fn vel_x(&self) -> &[f32] {
        &self.vel_x[..self.count]
    }

    #[inline]
    pub fn vel_z(&self) -> &[f32] {
        &self.vel_z[..self.count]
    }

    /// Borrow the live prefix of every lane mutably at once
    pub fn lanes_mut(&mut self) -> AgentLanesMut<'_> {
        let n = self.count;
        AgentLanesMut {
            pos_x: &mut self.pos_x[..n],
            pos_z: &mut self.pos_z[..n],
            vel_x: &mut self.vel_x[..n],
            vel_z: &mut self.vel_z[..n],
            yaw: &mut self.yaw[..n],
        }
    }

    /// Structural invariants: dense prefix, lanes sized to capacity, handle map in sync
    pub fn is_consistent(&self) -> bool {
        let lanes_sized = [&self.pos_x, &self.pos_z, &self.vel_x, &self.vel_z, &self.yaw]
            .iter()
            .all(|lane| lane.len() == self.capacity);

        let slots_match = self
            .handles
            .iter()
            .enumerate()
            .all(|(i, h)| self.slot_of(*h) == Some(i));

        let live_slots = self.slot_of.iter().filter(|&&s| s != NO_SLOT).count();

        self.count <= self.capacity
            && lanes_sized
            && self.handles.len() == self.count
            && slots_match
            && live_slots == self.count
    }
}
