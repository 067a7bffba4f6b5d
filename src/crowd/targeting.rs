//! Read-only unit queries for enemy collaborators
//!
//! Agent positions in the store are local to the leader; everything here works in
//! world space. The crowd runs towards -Z, so the frontline is the minimum Z.

use crate::crowd::constants::targeting::FRONT_ROW_TOLERANCE;
use crate::crowd::locks::UnitRef;
use crate::crowd::pool::AgentHandle;
use crate::crowd::store::AgentStore;
use crate::util::vec2::Vec2;

/// World position of agent `index`
#[inline]
pub fn world_position(store: &AgentStore, leader: Vec2, index: usize) -> Vec2 {
    leader + store.position(index)
}

/// Unit furthest ahead; the leader wins ties
pub fn frontline_unit(store: &AgentStore, leader: Vec2) -> UnitRef {
    let mut best = UnitRef::Leader;
    let mut best_z = leader.z;
    for (i, &z) in store.pos_z().iter().enumerate() {
        let world_z = leader.z + z;
        if world_z < best_z {
            best_z = world_z;
            best = UnitRef::Agent(store.handles()[i]);
        }
    }
    best
}

/// Unit closest to `position`; the leader wins ties
pub fn closest_unit(store: &AgentStore, leader: Vec2, position: Vec2) -> UnitRef {
    let mut best = UnitRef::Leader;
    let mut best_dist = leader.distance_sq_to(position);
    for i in 0..store.len() {
        let dist = world_position(store, leader, i).distance_sq_to(position);
        if dist < best_dist {
            best_dist = dist;
            best = UnitRef::Agent(store.handles()[i]);
        }
    }
    best
}

/// Agent an enemy at `enemy` should kill: the front-row agent closest to it
///
/// The front row is every agent within `FRONT_ROW_TOLERANCE` of the frontmost
/// agent's Z. None when there are no agents.
pub fn frontline_victim(store: &AgentStore, leader: Vec2, enemy: Vec2) -> Option<AgentHandle> {
    let front_z = store.pos_z().iter().copied().reduce(f32::min)?;
    let row_limit = front_z + FRONT_ROW_TOLERANCE;

    let mut best: Option<(usize, f32)> = None;
    for (i, &z) in store.pos_z().iter().enumerate() {
        if z > row_limit {
            continue;
        }
        let dist = world_position(store, leader, i).distance_sq_to(enemy);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.and_then(|(i, _)| store.handle(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(positions: &[(f32, f32)]) -> AgentStore {
        let mut store = AgentStore::new();
        for (i, &(x, z)) in positions.iter().enumerate() {
            store.push(AgentHandle(i as u32 + 100), Vec2::new(x, z), 0.0);
        }
        store
    }

    #[test]
    fn test_frontline_is_minimum_world_z() {
        let store = store_with(&[(0.0, 2.0), (1.0, -1.5), (-1.0, 0.5)]);
        let leader = Vec2::new(0.0, -40.0);
        assert_eq!(frontline_unit(&store, leader), UnitRef::Agent(AgentHandle(101)));
    }

    #[test]
    fn test_leader_wins_frontline_ties() {
        let store = store_with(&[(1.0, 0.0), (0.0, 3.0)]);
        assert_eq!(frontline_unit(&store, Vec2::ZERO), UnitRef::Leader);
        assert_eq!(frontline_unit(&AgentStore::new(), Vec2::ZERO), UnitRef::Leader);
    }

    #[test]
    fn test_closest_unit() {
        let store = store_with(&[(3.0, 3.0), (-2.0, 1.0)]);
        let leader = Vec2::new(1.0, -10.0);

        assert_eq!(
            closest_unit(&store, leader, Vec2::new(4.0, -7.0)),
            UnitRef::Agent(AgentHandle(100))
        );
        assert_eq!(closest_unit(&store, leader, Vec2::new(1.0, -20.0)), UnitRef::Leader);
    }

    #[test]
    fn test_victim_picked_from_front_row() {
        // Front row: z in [-1.0, -0.5]; agent 2 is nearer the enemy but behind
        let store = store_with(&[(-3.0, -1.0), (3.0, -0.6), (5.0, 2.0)]);
        let enemy = Vec2::new(5.0, 3.0);
        assert_eq!(frontline_victim(&store, Vec2::ZERO, enemy), Some(AgentHandle(101)));
    }

    #[test]
    fn test_victim_none_without_agents() {
        assert_eq!(frontline_victim(&AgentStore::new(), Vec2::ZERO, Vec2::ZERO), None);
    }
}
