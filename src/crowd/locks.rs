//! Target-lock ledger
//!
//! Counts how many external hunters are committed to each unit so enemy
//! attention can be spread across the crowd. Zero counts are never stored, so
//! the map stays as small as the set of currently targeted units.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::crowd::pool::AgentHandle;

/// Identity of a unit that can be targeted or killed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitRef {
    /// The always-present leader
    Leader,
    /// A crowd agent, by render handle
    Agent(AgentHandle),
}

/// Reference-counted map of unit -> active hunters
#[derive(Debug, Default, Clone)]
pub struct TargetLockLedger {
    locks: HashMap<UnitRef, u32, FxBuildHasher>,
}

impl TargetLockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more hunter on `unit`
    pub fn add_lock(&mut self, unit: UnitRef) {
        *self.locks.entry(unit).or_insert(0) += 1;
    }

    /// Release one hunter from `unit`; the entry is dropped when it reaches zero
    pub fn remove_lock(&mut self, unit: UnitRef) {
        if let Some(count) = self.locks.get_mut(&unit) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.locks.remove(&unit);
            }
        }
    }

    /// Active hunters on `unit` (0 when absent)
    #[inline]
    pub fn lock_count(&self, unit: UnitRef) -> u32 {
        self.locks.get(&unit).copied().unwrap_or(0)
    }

    /// Number of units with at least one lock
    #[inline]
    pub fn active_targets(&self) -> usize {
        self.locks.len()
    }

    #[inline]
    pub fn contains(&self, unit: UnitRef) -> bool {
        self.locks.contains_key(&unit)
    }

    pub fn clear(&mut self) {
        self.locks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_zero() {
        let ledger = TargetLockLedger::new();
        assert_eq!(ledger.lock_count(UnitRef::Leader), 0);
        assert_eq!(ledger.active_targets(), 0);
    }

    #[test]
    fn test_add_and_remove_symmetry() {
        let mut ledger = TargetLockLedger::new();
        let unit = UnitRef::Agent(AgentHandle(7));

        for n in 1..=5 {
            ledger.add_lock(unit);
            assert_eq!(ledger.lock_count(unit), n);
        }
        for _ in 0..5 {
            ledger.remove_lock(unit);
        }

        assert_eq!(ledger.lock_count(unit), 0);
        assert!(!ledger.contains(unit));
        assert_eq!(ledger.active_targets(), 0);
    }

    #[test]
    fn test_remove_below_zero_is_noop() {
        let mut ledger = TargetLockLedger::new();
        ledger.remove_lock(UnitRef::Leader);
        assert_eq!(ledger.lock_count(UnitRef::Leader), 0);
        assert!(!ledger.contains(UnitRef::Leader));

        ledger.add_lock(UnitRef::Leader);
        ledger.remove_lock(UnitRef::Leader);
        ledger.remove_lock(UnitRef::Leader);
        assert_eq!(ledger.lock_count(UnitRef::Leader), 0);

        // A later add starts again from one
        ledger.add_lock(UnitRef::Leader);
        assert_eq!(ledger.lock_count(UnitRef::Leader), 1);
    }

    #[test]
    fn test_ids_are_independent() {
        let mut ledger = TargetLockLedger::new();
        let a = UnitRef::Agent(AgentHandle(1));
        let b = UnitRef::Agent(AgentHandle(2));

        ledger.add_lock(a);
        ledger.add_lock(a);
        ledger.add_lock(b);
        ledger.add_lock(UnitRef::Leader);
        assert_eq!(ledger.active_targets(), 3);

        ledger.remove_lock(b);
        assert_eq!(ledger.lock_count(a), 2);
        assert_eq!(ledger.lock_count(b), 0);
        assert_eq!(ledger.active_targets(), 2);

        ledger.clear();
        assert_eq!(ledger.active_targets(), 0);
    }
}
