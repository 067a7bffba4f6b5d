//! Render-handle pool
//!
//! Every live agent is bound to a handle naming a render-side node. Handles are
//! recycled through a free list so the presentation layer can keep its nodes
//! around instead of instantiating one per spawn.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Stable identity of a pooled render node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentHandle(pub u32);

impl AgentHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Free-list pool of render handles
#[derive(Debug, Clone, Default)]
pub struct HandlePool {
    /// Released handles, reused LIFO
    free: Vec<AgentHandle>,
    /// One bit per minted handle: set while bound to an agent
    in_use: BitVec,
}

impl HandlePool {
    /// Create a pool with `prewarm` handles minted and ready
    pub fn with_prewarm(prewarm: usize) -> Self {
        let mut pool = Self {
            free: Vec::with_capacity(prewarm),
            in_use: BitVec::with_capacity(prewarm),
        };
        pool.prewarm(prewarm);
        pool
    }

    /// Mint handles until at least `count` are available
    pub fn prewarm(&mut self, count: usize) {
        while self.free.len() < count {
            let handle = self.mint();
            self.free.push(handle);
        }
    }

    fn mint(&mut self) -> AgentHandle {
        let handle = AgentHandle(self.in_use.len() as u32);
        self.in_use.push(false);
        handle
    }

    /// Take a handle from the free list, minting a new one when it is empty
    pub fn acquire(&mut self) -> AgentHandle {
        let handle = match self.free.pop() {
            Some(handle) => handle,
            None => self.mint(),
        };
        self.in_use.set(handle.index(), true);
        handle
    }

    /// Return a handle to the pool
    /// Returns false if it was not in use (double release or foreign handle)
    pub fn release(&mut self, handle: AgentHandle) -> bool {
        match self.in_use.get(handle.index()).map(|bit| *bit) {
            Some(true) => {
                self.in_use.set(handle.index(), false);
                self.free.push(handle);
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_in_use(&self, handle: AgentHandle) -> bool {
        self.in_use.get(handle.index()).map(|bit| *bit).unwrap_or(false)
    }

    /// Total handles ever minted
    #[inline]
    pub fn minted(&self) -> usize {
        self.in_use.len()
    }

    #[inline]
    pub fn in_use_count(&self) -> usize {
        self.in_use.count_ones()
    }
}
