//! Spatial hash grid for flocking neighbor queries
//!
//! Fixed-size bucket table with array-based chaining:
//! `head[bucket]` holds the first agent index, `next[agent]` the following one.
//! The grid is rebuilt wholesale every logic tick, so it never goes stale, and
//! queries write into a caller-provided buffer so they never allocate.

use crate::crowd::constants::spatial::{
    CELL_SIZE, HASH_PRIME_X, HASH_PRIME_Z, INITIAL_CAPACITY, TABLE_SIZE,
};

/// End-of-chain marker
pub const NONE: u32 = u32::MAX;

/// Grid cell coordinate - (x, z) cell indices
pub type CellKey = (i32, i32);

/// Spatial hash grid over the ground plane
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    /// Cell size in world units
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    /// First agent in each bucket (fixed length TABLE_SIZE)
    head: Vec<u32>,
    /// Next agent in the same bucket, indexed by agent (grows, never shrinks)
    next: Vec<u32>,
    /// Pre-allocated neighbor offsets for the 3x3 query
    neighbor_offsets: [(i32, i32); 9],
}

impl SpatialHashGrid {
    /// Create a grid able to index `capacity` agents without resizing
    pub fn new(cell_size: f32, capacity: usize) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            head: vec![NONE; TABLE_SIZE],
            next: vec![NONE; capacity],
            neighbor_offsets: [
                (-1, -1), (0, -1), (1, -1),
                (-1,  0), (0,  0), (1,  0),
                (-1,  1), (0,  1), (1,  1),
            ],
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of agents the chain array can hold
    #[inline]
    pub fn capacity(&self) -> usize {
        self.next.len()
    }

    /// Grow the chain array; never shrinks
    pub fn resize(&mut self, capacity: usize) {
        if capacity > self.next.len() {
            self.next.resize(capacity, NONE);
        }
    }

    /// Empty every bucket. `next` is overwritten on insert and needs no reset.
    #[inline]
    pub fn clear(&mut self) {
        self.head.fill(NONE);
    }

    /// Convert world position to cell coordinates
    #[inline]
    pub fn position_to_cell(&self, x: f32, z: f32) -> CellKey {
        (
            (x * self.inv_cell_size).floor() as i32,
            (z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Bucket for a cell: multiplicative hash, XOR, modulo with negative correction
    #[inline]
    pub fn bucket(cell: CellKey) -> usize {
        let (cx, cz) = cell;
        let mixed = cx.wrapping_mul(HASH_PRIME_X) ^ cz.wrapping_mul(HASH_PRIME_Z);
        let mut h = mixed % TABLE_SIZE as i32;
        if h < 0 {
            h += TABLE_SIZE as i32;
        }
        h as usize
    }

    /// Prepend an agent to the chain of the cell containing (x, z)
    #[inline]
    pub fn insert(&mut self, index: u32, x: f32, z: f32) {
        let bucket = Self::bucket(self.position_to_cell(x, z));
        let Some(slot) = self.next.get_mut(index as usize) else {
            return;
        };
        *slot = self.head[bucket];
        self.head[bucket] = index;
    }

    /// Rebuild the grid from the live prefix of the position arrays
    pub fn rebuild(&mut self, pos_x: &[f32], pos_z: &[f32]) {
        let count = pos_x.len().min(pos_z.len());
        self.resize(count);
        self.clear();
        for (i, (&x, &z)) in pos_x.iter().zip(pos_z).enumerate() {
            self.insert(i as u32, x, z);
        }
    }

    /// Collect candidate neighbors from the 3x3 block of cells around (x, z)
    ///
    /// Writes agent indices into `out` and returns how many were written. Each
    /// bucket is walked once even when two scanned cells hash to it, so no index
    /// is repeated. The result may include the querying agent itself and far
    /// agents from colliding cells, so callers must distance-filter. Writing
    /// stops once `out` is full.
    pub fn query_neighbors(&self, x: f32, z: f32, out: &mut [u32]) -> usize {
        let (cx, cz) = self.position_to_cell(x, z);
        let mut visited = [usize::MAX; 9];
        let mut count = 0;

        for (n, &(dx, dz)) in self.neighbor_offsets.iter().enumerate() {
            let bucket = Self::bucket((cx.wrapping_add(dx), cz.wrapping_add(dz)));
            if visited[..n].contains(&bucket) {
                continue;
            }
            visited[n] = bucket;

            let mut idx = self.head[bucket];
            while idx != NONE {
                if count == out.len() {
                    return count;
                }
                out[count] = idx;
                count += 1;
                idx = self.next[idx as usize];
            }
        }
        count
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let mut occupied_buckets = 0;
        let mut indexed_agents = 0;
        let mut longest_chain = 0;

        for &first in &self.head {
            if first == NONE {
                continue;
            }
            occupied_buckets += 1;
            let mut len = 0;
            let mut idx = first;
            while idx != NONE {
                len += 1;
                idx = self.next[idx as usize];
            }
            indexed_agents += len;
            longest_chain = longest_chain.max(len);
        }

        SpatialGridStats {
            occupied_buckets,
            indexed_agents,
            longest_chain,
        }
    }
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(CELL_SIZE, INITIAL_CAPACITY)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialGridStats {
    pub occupied_buckets: usize,
    pub indexed_agents: usize,
    pub longest_chain: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(grid: &SpatialHashGrid, x: f32, z: f32) -> Vec<u32> {
        let mut buf = [0u32; 64];
        let n = grid.query_neighbors(x, z, &mut buf);
        buf[..n].to_vec()
    }

    #[test]
    fn test_new_grid_is_empty() {
        let grid = SpatialHashGrid::new(1.0, 16);
        assert_eq!(grid.capacity(), 16);
        assert!(query(&grid, 0.0, 0.0).is_empty());
        assert_eq!(grid.stats().indexed_agents, 0);
    }

    #[test]
    fn test_bucket_negative_cells_in_range() {
        for cell in [(-1, -1), (-5000, 3), (i32::MIN, i32::MAX), (0, 0), (123, -456)] {
            assert!(SpatialHashGrid::bucket(cell) < TABLE_SIZE);
        }
    }

    #[test]
    fn test_position_to_cell_floors() {
        let grid = SpatialHashGrid::new(1.0, 4);
        assert_eq!(grid.position_to_cell(0.5, 0.5), (0, 0));
        assert_eq!(grid.position_to_cell(-0.5, 1.2), (-1, 1));
        assert_eq!(grid.position_to_cell(-1.0, -2.0), (-1, -2));
    }

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialHashGrid::new(1.0, 4);
        grid.insert(2, 3.4, -7.1);

        assert_eq!(query(&grid, 3.4, -7.1), vec![2]);
        assert!(query(&grid, 30.0, 30.0).is_empty());
    }

    #[test]
    fn test_query_finds_neighbor_across_cell_boundary() {
        let mut grid = SpatialHashGrid::new(1.0, 4);
        // Cells (0, 0) and (-1, -1)
        grid.insert(0, 0.05, 0.05);
        grid.insert(1, -0.9, -0.9);

        assert!(query(&grid, 0.05, 0.05).contains(&1));
        assert!(query(&grid, -0.9, -0.9).contains(&0));
    }

    #[test]
    fn test_neighbor_query_completeness() {
        // Every pair within one cell width in both axes sees each other
        let mut grid = SpatialHashGrid::new(1.0, 2);
        let offsets = [-0.99_f32, -0.5, 0.0, 0.37, 0.99];
        let base = [(-3.7_f32, 12.2_f32), (0.0, 0.0), (5.5, -0.01)];

        for &(bx, bz) in &base {
            for &ox in &offsets {
                for &oz in &offsets {
                    grid.clear();
                    grid.insert(0, bx, bz);
                    grid.insert(1, bx + ox, bz + oz);
                    assert!(query(&grid, bx, bz).contains(&1), "missed ({ox}, {oz}) at ({bx}, {bz})");
                    assert!(query(&grid, bx + ox, bz + oz).contains(&0));
                }
            }
        }
    }

    #[test]
    fn test_shared_bucket_walked_once() {
        // Cells (-300, -202) and (-299, -201) both hash to bucket 6678
        assert_eq!(
            SpatialHashGrid::bucket((-300, -202)),
            SpatialHashGrid::bucket((-299, -201))
        );
        let mut grid = SpatialHashGrid::new(1.0, 4);
        grid.insert(0, -299.5, -201.5);
        grid.insert(1, -298.5, -200.5);

        let mut found = query(&grid, -299.5, -201.5);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_clear() {
        let mut grid = SpatialHashGrid::new(1.0, 4);
        grid.insert(0, 1.0, 1.0);
        grid.clear();
        assert!(query(&grid, 1.0, 1.0).is_empty());
    }

    #[test]
    fn test_insert_beyond_capacity_ignored() {
        let mut grid = SpatialHashGrid::new(1.0, 2);
        grid.insert(5, 0.0, 0.0);
        assert!(query(&grid, 0.0, 0.0).is_empty());

        grid.resize(8);
        grid.insert(5, 0.0, 0.0);
        assert_eq!(query(&grid, 0.0, 0.0), vec![5]);
    }

    #[test]
    fn test_resize_never_shrinks() {
        let mut grid = SpatialHashGrid::new(1.0, 32);
        grid.resize(8);
        assert_eq!(grid.capacity(), 32);
        grid.resize(64);
        assert_eq!(grid.capacity(), 64);
    }

    #[test]
    fn test_query_stops_when_buffer_full() {
        let mut grid = SpatialHashGrid::new(1.0, 16);
        for i in 0..10 {
            grid.insert(i, 0.5, 0.5);
        }
        let mut buf = [0u32; 4];
        assert_eq!(grid.query_neighbors(0.5, 0.5, &mut buf), 4);

        let mut big = [0u32; 32];
        assert_eq!(grid.query_neighbors(0.5, 0.5, &mut big), 10);
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut grid = SpatialHashGrid::new(1.0, 1);
        grid.insert(0, 50.0, 50.0);

        let xs = [0.0, 0.2, 10.0];
        let zs = [0.0, 0.1, 10.0];
        grid.rebuild(&xs, &zs);

        assert!(grid.capacity() >= 3);
        assert!(query(&grid, 50.0, 50.0).is_empty());
        let near = query(&grid, 0.0, 0.0);
        assert!(near.contains(&0) && near.contains(&1));
        assert!(!near.contains(&2));
    }

    #[test]
    fn test_stats() {
        let mut grid = SpatialHashGrid::new(1.0, 8);
        for i in 0..3 {
            grid.insert(i, 0.5, 0.5);
        }
        grid.insert(3, 40.5, 40.5);

        let stats = grid.stats();
        assert_eq!(stats.indexed_agents, 4);
        assert_eq!(stats.occupied_buckets, 2);
        assert_eq!(stats.longest_chain, 3);
    }
}
