/// Spatial hash constants
pub mod spatial {
    /// Bucket count of the hash table (prime to reduce clustering)
    /// Fixed: does not grow with the population, only the per-agent chain array does
    pub const TABLE_SIZE: usize = 10_007;
    /// Multiplier for the X cell coordinate
    pub const HASH_PRIME_X: i32 = 73_856_093;
    /// Multiplier for the Z cell coordinate
    pub const HASH_PRIME_Z: i32 = 19_349_663;
    /// Grid cell size in world units
    /// Must be >= the separation radius so a 3x3 scan covers every interaction
    /// ENV: CROWD_CELL_SIZE
    pub const CELL_SIZE: f32 = 1.0;
    /// Initial length of the per-agent chain array
    pub const INITIAL_CAPACITY: usize = 500;
    /// Length of the shared neighbor scratch buffer
    /// ENV: CROWD_NEIGHBOR_BUFFER
    pub const NEIGHBOR_BUFFER_LEN: usize = 200;
}

/// Flocking force constants
pub mod flocking {
    /// Logic rate in Hz (forces are recomputed at this fixed rate)
    /// ENV: CROWD_LOGIC_HZ
    pub const LOGIC_HZ: f32 = 20.0;
    /// Fixed logic step in seconds
    pub const LOGIC_INTERVAL: f32 = 1.0 / LOGIC_HZ;
    /// Neighbors closer than this push each other apart
    /// ENV: CROWD_SEPARATION_RADIUS
    pub const SEPARATION_RADIUS: f32 = 0.7;
    /// ENV: CROWD_SEPARATION_WEIGHT
    pub const SEPARATION_WEIGHT: f32 = 15.0;
    /// Pull towards the leader's local origin
    /// ENV: CROWD_COHESION_WEIGHT
    pub const COHESION_WEIGHT: f32 = 1.0;
    /// Velocity multiplier applied once per logic step
    /// ENV: CROWD_DAMPING
    pub const DAMPING: f32 = 0.90;
    /// Spring constant pushing agents back inside the road
    pub const BOUNDARY_FORCE: f32 = 15.0;
    /// ENV: CROWD_MAX_SPEED
    pub const MAX_SPEED: f32 = 10.0;
    /// Squared distances at or below this are treated as coincident
    pub const MIN_DISTANCE_SQ: f32 = 0.0001;
}

/// Road and fence constants
pub mod lane {
    /// Half width of the drivable road, in world units
    /// ENV: CROWD_ROAD_HALF_WIDTH
    pub const ROAD_HALF_WIDTH: f32 = 7.0;
    /// Extra gap kept between an agent and a fence
    pub const FENCE_CLEARANCE: f32 = 0.15;
    /// Padding added to a fence's scaled half width by the fence track
    pub const FENCE_PADDING: f32 = 0.2;
}

/// Presentation heading constants (degrees)
pub mod heading {
    /// Base model yaw for a unit facing down the track
    /// ENV: CROWD_MODEL_YAW
    pub const MODEL_YAW: f32 = 0.0;
    /// Degrees of lean per unit of lateral velocity
    pub const LATERAL_GAIN: f32 = 8.0;
    /// Maximum lean away from the base yaw
    pub const MAX_TURN: f32 = 15.0;
    /// Exponential smoothing rate (per second)
    pub const SMOOTHING_RATE: f32 = 10.0;
}

/// Population constants
pub mod population {
    /// Hard ceiling on the total population (agents + leader)
    /// ENV: CROWD_MAX_TOTAL
    pub const MAX_TOTAL: u32 = 5_000;
    /// Spawns materialised per frame
    /// ENV: CROWD_SPAWN_BATCH
    pub const SPAWN_BATCH: u32 = 8;
    /// Render handles minted up front
    /// ENV: CROWD_POOL_PREWARM
    pub const POOL_PREWARM: usize = 300;
    /// Smallest capacity the agent arrays grow to
    pub const MIN_STORE_CAPACITY: usize = 64;
}

/// Spawn formation constants
pub mod spawn {
    /// Agents are laid out in this many columns behind the tail
    pub const COLUMNS: usize = 6;
    pub const COLUMN_SPACING: f32 = 0.7;
    /// Column index that sits on the centre line
    pub const COLUMN_CENTER: f32 = 2.5;
    /// Lateral jitter range (+/-)
    pub const JITTER_X: f32 = 0.15;
    /// Spawned X is clamped into +/- this
    pub const MAX_ABS_X: f32 = 4.0;
    /// Local Z of the first row when the crowd is empty
    pub const FIRST_ROW_Z: f32 = 1.5;
    /// Distance behind the current tail
    pub const ROW_STEP: f32 = 0.5;
    /// Extra random depth (0..ROW_JITTER)
    pub const ROW_JITTER: f32 = 0.2;
}

/// Target query constants
pub mod targeting {
    /// Agents within this Z distance of the frontline count as the front row
    pub const FRONT_ROW_TOLERANCE: f32 = 0.5;
}

/// Upper estimate of neighbor candidates returned by one 3x3 query
///
/// Assumes separation keeps agents roughly half a radius apart, so each cell holds
/// at most `ceil(cell / (radius / 2))^2` agents.
pub fn neighbor_density_estimate(cell_size: f32, separation_radius: f32) -> usize {
    let min_spacing = (separation_radius * 0.5).max(f32::EPSILON);
    let per_axis = (cell_size / min_spacing).ceil().max(1.0) as usize;
    9 * per_axis * per_axis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logic_interval_matches_rate() {
        assert!((flocking::LOGIC_INTERVAL - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_default_buffer_covers_density_estimate() {
        let estimate = neighbor_density_estimate(spatial::CELL_SIZE, flocking::SEPARATION_RADIUS);
        // ceil(1.0 / 0.35) = 3 -> 9 * 9
        assert_eq!(estimate, 81);
        assert!(spatial::NEIGHBOR_BUFFER_LEN >= estimate);
    }

    #[test]
    fn test_cell_covers_separation_radius() {
        assert!(spatial::CELL_SIZE >= flocking::SEPARATION_RADIUS);
    }
}
