use tracing::warn;

use crate::config::CrowdConfig;
use crate::crowd::constants::flocking::{BOUNDARY_FORCE, MIN_DISTANCE_SQ};
use crate::crowd::spatial::SpatialHashGrid;
use crate::crowd::store::AgentStore;

/// Force weights for one logic step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockingParams {
    pub separation_radius: f32,
    pub separation_weight: f32,
    pub cohesion_weight: f32,
    pub damping: f32,
    pub boundary_half_width: f32,
    pub boundary_force: f32,
    pub max_speed: f32,
}

impl FlockingParams {
    pub fn from_config(config: &CrowdConfig) -> Self {
        Self {
            separation_radius: config.separation_radius,
            separation_weight: config.separation_weight,
            cohesion_weight: config.cohesion_weight,
            damping: config.damping,
            boundary_half_width: config.road_half_width,
            boundary_force: BOUNDARY_FORCE,
            max_speed: config.max_speed,
        }
    }
}

impl Default for FlockingParams {
    fn default() -> Self {
        Self::from_config(&CrowdConfig::default())
    }
}

/// Counters from one logic step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub agents: usize,
    /// Candidates returned by all neighbor queries
    pub candidates: u64,
    /// Queries that filled the scratch buffer
    pub saturated_queries: u64,
}

/// Fixed-rate flocking solver
///
/// Owns the spatial grid and the shared neighbor scratch buffer. Frame time is
/// accumulated and one step of exactly `interval` runs when the accumulator
/// reaches it; the accumulator then resets to zero, so a long frame never
/// triggers catch-up steps.
#[derive(Debug, Clone)]
pub struct FlockingSolver {
    params: FlockingParams,
    interval: f32,
    accumulator: f32,
    grid: SpatialHashGrid,
    /// Scratch buffer reused by every neighbor query of a step
    neighbors: Vec<u32>,
    saturation_warned: bool,
}

impl FlockingSolver {
    pub fn new(config: &CrowdConfig) -> Self {
        Self {
            params: FlockingParams::from_config(config),
            interval: config.logic_interval(),
            accumulator: 0.0,
            grid: SpatialHashGrid::new(config.cell_size, config.initial_capacity),
            neighbors: vec![0; config.neighbor_buffer_len],
            saturation_warned: false,
        }
    }

    #[inline]
    pub fn params(&self) -> &FlockingParams {
        &self.params
    }

    #[inline]
    pub fn interval(&self) -> f32 {
        self.interval
    }

    #[inline]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    #[inline]
    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.grid.clear();
    }

    /// Accumulate frame time and run at most one fixed step
    /// Returns the step's stats when a step ran
    pub fn advance(&mut self, dt: f32, store: &mut AgentStore) -> Option<StepStats> {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }
        if self.accumulator < self.interval {
            return None;
        }
        let stats = self.step(store, self.interval);
        self.accumulator = 0.0;
        Some(stats)
    }

    /// Rebuild the grid and update every agent's velocity
    ///
    /// Positions are read-only here; each agent only writes its own velocity, so
    /// all agents see the same positional snapshot.
    pub fn step(&mut self, store: &mut AgentStore, dt: f32) -> StepStats {
        let count = store.len();
        let mut stats = StepStats {
            agents: count,
            ..StepStats::default()
        };
        if count == 0 {
            return stats;
        }

        self.grid.rebuild(store.pos_x(), store.pos_z());

        let FlockingParams {
            separation_radius: radius,
            separation_weight,
            cohesion_weight,
            damping,
            boundary_half_width: half_width,
            boundary_force,
            max_speed,
        } = self.params;
        let radius_sq = radius * radius;
        let max_speed_sq = max_speed * max_speed;
        // Push applied to coincident pairs: linear falloff at the floor distance
        let coincident_push = radius - MIN_DISTANCE_SQ.sqrt();

        let lanes = store.lanes_mut();
        let (pos_x, pos_z) = (&*lanes.pos_x, &*lanes.pos_z);

        for i in 0..count {
            let px = pos_x[i];
            let pz = pos_z[i];
            let mut vx = lanes.vel_x[i];
            let mut vz = lanes.vel_z[i];

            // Cohesion towards the leader's local origin
            vx += -px * cohesion_weight * dt;
            vz += -pz * cohesion_weight * dt;

            // Separation
            let found = self.grid.query_neighbors(px, pz, &mut self.neighbors);
            stats.candidates += found as u64;
            if found == self.neighbors.len() {
                stats.saturated_queries += 1;
            }

            let mut sep_x = 0.0;
            let mut sep_z = 0.0;
            for &j in &self.neighbors[..found] {
                let j = j as usize;
                if j == i {
                    continue;
                }
                let dx = px - pos_x[j];
                let dz = pz - pos_z[j];
                let dist_sq = dx * dx + dz * dz;
                if dist_sq >= radius_sq {
                    continue;
                }
                if dist_sq > MIN_DISTANCE_SQ {
                    let dist = dist_sq.sqrt();
                    let strength = (radius - dist) / dist;
                    sep_x += dx * strength;
                    sep_z += dz * strength;
                } else if i < j {
                    sep_x -= coincident_push;
                } else {
                    sep_x += coincident_push;
                }
            }
            vx += sep_x * separation_weight * dt;
            vz += sep_z * separation_weight * dt;

            // Boundary
            if px > half_width {
                vx -= (px - half_width) * boundary_force * dt;
            } else if px < -half_width {
                vx -= (px + half_width) * boundary_force * dt;
            }

            vx *= damping;
            vz *= damping;

            let speed_sq = vx * vx + vz * vz;
            if speed_sq > max_speed_sq {
                let scale = max_speed / speed_sq.sqrt();
                vx *= scale;
                vz *= scale;
            }

            lanes.vel_x[i] = vx;
            lanes.vel_z[i] = vz;
        }

        if stats.saturated_queries > 0 && !self.saturation_warned {
            self.saturation_warned = true;
            warn!(
                buffer = self.neighbors.len(),
                saturated = stats.saturated_queries,
                agents = count,
                "Neighbor buffer saturated; separation is truncated in dense cells"
            );
        }

        stats
    }
}
