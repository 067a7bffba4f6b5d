use std::fmt::Display;
use std::str::FromStr;

use crate::crowd::constants::{
    flocking, heading, lane, neighbor_density_estimate, population, spatial,
};

/// Default RNG seed for spawn jitter and mystery gates
pub const DEFAULT_SEED: u64 = 0x5EED_C10E;

/// Configuration rejected at session start
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_total must be at least 1")]
    NoRoom,
    #[error("spawn_batch must be at least 1")]
    ZeroSpawnBatch,
    #[error("logic_hz must be finite and > 0, got {0}")]
    InvalidLogicRate(f32),
    #[error("{name} must be finite and > 0, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("damping must be in (0, 1], got {0}")]
    InvalidDamping(f32),
    #[error("{name} must be finite and >= 0, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("cell_size {cell_size} is smaller than separation_radius {separation_radius}")]
    CellTooSmall { cell_size: f32, separation_radius: f32 },
    #[error("neighbor buffer of {buffer} is below the density estimate of {required}")]
    NeighborBufferTooSmall { buffer: usize, required: usize },
}

/// Crowd simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CrowdConfig {
    /// Population ceiling, leader included
    pub max_total: u32,
    /// Agents spawned per frame while spawns are pending
    pub spawn_batch: u32,
    /// Render handles minted at session start
    pub pool_prewarm: usize,
    /// Agent capacity reserved at session start (store and grid)
    pub initial_capacity: usize,
    /// Fixed logic rate of the flocking solver
    pub logic_hz: f32,
    pub separation_radius: f32,
    pub separation_weight: f32,
    pub cohesion_weight: f32,
    pub max_speed: f32,
    /// Velocity multiplier applied every logic step
    pub damping: f32,
    pub road_half_width: f32,
    /// Spatial grid cell size, must cover the separation radius
    pub cell_size: f32,
    /// Length of the neighbor scratch buffer
    pub neighbor_buffer_len: usize,
    /// Yaw of the agent model when running straight, in degrees
    pub model_yaw: f32,
    pub seed: u64,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            max_total: population::MAX_TOTAL,
            spawn_batch: population::SPAWN_BATCH,
            pool_prewarm: population::POOL_PREWARM,
            initial_capacity: spatial::INITIAL_CAPACITY,
            logic_hz: flocking::LOGIC_HZ,
            separation_radius: flocking::SEPARATION_RADIUS,
            separation_weight: flocking::SEPARATION_WEIGHT,
            cohesion_weight: flocking::COHESION_WEIGHT,
            max_speed: flocking::MAX_SPEED,
            damping: flocking::DAMPING,
            road_half_width: lane::ROAD_HALF_WIDTH,
            cell_size: spatial::CELL_SIZE,
            neighbor_buffer_len: spatial::NEIGHBOR_BUFFER_LEN,
            model_yaw: heading::MODEL_YAW,
            seed: DEFAULT_SEED,
        }
    }
}

/// Parse `name` from `lookup`, warning and returning None on invalid values
fn parse_var<T, F>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    accept: F,
    requirement: &str,
) -> Option<T>
where
    T: FromStr + Display,
    F: Fn(&T) -> bool,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(parsed) if accept(&parsed) => Some(parsed),
        Ok(parsed) => {
            tracing::warn!("{} must be {}, got {}, using default", name, requirement, parsed);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

fn positive(v: &f32) -> bool {
    v.is_finite() && *v > 0.0
}

fn non_negative(v: &f32) -> bool {
    v.is_finite() && *v >= 0.0
}

impl CrowdConfig {
    /// Load config from `CROWD_*` environment variables or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(|name| std::env::var(name).ok())
    }

    /// Load config from an arbitrary variable source
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "CROWD_MAX_TOTAL", |v: &u32| *v >= 1, ">= 1") {
            config.max_total = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_SPAWN_BATCH", |v: &u32| *v >= 1, ">= 1") {
            config.spawn_batch = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_POOL_PREWARM", |v: &usize| *v <= 100_000, "0-100000") {
            config.pool_prewarm = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_LOGIC_HZ", positive, "> 0") {
            config.logic_hz = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_SEPARATION_RADIUS", positive, "> 0") {
            config.separation_radius = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_SEPARATION_WEIGHT", non_negative, ">= 0") {
            config.separation_weight = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_COHESION_WEIGHT", non_negative, ">= 0") {
            config.cohesion_weight = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_MAX_SPEED", positive, "> 0") {
            config.max_speed = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_DAMPING", |v: &f32| *v > 0.0 && *v <= 1.0, "in (0, 1]") {
            config.damping = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_ROAD_HALF_WIDTH", positive, "> 0") {
            config.road_half_width = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_CELL_SIZE", positive, "> 0") {
            config.cell_size = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_NEIGHBOR_BUFFER", |v: &usize| *v >= 1, ">= 1") {
            config.neighbor_buffer_len = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_MODEL_YAW", |v: &f32| v.is_finite(), "finite") {
            config.model_yaw = v;
        }
        if let Some(v) = parse_var(&lookup, "CROWD_SEED", |_: &u64| true, "a u64") {
            config.seed = v;
        }

        config
    }

    /// Seconds between flocking steps
    #[inline]
    pub fn logic_interval(&self) -> f32 {
        1.0 / self.logic_hz
    }

    /// Validate configuration before a session starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_total == 0 {
            return Err(ConfigError::NoRoom);
        }
        if self.spawn_batch == 0 {
            return Err(ConfigError::ZeroSpawnBatch);
        }
        if !positive(&self.logic_hz) {
            return Err(ConfigError::InvalidLogicRate(self.logic_hz));
        }
        for (name, value) in [
            ("separation_radius", self.separation_radius),
            ("max_speed", self.max_speed),
            ("road_half_width", self.road_half_width),
            ("cell_size", self.cell_size),
        ] {
            if !positive(&value) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        for (name, value) in [
            ("separation_weight", self.separation_weight),
            ("cohesion_weight", self.cohesion_weight),
        ] {
            if !non_negative(&value) {
                return Err(ConfigError::Negative { name, value });
            }
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::InvalidDamping(self.damping));
        }
        if self.cell_size < self.separation_radius {
            return Err(ConfigError::CellTooSmall {
                cell_size: self.cell_size,
                separation_radius: self.separation_radius,
            });
        }
        let required = neighbor_density_estimate(self.cell_size, self.separation_radius);
        if self.neighbor_buffer_len < required {
            return Err(ConfigError::NeighborBufferTooSmall {
                buffer: self.neighbor_buffer_len,
                required,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CrowdConfig::default();
        assert_eq!(config.max_total, 5000);
        assert_eq!(config.spawn_batch, 8);
        assert_eq!(config.pool_prewarm, 300);
        assert!((config.logic_interval() - 0.05).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_overrides() {
        let config = CrowdConfig::load_from(lookup(&[
            ("CROWD_MAX_TOTAL", "200"),
            ("CROWD_LOGIC_HZ", "30"),
            ("CROWD_SEED", "42"),
            ("CROWD_MODEL_YAW", "180"),
        ]));
        assert_eq!(config.max_total, 200);
        assert_eq!(config.logic_hz, 30.0);
        assert_eq!(config.seed, 42);
        assert_eq!(config.model_yaw, 180.0);
        assert_eq!(config.spawn_batch, 8);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = CrowdConfig::load_from(lookup(&[
            ("CROWD_MAX_TOTAL", "zero"),
            ("CROWD_SPAWN_BATCH", "0"),
            ("CROWD_DAMPING", "1.5"),
            ("CROWD_LOGIC_HZ", "NaN"),
        ]));
        assert_eq!(config, CrowdConfig::default());
    }

    #[test]
    fn test_load_or_default() {
        let config = CrowdConfig::load_or_default();
        assert!(config.max_total > 0);
    }

    #[test]
    fn test_validate_rejects_small_cells() {
        let config = CrowdConfig {
            cell_size: 0.5,
            ..CrowdConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::CellTooSmall { .. })));
    }

    #[test]
    fn test_validate_rejects_small_neighbor_buffer() {
        let config = CrowdConfig {
            neighbor_buffer_len: 16,
            ..CrowdConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NeighborBufferTooSmall {
                buffer: 16,
                required: 81
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let config = CrowdConfig {
            logic_hz: 0.0,
            ..CrowdConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CrowdConfig {
            damping: 0.0,
            ..CrowdConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidDamping(0.0)));

        let config = CrowdConfig {
            cohesion_weight: -1.0,
            ..CrowdConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));
    }
}
