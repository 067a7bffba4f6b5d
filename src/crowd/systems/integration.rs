use crate::config::CrowdConfig;
use crate::crowd::constants::heading::{LATERAL_GAIN, MAX_TURN, SMOOTHING_RATE};
use crate::crowd::constants::lane::FENCE_CLEARANCE;
use crate::crowd::oracle::ObstacleOracle;
use crate::crowd::store::AgentStore;
use crate::util::vec2::Vec2;

/// Per-frame integration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationParams {
    pub road_half_width: f32,
    /// Yaw of the agent model when running straight, in degrees
    pub model_yaw: f32,
}

impl IntegrationParams {
    pub fn from_config(config: &CrowdConfig) -> Self {
        Self {
            road_half_width: config.road_half_width,
            model_yaw: config.model_yaw,
        }
    }
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self::from_config(&CrowdConfig::default())
    }
}

/// Clamp that never panics; the upper bound wins when `min > max`
#[inline]
fn clamp_lenient(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Wrap an angle delta into [-180, 180]
#[inline]
pub fn wrap_degrees(delta: f32) -> f32 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Target heading for a lateral velocity
#[inline]
pub fn target_yaw(model_yaw: f32, lateral_velocity: f32) -> f32 {
    model_yaw + (-lateral_velocity * LATERAL_GAIN).clamp(-MAX_TURN, MAX_TURN)
}

/// Local X range an agent may occupy this frame
///
/// `previous_world_x` picks the side of a fence so agents cannot tunnel through it.
pub fn lane_bounds(
    leader_x: f32,
    road_half_width: f32,
    forbidden_half_width: f32,
    previous_world_x: f32,
) -> (f32, f32) {
    if forbidden_half_width > 0.0 {
        let limit = forbidden_half_width + FENCE_CLEARANCE;
        if previous_world_x < 0.0 {
            (-road_half_width - leader_x, -limit - leader_x)
        } else {
            (limit - leader_x, road_half_width - leader_x)
        }
    } else {
        (-road_half_width - leader_x, road_half_width - leader_x)
    }
}

/// Advance every agent by one render frame
///
/// Explicit Euler step, lane clamp against the oracle at the agent's new world Z,
/// then yaw smoothing. Returns how many agents were pushed back by a clamp.
pub fn integrate<O>(
    store: &mut AgentStore,
    leader: Vec2,
    oracle: &O,
    params: &IntegrationParams,
    dt: f32,
) -> usize
where
    O: ObstacleOracle + ?Sized,
{
    let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
    let blend = (dt * SMOOTHING_RATE).min(1.0);
    let mut clamped = 0;

    let lanes = store.lanes_mut();
    for i in 0..lanes.pos_x.len() {
        let vx = lanes.vel_x[i];
        let previous_x = lanes.pos_x[i];
        let next_x = previous_x + vx * dt;
        let next_z = lanes.pos_z[i] + lanes.vel_z[i] * dt;

        let wall = oracle.forbidden_half_width(leader.z + next_z);
        let (min_x, max_x) = lane_bounds(
            leader.x,
            params.road_half_width,
            wall,
            leader.x + previous_x,
        );
        let x = clamp_lenient(next_x, min_x, max_x);
        if x != next_x {
            clamped += 1;
        }

        lanes.pos_x[i] = x;
        lanes.pos_z[i] = next_z;

        let yaw = lanes.yaw[i];
        let delta = wrap_degrees(target_yaw(params.model_yaw, vx) - yaw);
        lanes.yaw[i] = yaw + delta * blend;
    }

    clamped
}
