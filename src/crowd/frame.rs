use serde::{Deserialize, Serialize};

use crate::crowd::pool::AgentHandle;
use crate::crowd::store::AgentStore;
use crate::util::vec2::Vec2;

/// Final world-space pose of one agent for the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub handle: AgentHandle,
    pub position: Vec2,
    /// Smoothed heading in degrees
    pub yaw: f32,
}

/// Everything the rendering layer needs after a tick
///
/// Rebuilt in place every frame; the pose buffer is reused so a steady population
/// never reallocates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationFrame {
    pub tick: u64,
    pub leader: Vec2,
    /// Units alive, leader included
    pub total: u32,
    pub poses: Vec<AgentPose>,
}

impl PresentationFrame {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            poses: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Refresh from the store's live prefix
    pub fn refresh(&mut self, tick: u64, leader: Vec2, total: u32, store: &AgentStore) {
        self.tick = tick;
        self.leader = leader;
        self.total = total;
        self.poses.clear();
        self.poses.extend(store.handles().iter().enumerate().map(|(i, &handle)| AgentPose {
            handle,
            position: leader + store.position(i),
            yaw: store.yaw(i),
        }));
    }

    /// Pose of a given agent, if it is in this frame
    pub fn pose(&self, handle: AgentHandle) -> Option<&AgentPose> {
        self.poses.iter().find(|pose| pose.handle == handle)
    }

    /// Encode using bincode legacy config (fixed-size integers)
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        bincode::serde::encode_to_vec(self, bincode::config::legacy())
            .map_err(|e| EncodeError(e.to_string()))
    }

    /// Encode into a reused buffer; returns the number of bytes appended
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        bincode::serde::encode_into_std_write(self, buf, bincode::config::legacy())
            .map_err(|e| EncodeError(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        bincode::serde::decode_from_slice(data, bincode::config::legacy())
            .map(|(frame, _)| frame)
            .map_err(|e| DecodeError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
