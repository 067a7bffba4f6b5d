//! Obstacle oracle boundary
//!
//! The track generator owns fences; the crowd only asks, per agent and per frame,
//! how wide the forbidden strip around the road centre is at a given world Z.

use crate::crowd::constants::lane::FENCE_PADDING;

/// Source of forbidden half-widths along the track
pub trait ObstacleOracle {
    /// Half width of the blocked strip centred on X = 0 at `world_z`
    /// 0 means the road is unobstructed there
    fn forbidden_half_width(&self, world_z: f32) -> f32;
}

/// Track without obstacles
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRoad;

impl ObstacleOracle for OpenRoad {
    #[inline]
    fn forbidden_half_width(&self, _world_z: f32) -> f32 {
        0.0
    }
}

impl<F> ObstacleOracle for F
where
    F: Fn(f32) -> f32,
{
    #[inline]
    fn forbidden_half_width(&self, world_z: f32) -> f32 {
        (self)(world_z).max(0.0)
    }
}

/// A centre fence spanning a Z range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FenceSpan {
    pub min_z: f32,
    pub max_z: f32,
    /// Unscaled fence half width
    pub half_width: f32,
    /// Lateral scale of the fence model
    pub scale_x: f32,
    pub active: bool,
}

impl FenceSpan {
    pub fn new(min_z: f32, max_z: f32, half_width: f32) -> Self {
        Self {
            min_z: min_z.min(max_z),
            max_z: min_z.max(max_z),
            half_width,
            scale_x: 1.0,
            active: true,
        }
    }

    #[inline]
    pub fn contains(&self, z: f32) -> bool {
        self.active && z >= self.min_z && z <= self.max_z
    }

    /// Forbidden half width including the collision padding
    #[inline]
    pub fn forbidden_width(&self) -> f32 {
        self.half_width * self.scale_x + FENCE_PADDING
    }
}

/// Fences placed along the track; the first span containing Z wins
#[derive(Debug, Clone, Default)]
pub struct FenceTrack {
    spans: Vec<FenceSpan>,
}

impl FenceTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spans(spans: impl IntoIterator<Item = FenceSpan>) -> Self {
        Self {
            spans: spans.into_iter().collect(),
        }
    }

    pub fn push(&mut self, span: FenceSpan) {
        self.spans.push(span);
    }

    /// Deactivate every fence overlapping [min_z, max_z] (track recycling)
    pub fn clear_range(&mut self, min_z: f32, max_z: f32) -> usize {
        let (start, end) = (min_z.min(max_z), min_z.max(max_z));
        let mut cleared = 0;
        for span in self.spans.iter_mut().filter(|s| s.active) {
            if span.max_z >= start && span.min_z <= end {
                span.active = false;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn spans(&self) -> &[FenceSpan] {
        &self.spans
    }
}

impl ObstacleOracle for FenceTrack {
    fn forbidden_half_width(&self, world_z: f32) -> f32 {
        self.spans
            .iter()
            .find(|span| span.contains(world_z))
            .map(FenceSpan::forbidden_width)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_road() {
        assert_eq!(OpenRoad.forbidden_half_width(-123.0), 0.0);
    }

    #[test]
    fn test_closure_oracle_never_negative() {
        let oracle = |z: f32| -> f32 { if z < 0.0 { -1.0 } else { 2.0 } };
        assert_eq!(oracle.forbidden_half_width(-5.0), 0.0);
        assert_eq!(oracle.forbidden_half_width(5.0), 2.0);
    }

    #[test]
    fn test_fence_track_lookup() {
        let track = FenceTrack::with_spans([FenceSpan::new(-20.0, -10.0, 0.5)]);
        assert!((track.forbidden_half_width(-15.0) - 0.7).abs() < 1e-6);
        assert_eq!(track.forbidden_half_width(-25.0), 0.0);
        assert_eq!(track.forbidden_half_width(0.0), 0.0);
    }

    #[test]
    fn test_fence_span_normalises_range() {
        let span = FenceSpan::new(-10.0, -20.0, 1.0);
        assert!(span.contains(-15.0));
        assert_eq!(span.min_z, -20.0);
    }

    #[test]
    fn test_scaled_fence() {
        let mut span = FenceSpan::new(0.0, 10.0, 1.0);
        span.scale_x = 2.0;
        let track = FenceTrack::with_spans([span]);
        assert!((track.forbidden_half_width(5.0) - 2.2).abs() < 1e-6);
    }

    #[test]
    fn test_clear_range() {
        let mut track = FenceTrack::new();
        track.push(FenceSpan::new(-30.0, -20.0, 1.0));
        track.push(FenceSpan::new(-60.0, -50.0, 1.0));

        assert_eq!(track.clear_range(-10.0, -25.0), 1);
        assert_eq!(track.forbidden_half_width(-22.0), 0.0);
        assert!(track.forbidden_half_width(-55.0) > 0.0);
        assert_eq!(track.spans().len(), 2);
    }
}
