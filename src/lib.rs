//! Crowd Runner Core
//!
//! Simulation core of a runner-style crowd game: a swarm of agents that follows
//! a leader, grows and shrinks through arithmetic gates, steers around fences
//! and is thinned out by enemies. The host drives it with `CrowdSession::tick`.
//!
//! # Features
//!
//! - `metrics_extended` - Count neighbor query candidates and saturated queries (enabled by default)
//! - `minimal` - Build without optional features for testing/debugging

pub mod config;
pub mod util;
pub mod crowd;
pub mod metrics;
