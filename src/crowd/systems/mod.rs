//! Crowd systems
//!
//! `flocking` runs at the fixed logic rate and writes velocities; `integration`
//! runs every frame and writes positions and headings.

pub mod flocking;
pub mod integration;

pub use flocking::{FlockingParams, FlockingSolver, StepStats};
pub use integration::{integrate, IntegrationParams};
