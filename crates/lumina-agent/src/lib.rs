//! # Lumina Agent
//!
//! The per-client execution side of the engine: subscribes to the
//! group's broadcast, recomputes this member's own delay locally, and
//! fires a single timed call at the member's WLED controller. Failures
//! are isolated to this device; there is no retry and no reporting back.

pub mod controller;
pub mod executor;

pub use controller::{WledController, WledSegment, WledState};
pub use executor::{AgentStats, ExecutionAgent, run};
