//! # Lumina Scheduler
//!
//! Recurring-schedule evaluator. Each client ticks independently against
//! the shared schedule list and fires a sync through the distributor when
//! a window opens — at most once per schedule per calendar day, durable
//! across restarts via the fired-marker store.

pub mod evaluator;
pub mod markers;

pub use evaluator::{ScheduleEvaluator, spawn_evaluator};
pub use markers::FiredMarkers;
