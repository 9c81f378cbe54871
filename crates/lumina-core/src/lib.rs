//! # Lumina Core
//!
//! Shared data model, configuration, errors, and interface traits for
//! the neighborhood synchronization engine. No I/O lives here beyond
//! config file loading — the store, controller, sunset, and notification
//! collaborators are trait seams implemented by the other crates (or by
//! the surrounding application).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{ControllerConfig, LocationConfig, LuminaConfig, SchedulerConfig};
pub use error::{LuminaError, Result};
pub use traits::{GroupStore, LightController, LogNotifier, Notifier, RecordStream, SunsetProvider};
pub use types::{
    Color, GroupRecord, NeighborhoodGroup, NeighborhoodMember, ParticipationStatus,
    RooflineDirection, SyncCommand, SyncRequest, SyncSchedule, SyncTimingConfig, SyncType,
};
