//! # Lumina Sync
//!
//! The pure heart of the engine: the timing model that maps street
//! position to trigger delay, the participation rules that decide who is
//! in a sync, and the synthesizer that composes both into an immutable
//! `SyncCommand`. No I/O — everything here is unit-testable with nothing
//! mocked but the injected timestamp.

pub mod participation;
pub mod synthesizer;
pub mod timing;

pub use participation::{filter_eligible, is_eligible};
pub use synthesizer::{stop, synthesize};
pub use timing::{MemberSlot, compute_offsets, offsets_for_command};
