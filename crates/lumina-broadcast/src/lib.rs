//! # Lumina Broadcast
//!
//! Publishes the group's record (membership, live status, the running
//! `SyncCommand`) to a shared subscribable store and fans updates out to
//! every member's client. Delivery is at-least-once and fire-and-forget:
//! ordering across commands is last-write-wins by `origin_timestamp`,
//! and no execution acknowledgements flow back.

pub mod distributor;
pub mod store;

pub use distributor::Distributor;
pub use store::MemoryGroupStore;
