//! Lumina error taxonomy.
//!
//! Synthesis-time errors (`NoEligibleMembers`, `InvalidCommand`) surface to
//! the initiating flow. Execution-time errors (`ControllerUnreachable`,
//! `StaleCommand`) stay on the member's own device — they are logged there
//! and never travel back through the distributor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LuminaError {
    /// Every member of the group is paused or opted out of this trigger.
    #[error("no eligible members in group")]
    NoEligibleMembers,

    /// The sync request failed validation (empty colors, unknown effect id).
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The member's local controller did not accept the HTTP call.
    #[error("controller unreachable: {0}")]
    ControllerUnreachable(String),

    /// An out-of-order command was delivered and discarded.
    #[error("stale command ignored: {0}")]
    StaleCommand(String),

    /// Shared document store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration read/parse failure.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LuminaError>;
