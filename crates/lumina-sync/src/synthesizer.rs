//! Command synthesizer — the single entry point that turns a sync
//! request into an immutable `SyncCommand` plus the updated group state.
//!
//! Pure over its inputs (`now` is injected); the broadcast distributor
//! owns the store write.

use chrono::{DateTime, Utc};

use lumina_core::error::{LuminaError, Result};
use lumina_core::types::{NeighborhoodGroup, NeighborhoodMember, SyncCommand, SyncRequest};

use crate::participation;

/// Synthesize a command: validate the request, filter members through
/// participation state, stamp `origin_timestamp = now`, and flip the
/// group active. On `NoEligibleMembers` the group is left unchanged.
pub fn synthesize(
    group: &NeighborhoodGroup,
    members: &[NeighborhoodMember],
    request: SyncRequest,
    opt_out: Option<&[String]>,
    now: DateTime<Utc>,
) -> Result<(SyncCommand, NeighborhoodGroup)> {
    request.validate()?;

    let eligible = participation::filter_eligible(members, opt_out);
    if eligible.is_empty() {
        return Err(LuminaError::NoEligibleMembers);
    }

    let excluded = opt_out.map(<[String]>::to_vec).unwrap_or_default();
    let command = SyncCommand::new(&group.id, request, excluded, now)?;

    let mut updated = group.clone();
    updated.is_active = true;
    updated.active_pattern_name = Some(command.request.pattern_name.clone());

    tracing::info!(
        "🌊 Synthesized '{}' for group '{}' ({} eligible members, origin {})",
        command.request.pattern_name,
        group.display_name,
        eligible.len(),
        command.origin_timestamp
    );

    Ok((command, updated))
}

/// Stop the running sync: clears the active flags. The distributor pairs
/// this with clearing the published command so pending agent timers
/// cancel.
pub fn stop(group: &NeighborhoodGroup) -> NeighborhoodGroup {
    let mut updated = group.clone();
    updated.is_active = false;
    updated.active_pattern_name = None;
    tracing::info!("🛑 Sync stopped for group '{}'", group.display_name);
    updated
}
