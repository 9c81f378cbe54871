//! Timing model — per-member delay offsets for a sync.
//!
//! Pure and deterministic: given the eligible members and a timing
//! config, every client computes the same slots. Delays are relative to
//! the command's `origin_timestamp` and are never transmitted.

use lumina_core::types::{Color, NeighborhoodMember, SyncCommand, SyncTimingConfig, SyncType};

use crate::participation;

/// One member's place in a sync: when it fires, and (for ColorHarmony)
/// which palette color it renders.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSlot {
    pub member_id: String,
    pub delay_ms: u64,
    pub color: Option<Color>,
}

/// Compute delay slots for an already-filtered list of eligible members.
///
/// Members are traversed by `position_index` ascending (stable — ties
/// keep input order), reversed when `reverse_direction` is set.
pub fn compute_offsets(
    members: &[NeighborhoodMember],
    sync_type: SyncType,
    colors: &[Color],
    timing: &SyncTimingConfig,
) -> Vec<MemberSlot> {
    let mut ordered: Vec<&NeighborhoodMember> = members.iter().collect();
    ordered.sort_by_key(|m| m.position_index);
    if timing.reverse_direction {
        ordered.reverse();
    }

    match sync_type {
        SyncType::Simultaneous | SyncType::PatternMatch => ordered
            .iter()
            .map(|m| MemberSlot {
                member_id: m.id.clone(),
                delay_ms: 0,
                color: None,
            })
            .collect(),
        SyncType::ColorHarmony => ordered
            .iter()
            .enumerate()
            .map(|(k, m)| MemberSlot {
                member_id: m.id.clone(),
                delay_ms: 0,
                color: if colors.is_empty() {
                    None
                } else {
                    Some(colors[k % colors.len()])
                },
            })
            .collect(),
        SyncType::SequentialFlow => {
            let speed = if timing.pixels_per_second > 0.0 {
                timing.pixels_per_second
            } else {
                SyncTimingConfig::default().pixels_per_second
            };
            let mut cumulative = 0.0_f64;
            let mut slots = Vec::with_capacity(ordered.len());
            for (k, m) in ordered.iter().enumerate() {
                let delay_ms = (cumulative / speed * 1000.0).round() as u64
                    + timing.gap_delay_ms * k as u64;
                slots.push(MemberSlot {
                    member_id: m.id.clone(),
                    delay_ms,
                    color: None,
                });
                cumulative += m.propagation_meters();
            }
            slots
        }
    }
}

/// Slots for a received command: filters the record's member list through
/// participation state and the command's excluded set, then computes
/// offsets. This is the entry point agents use to recompute their own
/// delay locally.
pub fn offsets_for_command(
    members: &[NeighborhoodMember],
    command: &SyncCommand,
) -> Vec<MemberSlot> {
    let opt_out = if command.excluded.is_empty() {
        None
    } else {
        Some(command.excluded.as_slice())
    };
    let eligible = participation::filter_eligible(members, opt_out);
    compute_offsets(
        &eligible,
        command.request.sync_type,
        &command.request.colors,
        &command.request.timing,
    )
}
