//! Participation state — who is in, who is out.
//!
//! Two independent axes: the member-level Active/Paused switch (excludes
//! from everything) and per-schedule opt-out sets (exclude from one
//! schedule's triggers only). Both are self-service: transitions take a
//! `&mut` on the member's own record or the schedule document — there is
//! no remote override of another member.

use lumina_core::types::{NeighborhoodMember, ParticipationStatus, SyncSchedule};

/// Whether a member receives (and affects the timing of) a trigger.
/// `opt_out` is the schedule's opt-out set, or `None` for manual starts.
pub fn is_eligible(member: &NeighborhoodMember, opt_out: Option<&[String]>) -> bool {
    if member.is_paused() {
        return false;
    }
    match opt_out {
        Some(ids) => !ids.iter().any(|id| *id == member.id),
        None => true,
    }
}

/// Eligible members in input order. Excluded members neither affect the
/// distance accumulation nor receive a delay slot.
pub fn filter_eligible(
    members: &[NeighborhoodMember],
    opt_out: Option<&[String]>,
) -> Vec<NeighborhoodMember> {
    members
        .iter()
        .filter(|m| is_eligible(m, opt_out))
        .cloned()
        .collect()
}

/// Pause a member's participation (self-service).
pub fn pause(member: &mut NeighborhoodMember) {
    member.participation = ParticipationStatus::Paused;
    tracing::info!("⏸️ Member '{}' paused participation", member.display_name);
}

/// Resume a paused member (self-service).
pub fn resume(member: &mut NeighborhoodMember) {
    member.participation = ParticipationStatus::Active;
    tracing::info!("▶️ Member '{}' resumed participation", member.display_name);
}

/// Toggle a member's opt-out on one schedule. Independent of Paused.
pub fn set_schedule_opt_out(schedule: &mut SyncSchedule, member_id: &str, opted_out: bool) {
    let present = schedule.opted_out.iter().any(|id| id == member_id);
    if opted_out && !present {
        schedule.opted_out.push(member_id.to_string());
    } else if !opted_out && present {
        schedule.opted_out.retain(|id| id != member_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Weekday};
    use lumina_core::types::{Color, SyncRequest, SyncTimingConfig, SyncType};

    fn member(id: &str) -> NeighborhoodMember {
        let mut m = NeighborhoodMember::new("g1", id, 0, 30);
        m.id = id.to_string();
        m
    }

    fn schedule() -> SyncSchedule {
        SyncSchedule::daily(
            "g1",
            SyncRequest {
                sync_type: SyncType::Simultaneous,
                effect_id: 0,
                colors: vec![Color::new(255, 0, 0)],
                speed: 128,
                intensity: 128,
                brightness: 255,
                timing: SyncTimingConfig::default(),
                pattern_name: "Solid".into(),
            },
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            vec![Weekday::Fri],
        )
    }

    #[test]
    fn test_paused_excludes_from_everything() {
        let mut m = member("m1");
        pause(&mut m);
        assert!(!is_eligible(&m, None));
        assert!(!is_eligible(&m, Some(&[])));
        resume(&mut m);
        assert!(is_eligible(&m, None));
    }

    #[test]
    fn test_opt_out_is_per_schedule() {
        let m = member("m1");
        let opt_out = vec!["m1".to_string()];
        // Opted out of this schedule...
        assert!(!is_eligible(&m, Some(&opt_out)));
        // ...but still eligible for manual triggers.
        assert!(is_eligible(&m, None));
    }

    #[test]
    fn test_filter_preserves_order() {
        let members = vec![member("a"), member("b"), member("c")];
        let opt_out = vec!["b".to_string()];
        let eligible = filter_eligible(&members, Some(&opt_out));
        let ids: Vec<&str> = eligible.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_schedule_opt_out_toggle() {
        let mut sched = schedule();
        set_schedule_opt_out(&mut sched, "m1", true);
        set_schedule_opt_out(&mut sched, "m1", true);
        assert_eq!(sched.opted_out, vec!["m1".to_string()]);
        set_schedule_opt_out(&mut sched, "m1", false);
        assert!(sched.opted_out.is_empty());
    }
}
