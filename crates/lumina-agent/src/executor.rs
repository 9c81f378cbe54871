//! Local execution agent.
//!
//! One per subscribed client. Turns a delivered `SyncCommand` into a
//! single cancellable timer for this member's own trigger instant
//! (`origin_timestamp + delay`, evaluated against the local clock), then
//! fires the member's controller once. Redelivery of the same origin is
//! a no-op; an older origin is discarded; a newer command or a stop
//! cancels the pending timer explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use lumina_broadcast::Distributor;
use lumina_core::traits::LightController;
use lumina_core::types::{GroupRecord, NeighborhoodMember, SyncCommand};
use lumina_sync::timing;

use crate::controller::WledState;

#[derive(Default)]
struct Counters {
    fired: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
    duplicates: AtomicU64,
}

/// Local execution counters. Never reported back through the
/// distributor — per-member failures stay on that member's device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentStats {
    pub fired: u64,
    pub failed: u64,
    pub stale: u64,
    pub duplicates: u64,
}

struct PendingTimer {
    group_id: String,
    origin: DateTime<Utc>,
    handle: JoinHandle<()>,
}

pub struct ExecutionAgent {
    member_id: String,
    controller: Arc<dyn LightController>,
    /// Newest origin seen — fired, scheduled, or skipped as a non-participant.
    last_origin: Option<DateTime<Utc>>,
    /// Newest record version seen. Records going backwards in version
    /// are replays (the reconnect path can observe latest-then-stream
    /// out of order) and must not be treated as stops.
    last_version: Option<u64>,
    pending: Option<PendingTimer>,
    counters: Arc<Counters>,
}

impl ExecutionAgent {
    pub fn new(member_id: &str, controller: Arc<dyn LightController>) -> Self {
        Self {
            member_id: member_id.to_string(),
            controller,
            last_origin: None,
            last_version: None,
            pending: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Handle one delivered group record. A record without a command is
    /// a stop: the pending timer is cancelled immediately. Last write
    /// wins by `version` — a replayed older record is discarded whole,
    /// whether it carries a command or not.
    pub fn handle_record(&mut self, record: &GroupRecord) {
        if let Some(last) = self.last_version
            && record.version < last
        {
            self.counters.stale.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Stale record v{} ignored (newest seen v{})",
                record.version,
                last
            );
            return;
        }
        self.last_version = Some(record.version);
        match &record.command {
            None => self.cancel("sync stopped"),
            Some(command) => self.handle_command(command, &record.members),
        }
    }

    fn handle_command(&mut self, command: &SyncCommand, members: &[NeighborhoodMember]) {
        if let Some(last) = self.last_origin {
            if command.origin_timestamp == last {
                self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "Duplicate delivery of origin {} ignored",
                    command.origin_timestamp
                );
                return;
            }
            if command.origin_timestamp < last {
                self.counters.stale.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "⚠️ Stale command ignored (origin {} older than {})",
                    command.origin_timestamp,
                    last
                );
                return;
            }
        }
        self.last_origin = Some(command.origin_timestamp);
        self.cancel("superseded by newer command");

        // Recompute our own delay locally from this record's snapshot —
        // membership drift after this point never retimes the command.
        let slots = timing::offsets_for_command(members, command);
        let Some(slot) = slots.into_iter().find(|s| s.member_id == self.member_id) else {
            tracing::debug!(
                "Member {} not participating in '{}'",
                self.member_id,
                command.request.pattern_name
            );
            return;
        };

        let state = WledState::from_command(command, slot.color).to_json();
        let fire_at = command.origin_timestamp + ChronoDuration::milliseconds(slot.delay_ms as i64);
        let pattern = command.request.pattern_name.clone();
        let controller = self.controller.clone();
        let counters = self.counters.clone();

        let handle = tokio::spawn(async move {
            let now = Utc::now();
            if fire_at > now {
                let wait = (fire_at - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
            }
            match controller.apply(&state).await {
                Ok(()) => {
                    counters.fired.fetch_add(1, Ordering::Relaxed);
                    tracing::info!("✨ Fired '{pattern}' on local controller");
                }
                Err(e) => {
                    // Logged locally only — one neighbor's offline
                    // controller never blocks anyone else's show.
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("⚠️ Controller call for '{pattern}' failed: {e}");
                }
            }
        });

        tracing::info!(
            "⏲️ '{}' scheduled for member {} in {}ms",
            command.request.pattern_name,
            self.member_id,
            slot.delay_ms
        );
        self.pending = Some(PendingTimer {
            group_id: command.group_id.clone(),
            origin: command.origin_timestamp,
            handle,
        });
    }

    /// Cancel the pending timer, if any. Cancellation is explicit and
    /// keyed — supersession and stop both land here.
    fn cancel(&mut self, reason: &str) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
            tracing::info!(
                "🛑 Cancelled pending timer ({}, {}) — {reason}",
                pending.group_id,
                pending.origin
            );
        }
    }

    pub fn stop(&mut self) {
        self.cancel("stopped");
    }

    pub fn stats(&self) -> AgentStats {
        AgentStats {
            fired: self.counters.fired.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
        }
    }
}

/// Subscription loop: feeds every delivered record to the agent. On
/// (re)connect the latest record is re-fetched first, so a client that
/// missed pushes converges before streaming resumes.
pub async fn run(mut agent: ExecutionAgent, distributor: Arc<Distributor>) {
    loop {
        let mut stream = match distributor.subscribe().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("⚠️ Subscription failed: {e}; retrying");
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                continue;
            }
        };
        if let Ok(record) = distributor.latest().await {
            agent.handle_record(&record);
        }
        while let Some(record) = stream.next().await {
            agent.handle_record(&record);
        }
        tracing::warn!("Subscription stream ended; re-subscribing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lumina_core::error::Result;
    use lumina_core::types::{
        Color, NeighborhoodGroup, ParticipationStatus, SyncRequest, SyncTimingConfig, SyncType,
    };
    use std::sync::Mutex;

    struct MockController {
        calls: Mutex<Vec<serde_json::Value>>,
        fail: bool,
    }

    impl MockController {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LightController for MockController {
        async fn apply(&self, state: &serde_json::Value) -> Result<()> {
            self.calls.lock().unwrap().push(state.clone());
            if self.fail {
                return Err(lumina_core::error::LuminaError::ControllerUnreachable(
                    "mock down".into(),
                ));
            }
            Ok(())
        }
    }

    fn member(id: &str, position: i32) -> NeighborhoodMember {
        let mut m = NeighborhoodMember::new("g1", id, position, 0);
        m.id = id.to_string();
        m.roofline_meters = 10.0;
        m
    }

    fn record_with_command(
        sync_type: SyncType,
        origin: DateTime<Utc>,
        excluded: Vec<String>,
    ) -> GroupRecord {
        let mut group = NeighborhoodGroup::new("Elm Street");
        group.id = "g1".into();
        let mut record = GroupRecord::new(group);
        record.members = vec![member("m1", 1), member("m2", 2), member("m3", 3)];
        record.command = Some(
            SyncCommand::new(
                "g1",
                SyncRequest {
                    sync_type,
                    effect_id: 12,
                    colors: vec![Color::new(0, 255, 255), Color::new(255, 255, 255)],
                    speed: 150,
                    intensity: 100,
                    brightness: 220,
                    timing: SyncTimingConfig {
                        pixels_per_second: 10.0,
                        gap_delay_ms: 0,
                        reverse_direction: false,
                    },
                    pattern_name: "Wave".into(),
                },
                excluded,
                origin,
            )
            .unwrap(),
        );
        record
    }

    async fn settle() {
        // Let the paused clock run every pending timer to completion.
        tokio::time::sleep(tokio::time::Duration::from_secs(120)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_command() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m2", controller.clone());
        let record = record_with_command(SyncType::SequentialFlow, Utc::now(), Vec::new());
        agent.handle_record(&record);
        settle().await;
        assert_eq!(controller.call_count(), 1);
        assert_eq!(agent.stats().fired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_delivery_is_idempotent() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m2", controller.clone());
        let record = record_with_command(SyncType::SequentialFlow, Utc::now(), Vec::new());
        agent.handle_record(&record);
        agent.handle_record(&record);
        settle().await;
        assert_eq!(controller.call_count(), 1);
        assert_eq!(agent.stats().duplicates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_command_discarded() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m1", controller.clone());
        let newer = Utc::now();
        let older = newer - ChronoDuration::minutes(1);
        agent.handle_record(&record_with_command(SyncType::Simultaneous, newer, Vec::new()));
        agent.handle_record(&record_with_command(SyncType::Simultaneous, older, Vec::new()));
        settle().await;
        assert_eq!(controller.call_count(), 1);
        assert_eq!(agent.stats().stale, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_timer() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m3", controller.clone());
        // m3 is last in the wave: 2000ms out.
        let mut record = record_with_command(SyncType::SequentialFlow, Utc::now(), Vec::new());
        agent.handle_record(&record);
        record.command = None;
        agent.handle_record(&record);
        settle().await;
        assert_eq!(controller.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replayed_stop_does_not_cancel_newer_command() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m3", controller.clone());
        // Reconnect ordering: the latest record (v6, sync running) is
        // re-fetched first, then the stream replays the older stop (v5).
        let mut started = record_with_command(SyncType::SequentialFlow, Utc::now(), Vec::new());
        started.version = 6;
        agent.handle_record(&started);

        let mut stopped = started.clone();
        stopped.version = 5;
        stopped.command = None;
        agent.handle_record(&stopped);

        settle().await;
        // The newest record says the command is running: it still fires.
        assert_eq!(controller.call_count(), 1);
        assert_eq!(agent.stats().stale, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_command_supersedes_pending() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m3", controller.clone());
        let first = Utc::now();
        agent.handle_record(&record_with_command(SyncType::SequentialFlow, first, Vec::new()));
        agent.handle_record(&record_with_command(
            SyncType::Simultaneous,
            first + ChronoDuration::seconds(1),
            Vec::new(),
        ));
        settle().await;
        // Only the superseding command fires.
        assert_eq!(controller.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_excluded_member_never_calls_controller() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m2", controller.clone());
        let record =
            record_with_command(SyncType::Simultaneous, Utc::now(), vec!["m2".into()]);
        agent.handle_record(&record);
        settle().await;
        assert_eq!(controller.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_member_never_calls_controller() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m2", controller.clone());
        let mut record = record_with_command(SyncType::Simultaneous, Utc::now(), Vec::new());
        record.members[1].participation = ParticipationStatus::Paused;
        agent.handle_record(&record);
        settle().await;
        assert_eq!(controller.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_color_harmony_assignment_reaches_payload() {
        let controller = MockController::new();
        let mut agent = ExecutionAgent::new("m2", controller.clone());
        let record = record_with_command(SyncType::ColorHarmony, Utc::now(), Vec::new());
        agent.handle_record(&record);
        settle().await;
        let calls = controller.calls.lock().unwrap();
        // m2 is traversal index 1 → second palette color (white).
        assert_eq!(calls[0]["seg"][0]["col"], serde_json::json!([[255, 255, 255]]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_controller_failure_is_isolated() {
        let controller = MockController::failing();
        let mut agent = ExecutionAgent::new("m1", controller.clone());
        let record = record_with_command(SyncType::Simultaneous, Utc::now(), Vec::new());
        agent.handle_record(&record);
        settle().await;
        // Single attempt, no retry.
        assert_eq!(controller.call_count(), 1);
        assert_eq!(agent.stats().failed, 1);
        assert_eq!(agent.stats().fired, 0);
    }
}
