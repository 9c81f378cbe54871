//! Schedule evaluator — decides per tick whether a schedule is due.
//!
//! Every client runs its own evaluator against the shared schedule list.
//! Because the markers are per-client, all clients converge on firing in
//! the same day-window, without any cross-client coordination (exact
//! second-level simultaneity is not guaranteed, and not needed: the
//! fired command's `origin_timestamp` is the shared epoch).

use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Utc};
use tokio::time::{Duration, interval};

use lumina_broadcast::Distributor;
use lumina_core::config::LocationConfig;
use lumina_core::traits::{Notifier, SunsetProvider};
use lumina_core::types::SyncSchedule;

use crate::markers::FiredMarkers;

pub struct ScheduleEvaluator {
    markers: FiredMarkers,
    sunset: Arc<dyn SunsetProvider>,
    latitude: f64,
    longitude: f64,
}

impl ScheduleEvaluator {
    pub fn new(
        markers: FiredMarkers,
        sunset: Arc<dyn SunsetProvider>,
        location: &LocationConfig,
    ) -> Self {
        Self {
            markers,
            sunset,
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }

    /// Is the schedule's window open right now (device-local time)?
    ///
    /// For `use_sunset` schedules the window opens at the computed sunset;
    /// if sunset cannot be computed for the date, the schedule is simply
    /// not due that day.
    pub fn is_due(&self, schedule: &SyncSchedule, now: DateTime<Local>) -> bool {
        let date = now.date_naive();
        if !schedule.covers(date, date.weekday()) {
            return false;
        }
        let window_start = if schedule.use_sunset {
            match self
                .sunset
                .sunset_time(date, self.latitude, self.longitude)
            {
                Some(t) => t,
                None => return false,
            }
        } else {
            match schedule.daily_start_time {
                Some(t) => t,
                None => return false,
            }
        };
        let time = now.time();
        time >= window_start && time <= schedule.daily_end_time
    }

    /// One evaluation pass: returns schedules that are due and have not
    /// yet fired for today's window, marking them fired (persisted)
    /// before returning — at-most-once per `(schedule, date)`.
    pub fn tick(&mut self, schedules: &[SyncSchedule], now: DateTime<Local>) -> Vec<SyncSchedule> {
        let date = now.date_naive();
        let mut due = Vec::new();
        for schedule in schedules {
            if !self.is_due(schedule, now) || self.markers.is_fired(&schedule.id, date) {
                continue;
            }
            self.markers.mark_fired(&schedule.id, date, Utc::now());
            tracing::info!(
                "🔔 Schedule '{}' due for group '{}'",
                schedule.request.pattern_name,
                schedule.group_id
            );
            due.push(schedule.clone());
        }
        due
    }

    /// Drop markers from past days.
    pub fn prune(&mut self, now: DateTime<Local>) {
        self.markers.prune(now.date_naive());
    }
}

/// Background evaluator loop. Reads the shared schedule list each tick
/// and starts a sync for every due schedule, exactly as a manual start
/// would — substituting the schedule's opt-out set. Failures are logged
/// and never stop the loop.
pub async fn spawn_evaluator(
    mut evaluator: ScheduleEvaluator,
    distributor: Arc<Distributor>,
    notifier: Arc<dyn Notifier>,
    tick_interval_secs: u64,
) {
    tracing::info!(
        "⏰ Schedule evaluator started (check every {}s)",
        tick_interval_secs
    );
    let mut ticker = interval(Duration::from_secs(tick_interval_secs));

    loop {
        ticker.tick().await;
        let now = Local::now();
        evaluator.prune(now);

        let schedules = match distributor.schedules().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("⚠️ Failed to read schedule list: {e}");
                continue;
            }
        };

        for schedule in evaluator.tick(&schedules, now) {
            match distributor
                .start_sync(schedule.request.clone(), Some(&schedule.opted_out))
                .await
            {
                Ok(command) => {
                    tracing::info!(
                        "🌊 Scheduled sync '{}' started (origin {})",
                        command.request.pattern_name,
                        command.origin_timestamp
                    );
                    if let Some(message) = &schedule.notification_message {
                        notifier.notify(&schedule.group_id, message).await;
                    }
                }
                Err(e) => tracing::warn!("⚠️ Scheduled sync failed: {e}"),
            }
        }
    }
}
