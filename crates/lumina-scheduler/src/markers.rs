//! Durable fired-per-window markers.
//!
//! A schedule must never fire twice for the same calendar day on the
//! same client, including across app restarts. Markers live in a small
//! JSON file keyed by `schedule_id:date` — human-readable, written only
//! when a schedule actually fires, never on ordinary ticks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};

/// File-backed fired markers.
pub struct FiredMarkers {
    path: PathBuf,
    fired: HashMap<String, DateTime<Utc>>,
}

impl FiredMarkers {
    /// Open (or create) the marker store in the given directory.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        let path = dir.to_path_buf();
        let fired = Self::load(&path);
        Self { path, fired }
    }

    /// Default store path (~/.lumina/scheduler).
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".lumina").join("scheduler")
    }

    fn key(schedule_id: &str, date: NaiveDate) -> String {
        format!("{schedule_id}:{date}")
    }

    /// Has this schedule already fired for this calendar day?
    pub fn is_fired(&self, schedule_id: &str, date: NaiveDate) -> bool {
        self.fired.contains_key(&Self::key(schedule_id, date))
    }

    /// Record a firing and persist immediately.
    pub fn mark_fired(&mut self, schedule_id: &str, date: NaiveDate, at: DateTime<Utc>) {
        self.fired.insert(Self::key(schedule_id, date), at);
        self.save();
    }

    /// Drop markers for past days. Markers only need to survive for the
    /// remainder of their own calendar day.
    pub fn prune(&mut self, today: NaiveDate) {
        let before = self.fired.len();
        self.fired.retain(|key, _| {
            key.rsplit_once(':')
                .and_then(|(_, d)| d.parse::<NaiveDate>().ok())
                .is_some_and(|d| d >= today)
        });
        if self.fired.len() < before {
            self.save();
        }
    }

    fn file(path: &Path) -> PathBuf {
        path.join("fired.json")
    }

    fn save(&self) {
        let file = Self::file(&self.path);
        match serde_json::to_string_pretty(&self.fired) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&file, json) {
                    tracing::warn!("⚠️ Failed to save fired markers: {e}");
                }
            }
            Err(e) => tracing::warn!("⚠️ Failed to serialize fired markers: {e}"),
        }
    }

    fn load(path: &Path) -> HashMap<String, DateTime<Utc>> {
        let file = Self::file(path);
        if !file.exists() {
            return HashMap::new();
        }
        match std::fs::read_to_string(&file) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to parse fired.json: {e}");
                HashMap::new()
            }),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read fired.json: {e}");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check() {
        let dir = std::env::temp_dir().join("lumina-test-markers");
        std::fs::remove_dir_all(&dir).ok();
        let mut markers = FiredMarkers::new(&dir);
        let date = NaiveDate::from_ymd_opt(2026, 12, 4).unwrap();
        assert!(!markers.is_fired("s1", date));
        markers.mark_fired("s1", date, Utc::now());
        assert!(markers.is_fired("s1", date));
        // A different day is a different window.
        assert!(!markers.is_fired("s1", date.succ_opt().unwrap()));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_survives_reload() {
        let dir = std::env::temp_dir().join("lumina-test-markers-reload");
        std::fs::remove_dir_all(&dir).ok();
        let date = NaiveDate::from_ymd_opt(2026, 12, 4).unwrap();
        {
            let mut markers = FiredMarkers::new(&dir);
            markers.mark_fired("s1", date, Utc::now());
        }
        let reloaded = FiredMarkers::new(&dir);
        assert!(reloaded.is_fired("s1", date));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_prune_drops_past_days() {
        let dir = std::env::temp_dir().join("lumina-test-markers-prune");
        std::fs::remove_dir_all(&dir).ok();
        let mut markers = FiredMarkers::new(&dir);
        let yesterday = NaiveDate::from_ymd_opt(2026, 12, 3).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 12, 4).unwrap();
        markers.mark_fired("s1", yesterday, Utc::now());
        markers.mark_fired("s1", today, Utc::now());
        markers.prune(today);
        assert!(!markers.is_fired("s1", yesterday));
        assert!(markers.is_fired("s1", today));
        std::fs::remove_dir_all(&dir).ok();
    }
}
