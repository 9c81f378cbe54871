//! Core data model — groups, members, commands, schedules.
//!
//! Everything here is plain serde data. The shared store holds one
//! versioned `GroupRecord` per group; a new `SyncCommand` supersedes the
//! previous one by `origin_timestamp` (last write wins).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{LuminaError, Result};

/// Highest effect id in the WLED 0.14 effect table.
pub const MAX_EFFECT_ID: u16 = 186;

/// Strip density assumed when a member never measured their roofline.
/// Matches the 30 LED/m strips the stock Lumina kit ships with.
pub const DEFAULT_LEDS_PER_METER: f64 = 30.0;

/// An RGB color, sent to WLED as a `[r, g, b]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// WLED segment color triple.
    pub fn as_triple(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Whether a member currently takes part in syncs at all.
/// Paused excludes the member from every command, scheduled or manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticipationStatus {
    #[default]
    Active,
    Paused,
}

/// How a member's own LEDs are physically wired along the roofline.
/// Independent of the group's street order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RooflineDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    CenterOut,
}

/// The neighborhood group — the shared show state all members see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodGroup {
    pub id: String,
    pub display_name: String,
    /// A sync is currently running group-wide.
    pub is_active: bool,
    pub active_pattern_name: Option<String>,
}

impl NeighborhoodGroup {
    pub fn new(display_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            is_active: false,
            active_pattern_name: None,
        }
    }
}

/// One participant: a home, its controller, and its light-run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodMember {
    pub id: String,
    pub group_id: String,
    pub display_name: String,
    /// Left-to-right street order. Ties broken by insertion order.
    pub position_index: i32,
    pub led_count: u32,
    /// Measured roofline length in metres. 0.0 = not measured.
    #[serde(default)]
    pub roofline_meters: f64,
    #[serde(default)]
    pub roofline_direction: RooflineDirection,
    #[serde(default)]
    pub participation: ParticipationStatus,
    /// Last-known controller reachability. Advisory only — an offline
    /// member still gets a delay slot and simply misses its trigger.
    #[serde(default)]
    pub is_online: bool,
}

impl NeighborhoodMember {
    pub fn new(group_id: &str, display_name: &str, position_index: i32, led_count: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            display_name: display_name.to_string(),
            position_index,
            led_count,
            roofline_meters: 0.0,
            roofline_direction: RooflineDirection::default(),
            participation: ParticipationStatus::default(),
            is_online: false,
        }
    }

    /// Distance this member contributes to the wave accumulator.
    /// Falls back to `led_count` at stock strip density when unmeasured.
    pub fn propagation_meters(&self) -> f64 {
        if self.roofline_meters > 0.0 {
            self.roofline_meters
        } else {
            self.led_count as f64 / DEFAULT_LEDS_PER_METER
        }
    }

    pub fn is_paused(&self) -> bool {
        self.participation == ParticipationStatus::Paused
    }
}

/// Wave timing knobs. Immutable value object embedded in commands and
/// schedules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncTimingConfig {
    /// Propagation speed of a sequential wave, in distance units/second.
    #[serde(default = "default_pixels_per_second")]
    pub pixels_per_second: f64,
    /// Fixed extra pause between consecutive members.
    #[serde(default)]
    pub gap_delay_ms: u64,
    /// Traverse the position order in reverse (wave travels the other way).
    #[serde(default)]
    pub reverse_direction: bool,
}

fn default_pixels_per_second() -> f64 {
    10.0
}

impl Default for SyncTimingConfig {
    fn default() -> Self {
        Self {
            pixels_per_second: default_pixels_per_second(),
            gap_delay_ms: 0,
            reverse_direction: false,
        }
    }
}

/// How the group-level effect maps onto per-member triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncType {
    /// Trigger time increases by street position — a wave down the street.
    SequentialFlow,
    /// Everyone fires at once.
    Simultaneous,
    /// Everyone runs the same pattern, fired at once.
    PatternMatch,
    /// Fired at once, but each home gets a distinct color from the palette.
    ColorHarmony,
}

/// The effect payload shared by a manual start and a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub sync_type: SyncType,
    /// WLED effect id.
    pub effect_id: u16,
    pub colors: Vec<Color>,
    pub speed: u8,
    pub intensity: u8,
    pub brightness: u8,
    #[serde(default)]
    pub timing: SyncTimingConfig,
    pub pattern_name: String,
}

impl SyncRequest {
    pub fn validate(&self) -> Result<()> {
        if self.colors.is_empty() {
            return Err(LuminaError::InvalidCommand(
                "colors list must not be empty".into(),
            ));
        }
        if self.effect_id > MAX_EFFECT_ID {
            return Err(LuminaError::InvalidCommand(format!(
                "unknown WLED effect id {}",
                self.effect_id
            )));
        }
        Ok(())
    }
}

/// One immutable, group-wide sync trigger. Every client derives its own
/// local timing from `origin_timestamp` plus its member record — delays
/// are never transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCommand {
    pub group_id: String,
    /// Shared epoch all members offset from.
    pub origin_timestamp: DateTime<Utc>,
    /// Member ids excluded at synthesis time (schedule opt-outs), so every
    /// client reproduces the same eligible set when recomputing delays.
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(flatten)]
    pub request: SyncRequest,
}

impl SyncCommand {
    pub fn new(
        group_id: &str,
        request: SyncRequest,
        excluded: Vec<String>,
        origin_timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        request.validate()?;
        Ok(Self {
            group_id: group_id.to_string(),
            origin_timestamp,
            excluded,
            request,
        })
    }
}

/// A recurring auto-fire window. Evaluated independently on every client;
/// the fired-marker store keeps each client at-most-once per day-window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSchedule {
    pub id: String,
    pub group_id: String,
    pub request: SyncRequest,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fixed daily window start. Ignored when `use_sunset` is set.
    pub daily_start_time: Option<NaiveTime>,
    pub daily_end_time: NaiveTime,
    /// Window opens at computed sunset instead of a fixed time.
    #[serde(default)]
    pub use_sunset: bool,
    pub days_of_week: Vec<Weekday>,
    /// Members opted out of this schedule only (independent of Paused).
    #[serde(default)]
    pub opted_out: Vec<String>,
    pub notification_message: Option<String>,
}

impl SyncSchedule {
    /// Schedule with a fixed daily start time.
    pub fn daily(
        group_id: &str,
        request: SyncRequest,
        start_date: NaiveDate,
        end_date: NaiveDate,
        daily_start_time: NaiveTime,
        daily_end_time: NaiveTime,
        days_of_week: Vec<Weekday>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            request,
            start_date,
            end_date,
            daily_start_time: Some(daily_start_time),
            daily_end_time,
            use_sunset: false,
            days_of_week,
            opted_out: Vec::new(),
            notification_message: None,
        }
    }

    /// Schedule whose window opens at local sunset.
    pub fn at_sunset(
        group_id: &str,
        request: SyncRequest,
        start_date: NaiveDate,
        end_date: NaiveDate,
        daily_end_time: NaiveTime,
        days_of_week: Vec<Weekday>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            request,
            start_date,
            end_date,
            daily_start_time: None,
            daily_end_time,
            use_sunset: true,
            days_of_week,
            opted_out: Vec::new(),
            notification_message: None,
        }
    }

    /// Date falls inside `[start_date, end_date]` and its weekday matches.
    pub fn covers(&self, date: NaiveDate, weekday: Weekday) -> bool {
        date >= self.start_date && date <= self.end_date && self.days_of_week.contains(&weekday)
    }
}

/// The single versioned document the distributor publishes per group.
/// Whole-record replace only — no partial updates, no read-modify-write
/// races between members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Monotonic write counter; `origin_timestamp` breaks ties between
    /// commands.
    pub version: u64,
    pub group: NeighborhoodGroup,
    pub members: Vec<NeighborhoodMember>,
    pub command: Option<SyncCommand>,
}

impl GroupRecord {
    pub fn new(group: NeighborhoodGroup) -> Self {
        Self {
            version: 0,
            group,
            members: Vec::new(),
            command: None,
        }
    }

    pub fn member(&self, member_id: &str) -> Option<&NeighborhoodMember> {
        self.members.iter().find(|m| m.id == member_id)
    }
}
