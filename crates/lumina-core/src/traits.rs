//! Interface traits for the external collaborators (§6 of the design):
//! the shared document store, the member's local controller, the sunset
//! function, and notification dispatch.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures::Stream;

use crate::error::Result;
use crate::types::{GroupRecord, SyncSchedule};

/// Stream of group record updates delivered to a subscriber.
pub type RecordStream = Box<dyn Stream<Item = GroupRecord> + Send + Unpin>;

/// Key-value-with-subscriptions store holding the group record and the
/// schedule list. Whole-document writes only.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn write_group(&self, record: GroupRecord) -> Result<()>;
    async fn read_group(&self, group_id: &str) -> Result<Option<GroupRecord>>;
    /// Push-based updates, at-least-once. Subscribers that lag or
    /// reconnect should `read_group` to re-fetch.
    async fn subscribe_group(&self, group_id: &str) -> Result<RecordStream>;
    async fn write_schedules(&self, group_id: &str, schedules: Vec<SyncSchedule>) -> Result<()>;
    async fn read_schedules(&self, group_id: &str) -> Result<Vec<SyncSchedule>>;
}

/// One member's local lighting controller. A flat JSON state document is
/// applied in a single bounded-timeout attempt — no retries.
#[async_trait]
pub trait LightController: Send + Sync {
    async fn apply(&self, state: &serde_json::Value) -> Result<()>;
}

/// Black-box geolocation/astronomy function. `None` means sunset could
/// not be computed for that date/location.
pub trait SunsetProvider: Send + Sync {
    fn sunset_time(&self, date: NaiveDate, latitude: f64, longitude: f64) -> Option<NaiveTime>;
}

/// Fire-and-forget notification dispatch.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, group_id: &str, message: &str);
}

/// Default notifier: records the message in the local log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, group_id: &str, message: &str) {
        tracing::info!("📣 [{}] {}", group_id, message);
    }
}
