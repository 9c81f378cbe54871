//! In-memory reference implementation of the shared group store.
//!
//! Whole-document writes fan out to every subscriber over a tokio
//! broadcast channel per group. A lagged subscriber silently skips the
//! missed updates — at-least-once delivery, with `read_group` available
//! to re-fetch the latest record after a gap.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use lumina_core::error::Result;
use lumina_core::traits::{GroupStore, RecordStream};
use lumina_core::types::{GroupRecord, SyncSchedule};

const TOPIC_BUFFER: usize = 64;

pub struct MemoryGroupStore {
    groups: RwLock<HashMap<String, GroupRecord>>,
    schedules: RwLock<HashMap<String, Vec<SyncSchedule>>>,
    topics: RwLock<HashMap<String, broadcast::Sender<GroupRecord>>>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
            topics: RwLock::new(HashMap::new()),
        }
    }

    async fn topic(&self, group_id: &str) -> broadcast::Sender<GroupRecord> {
        let mut topics = self.topics.write().await;
        topics
            .entry(group_id.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_BUFFER).0)
            .clone()
    }
}

impl Default for MemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn write_group(&self, record: GroupRecord) -> Result<()> {
        let group_id = record.group.id.clone();
        self.groups
            .write()
            .await
            .insert(group_id.clone(), record.clone());
        // Fan out to subscribers; no receivers is fine.
        let _ = self.topic(&group_id).await.send(record);
        Ok(())
    }

    async fn read_group(&self, group_id: &str) -> Result<Option<GroupRecord>> {
        Ok(self.groups.read().await.get(group_id).cloned())
    }

    async fn subscribe_group(&self, group_id: &str) -> Result<RecordStream> {
        let rx = self.topic(group_id).await.subscribe();
        let stream = BroadcastStream::new(rx).filter_map(|item| item.ok());
        Ok(Box::new(stream))
    }

    async fn write_schedules(&self, group_id: &str, schedules: Vec<SyncSchedule>) -> Result<()> {
        self.schedules
            .write()
            .await
            .insert(group_id.to_string(), schedules);
        Ok(())
    }

    async fn read_schedules(&self, group_id: &str) -> Result<Vec<SyncSchedule>> {
        Ok(self
            .schedules
            .read()
            .await
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }
}
