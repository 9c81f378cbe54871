//! Broadcast distributor — the only writer of the shared group record.
//!
//! Every mutation is a whole-record replace with a bumped `version`;
//! commands additionally carry a monotonic `origin_timestamp` tiebreaker.
//! No acknowledgements are collected: the distributor neither knows nor
//! cares whether any member's controller executed a command.

use std::sync::Arc;

use chrono::Utc;

use lumina_core::error::{LuminaError, Result};
use lumina_core::traits::{GroupStore, RecordStream};
use lumina_core::types::{
    GroupRecord, NeighborhoodGroup, NeighborhoodMember, SyncCommand, SyncRequest, SyncSchedule,
};
use lumina_sync::synthesizer;

pub struct Distributor {
    store: Arc<dyn GroupStore>,
    group_id: String,
}

impl Distributor {
    /// Create a fresh group in the store and attach to it.
    pub async fn create(store: Arc<dyn GroupStore>, display_name: &str) -> Result<Self> {
        let record = GroupRecord::new(NeighborhoodGroup::new(display_name));
        let group_id = record.group.id.clone();
        store.write_group(record).await?;
        tracing::info!("🏘️ Group '{}' created ({})", display_name, group_id);
        Ok(Self { store, group_id })
    }

    /// Attach to an existing group.
    pub fn attach(store: Arc<dyn GroupStore>, group_id: &str) -> Self {
        Self {
            store,
            group_id: group_id.to_string(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Latest record snapshot, re-fetchable after a subscription gap.
    pub async fn latest(&self) -> Result<GroupRecord> {
        self.store
            .read_group(&self.group_id)
            .await?
            .ok_or_else(|| LuminaError::Store(format!("unknown group '{}'", self.group_id)))
    }

    pub async fn subscribe(&self) -> Result<RecordStream> {
        self.store.subscribe_group(&self.group_id).await
    }

    /// Add a member (or replace a re-joining one). New members append at
    /// the end, which is what breaks `position_index` ties.
    pub async fn join(&self, member: NeighborhoodMember) -> Result<()> {
        let mut record = self.latest().await?;
        record.members.retain(|m| m.id != member.id);
        tracing::info!(
            "👋 '{}' joined group '{}' at position {}",
            member.display_name,
            record.group.display_name,
            member.position_index
        );
        record.members.push(member);
        self.publish(record).await
    }

    pub async fn leave(&self, member_id: &str) -> Result<()> {
        let mut record = self.latest().await?;
        record.members.retain(|m| m.id != member_id);
        self.publish(record).await
    }

    /// Replace a member's own record in place (self-describing update:
    /// pause/resume, roofline edits, online flag). Order is preserved.
    pub async fn update_member(&self, member: NeighborhoodMember) -> Result<()> {
        let mut record = self.latest().await?;
        match record.members.iter_mut().find(|m| m.id == member.id) {
            Some(slot) => *slot = member,
            None => record.members.push(member),
        }
        self.publish(record).await
    }

    /// Synthesize and publish a new sync. A newer command implicitly
    /// supersedes the running one; a command that would go backwards in
    /// time is refused as stale.
    pub async fn start_sync(
        &self,
        request: SyncRequest,
        opt_out: Option<&[String]>,
    ) -> Result<SyncCommand> {
        let mut record = self.latest().await?;
        let (command, group) =
            synthesizer::synthesize(&record.group, &record.members, request, opt_out, Utc::now())?;

        if let Some(prev) = &record.command
            && prev.origin_timestamp >= command.origin_timestamp
        {
            return Err(LuminaError::StaleCommand(format!(
                "origin {} not newer than running command {}",
                command.origin_timestamp, prev.origin_timestamp
            )));
        }

        record.group = group;
        record.command = Some(command.clone());
        self.publish(record).await?;
        Ok(command)
    }

    /// Stop the running sync: clear the command so every agent cancels
    /// its pending timer.
    pub async fn stop_sync(&self) -> Result<()> {
        let mut record = self.latest().await?;
        record.group = synthesizer::stop(&record.group);
        record.command = None;
        self.publish(record).await
    }

    pub async fn schedules(&self) -> Result<Vec<SyncSchedule>> {
        self.store.read_schedules(&self.group_id).await
    }

    pub async fn save_schedules(&self, schedules: Vec<SyncSchedule>) -> Result<()> {
        self.store.write_schedules(&self.group_id, schedules).await
    }

    async fn publish(&self, mut record: GroupRecord) -> Result<()> {
        record.version += 1;
        tracing::debug!(
            "💾 Publishing group '{}' record v{}",
            self.group_id,
            record.version
        );
        self.store.write_group(record).await
    }
}
