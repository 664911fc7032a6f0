use crate::domain::entities::Record;
use crate::domain::value_objects::LifecycleState;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// On-device tier. Authoritative for edits that have not reached the remote store yet.
#[async_trait]
pub trait LocalRecordStore: Send + Sync {
    /// Upsert keyed by id. Live media is transcoded to its embedded form before the
    /// row is written; the returned record is what was persisted.
    async fn put(&self, record: &Record) -> Result<Record, AppError>;
    async fn get(&self, id: &str) -> Result<Option<Record>, AppError>;
    async fn get_all(&self) -> Result<Vec<Record>, AppError>;
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
    async fn list_by_owner(
        &self,
        owner_id: &str,
        state: Option<LifecycleState>,
    ) -> Result<Vec<Record>, AppError>;
    async fn mark_remote_synced(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
}
