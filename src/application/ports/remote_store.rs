use crate::domain::value_objects::RemoteLocation;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cloud wire document. Metadata and blob references only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecordDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub username: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "videoURL")]
    pub video_url: Option<String>,
    #[serde(rename = "photoURLs", default)]
    pub photo_urls: Vec<String>,
    #[serde(rename = "audioURLs", default)]
    pub audio_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub location: RemoteLocation,
    pub document: RemoteRecordDocument,
}

#[async_trait]
pub trait RemoteRecordStore: Send + Sync {
    /// Writes the document at `location` and returns the stored copy.
    async fn write(
        &self,
        location: RemoteLocation,
        document: &RemoteRecordDocument,
    ) -> Result<RemoteRecordDocument, AppError>;

    /// With `location = None` both collections are checked, private first.
    async fn read(
        &self,
        owner_id: &str,
        id: &str,
        location: Option<RemoteLocation>,
    ) -> Result<Option<RemoteEntry>, AppError>;

    /// Removes the record from both collections. Returns whether anything existed.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError>;

    async fn delete_at(
        &self,
        location: RemoteLocation,
        owner_id: &str,
        id: &str,
    ) -> Result<bool, AppError>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<RemoteEntry>, AppError>;
}
