use crate::domain::value_objects::BlobPath;
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait BlobService: Send + Sync {
    /// Stores `bytes` at `path`, overwriting any previous object, and returns its URL.
    async fn put(&self, path: &BlobPath, content_type: &str, bytes: Bytes)
        -> Result<String, AppError>;

    /// Removes every blob under `{owner_id}/{record_id}/`.
    async fn delete_record_blobs(&self, owner_id: &str, record_id: &str) -> Result<(), AppError>;

    fn url_for(&self, path: &BlobPath) -> String;
}
