use crate::application::ports::BlobService;
use crate::domain::value_objects::blob_path::validate_segment;
use crate::domain::value_objects::BlobPath;
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Blob service backed by a local directory. Objects live at `{root}/{owner}/{record}/{kind}_{slot}.{ext}`
/// and are addressed with `file://` URLs.
pub struct FsBlobService {
    root: PathBuf,
}

impl FsBlobService {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|err| {
            AppError::Storage(format!("Failed to create blob directory {}: {err}", root.display()))
        })?;
        info!(path = %root.display(), "Blob directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &BlobPath) -> PathBuf {
        self.root
            .join(path.owner_id())
            .join(path.record_id())
            .join(path.file_name())
    }

    pub async fn read(&self, path: &BlobPath) -> Result<Bytes, AppError> {
        let object_path = self.object_path(path);
        match tokio::fs::read(&object_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("blob {path}")))
            }
            Err(err) => Err(AppError::Storage(format!("{}: {err}", object_path.display()))),
        }
    }

    pub async fn exists(&self, path: &BlobPath) -> bool {
        tokio::fs::try_exists(self.object_path(path))
            .await
            .unwrap_or(false)
    }
}

#[async_trait]
impl BlobService for FsBlobService {
    async fn put(
        &self,
        path: &BlobPath,
        _content_type: &str,
        bytes: Bytes,
    ) -> Result<String, AppError> {
        let object_path = self.object_path(path);
        if let Some(parent) = object_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                AppError::UploadFailed(format!("{}: {err}", parent.display()))
            })?;
        }

        // 一時ファイルに書いてから置き換える。同じスロットの再送は上書きになる
        let temp_path = object_path.with_extension("part");
        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|err| AppError::UploadFailed(format!("{}: {err}", temp_path.display())))?;
        tokio::fs::rename(&temp_path, &object_path)
            .await
            .map_err(|err| {
                AppError::UploadFailed(format!(
                    "rename {} to {}: {err}",
                    temp_path.display(),
                    object_path.display()
                ))
            })?;

        debug!(key = %path, size = bytes.len(), "Stored blob");
        Ok(self.url_for(path))
    }

    async fn delete_record_blobs(&self, owner_id: &str, record_id: &str) -> Result<(), AppError> {
        validate_segment("owner_id", owner_id).map_err(AppError::ValidationError)?;
        validate_segment("record_id", record_id).map_err(AppError::ValidationError)?;
        let dir = self.root.join(owner_id).join(record_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(owner_id, record_id, "Deleted record blobs");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Storage(format!("{}: {err}", dir.display()))),
        }
    }

    fn url_for(&self, path: &BlobPath) -> String {
        format!("file://{}", self.object_path(path).display())
    }
}
