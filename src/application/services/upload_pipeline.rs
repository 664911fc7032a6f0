use crate::application::ports::BlobService;
use crate::domain::entities::{MediaAsset, Record};
use crate::domain::value_objects::BlobPath;
use crate::infrastructure::codec::BlobCodec;
use crate::infrastructure::metrics::SyncMetrics;
use crate::shared::error::AppError;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Uploads every non-referenced asset of a record to the blob service.
pub struct UploadPipeline {
    blob_service: Arc<dyn BlobService>,
    codec: BlobCodec,
    concurrency: usize,
    metrics: Arc<SyncMetrics>,
}

impl UploadPipeline {
    pub fn new(
        blob_service: Arc<dyn BlobService>,
        codec: BlobCodec,
        concurrency: usize,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            blob_service,
            codec,
            concurrency: concurrency.max(1),
            metrics,
        }
    }

    /// Returns the record's assets with every payload turned into a reference.
    ///
    /// All uploads are awaited before returning, also when one of them fails.
    /// Objects that did land stay in place; a retry overwrites them at the same path.
    pub async fn upload_record(&self, record: &Record) -> Result<Vec<MediaAsset>, AppError> {
        let uploads: Vec<_> = record
            .assets
            .iter()
            .map(|asset| self.upload_asset(record, asset))
            .collect();
        let results: Vec<Result<(MediaAsset, bool), AppError>> = stream::iter(uploads)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut assets = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        let mut uploaded = 0u64;
        for result in results {
            match result {
                Ok((asset, was_uploaded)) => {
                    if was_uploaded {
                        uploaded += 1;
                    }
                    assets.push(asset);
                }
                Err(err) => failures.push(err.to_string()),
            }
        }
        self.metrics.record_uploads(uploaded, failures.len() as u64);

        if !failures.is_empty() {
            warn!(
                record_id = %record.id,
                failed = failures.len(),
                uploaded,
                "Media upload failed"
            );
            return Err(AppError::UploadFailed(format!(
                "record {}: {}",
                record.id,
                failures.join("; ")
            )));
        }

        debug!(record_id = %record.id, uploaded, "Media uploads joined");
        Ok(assets)
    }

    async fn upload_asset(
        &self,
        record: &Record,
        asset: &MediaAsset,
    ) -> Result<(MediaAsset, bool), AppError> {
        let Some(bytes) = self.codec.payload_bytes(asset)? else {
            return Ok((asset.clone(), false));
        };

        let path = BlobPath::new(
            &record.owner_id,
            &record.id,
            asset.kind,
            asset.slot_index,
            &asset.content_type,
        )
        .map_err(AppError::ValidationError)?;

        let url = self
            .blob_service
            .put(&path, &asset.content_type, bytes)
            .await
            .map_err(|err| AppError::UploadFailed(format!("{path}: {err}")))?;
        debug!(key = %path, url = %url, "Asset uploaded");
        Ok((asset.clone().into_referenced(url), true))
    }
}
