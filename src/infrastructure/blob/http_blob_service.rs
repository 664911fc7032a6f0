use crate::application::ports::BlobService;
use crate::domain::value_objects::blob_path::validate_segment;
use crate::domain::value_objects::BlobPath;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Blob service speaking plain HTTP: `PUT {upload_base}/{key}` stores an object,
/// `DELETE {upload_base}/{owner}/{record}/` drops every object of a record.
pub struct HttpBlobService {
    client: reqwest::Client,
    upload_base_url: String,
    public_base_url: String,
}

impl HttpBlobService {
    pub fn new(
        upload_base_url: impl Into<String>,
        public_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self {
            client,
            upload_base_url: trim_base(upload_base_url.into()),
            public_base_url: trim_base(public_base_url.into()),
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, AppError> {
        let Some(upload_base) = config.blob_upload_base_url.clone() else {
            return Ok(None);
        };
        let public_base = config.blob_public_base_url.clone().ok_or_else(|| {
            AppError::ConfigurationError(
                "blob_public_base_url is required when blob_upload_base_url is set".to_string(),
            )
        })?;
        Self::new(
            upload_base,
            public_base,
            Duration::from_secs(config.request_timeout),
        )
        .map(Some)
    }

    fn upload_url(&self, path: &BlobPath) -> String {
        format!("{}/{}", self.upload_base_url, encoded_key(path))
    }

    fn record_url(&self, owner_id: &str, record_id: &str) -> String {
        format!(
            "{}/{}/{}/",
            self.upload_base_url,
            urlencoding::encode(owner_id),
            urlencoding::encode(record_id)
        )
    }
}

/// ID部分だけをパーセントエンコードしたキー
fn encoded_key(path: &BlobPath) -> String {
    format!(
        "{}/{}/{}",
        urlencoding::encode(path.owner_id()),
        urlencoding::encode(path.record_id()),
        path.file_name()
    )
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl BlobService for HttpBlobService {
    async fn put(
        &self,
        path: &BlobPath,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, AppError> {
        let size = bytes.len();
        self.client
            .put(self.upload_url(path))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| AppError::UploadFailed(format!("{path}: {err}")))?;

        debug!(key = %path, size, "Uploaded blob");
        Ok(self.url_for(path))
    }

    async fn delete_record_blobs(&self, owner_id: &str, record_id: &str) -> Result<(), AppError> {
        validate_segment("owner_id", owner_id).map_err(AppError::ValidationError)?;
        validate_segment("record_id", record_id).map_err(AppError::ValidationError)?;
        let response = self
            .client
            .delete(self.record_url(owner_id, record_id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }

    fn url_for(&self, path: &BlobPath) -> String {
        format!("{}/{}", self.public_base_url, encoded_key(path))
    }
}
