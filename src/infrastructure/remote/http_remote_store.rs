use crate::application::ports::{RemoteEntry, RemoteRecordDocument, RemoteRecordStore};
use crate::domain::value_objects::RemoteLocation;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// JSON document store over HTTP.
///
/// Private documents live under `/users/{owner}/records/{id}`, public ones under `/records/{id}`.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, AppError> {
        match config.records_base_url.as_deref() {
            Some(base_url) => {
                Self::new(base_url, Duration::from_secs(config.request_timeout)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn document_url(&self, location: RemoteLocation, owner_id: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(location, owner_id),
            urlencoding::encode(id)
        )
    }

    fn collection_url(&self, location: RemoteLocation, owner_id: &str) -> String {
        match location {
            RemoteLocation::Private => format!(
                "{}/users/{}/records",
                self.base_url,
                urlencoding::encode(owner_id)
            ),
            RemoteLocation::Public => format!("{}/records", self.base_url),
        }
    }

    async fn read_at(
        &self,
        location: RemoteLocation,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<RemoteEntry>, AppError> {
        let response = self
            .client
            .get(self.document_url(location, owner_id, id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document = response
            .error_for_status()?
            .json::<RemoteRecordDocument>()
            .await
            .map_err(|err| AppError::DeserializationError(err.to_string()))?;
        Ok(Some(RemoteEntry { location, document }))
    }

    async fn list_at(
        &self,
        location: RemoteLocation,
        owner_id: &str,
    ) -> Result<Vec<RemoteEntry>, AppError> {
        let mut request = self.client.get(self.collection_url(location, owner_id));
        if location == RemoteLocation::Public {
            request = request.query(&[("userID", owner_id)]);
        }
        let documents = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<RemoteRecordDocument>>()
            .await
            .map_err(|err| AppError::DeserializationError(err.to_string()))?;
        Ok(documents
            .into_iter()
            .map(|document| RemoteEntry { location, document })
            .collect())
    }
}

#[async_trait]
impl RemoteRecordStore for HttpRemoteStore {
    async fn write(
        &self,
        location: RemoteLocation,
        document: &RemoteRecordDocument,
    ) -> Result<RemoteRecordDocument, AppError> {
        let url = self.document_url(location, &document.user_id, &document.id);
        let stored = self
            .client
            .put(&url)
            .json(document)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| AppError::RemoteWriteFailed(format!("{url}: {err}")))?
            .json::<RemoteRecordDocument>()
            .await
            .map_err(|err| AppError::RemoteWriteFailed(format!("{url}: invalid response: {err}")))?;
        debug!(record_id = %document.id, location = location.as_str(), "Remote document written");
        Ok(stored)
    }

    async fn read(
        &self,
        owner_id: &str,
        id: &str,
        location: Option<RemoteLocation>,
    ) -> Result<Option<RemoteEntry>, AppError> {
        if let Some(location) = location {
            return self.read_at(location, owner_id, id).await;
        }
        if let Some(private) = self.read_at(RemoteLocation::Private, owner_id, id).await? {
            return Ok(Some(private));
        }
        Ok(self
            .read_at(RemoteLocation::Public, owner_id, id)
            .await?
            .filter(|entry| entry.document.user_id == owner_id))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError> {
        let private = self.delete_at(RemoteLocation::Private, owner_id, id).await?;
        let public = self.delete_at(RemoteLocation::Public, owner_id, id).await?;
        Ok(private || public)
    }

    async fn delete_at(
        &self,
        location: RemoteLocation,
        owner_id: &str,
        id: &str,
    ) -> Result<bool, AppError> {
        let response = self
            .client
            .delete(self.document_url(location, owner_id, id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<RemoteEntry>, AppError> {
        let mut entries = self.list_at(RemoteLocation::Private, owner_id).await?;
        entries.extend(
            self.list_at(RemoteLocation::Public, owner_id)
                .await?
                .into_iter()
                .filter(|entry| entry.document.user_id == owner_id),
        );
        Ok(entries)
    }
}
