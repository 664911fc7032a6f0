use crate::application::ports::{RemoteEntry, RemoteRecordDocument, RemoteRecordStore};
use crate::domain::value_objects::RemoteLocation;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-process remote tier. Private documents are keyed by `(owner, id)`, public ones by `id`.
#[derive(Default)]
pub struct MemoryRemoteStore {
    private: RwLock<HashMap<(String, String), RemoteRecordDocument>>,
    public: RwLock<HashMap<String, RemoteRecordDocument>>,
    write_count: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::Relaxed)
    }

    pub async fn contains(&self, location: RemoteLocation, owner_id: &str, id: &str) -> bool {
        match location {
            RemoteLocation::Private => self
                .private
                .read()
                .await
                .contains_key(&(owner_id.to_string(), id.to_string())),
            RemoteLocation::Public => self
                .public
                .read()
                .await
                .get(id)
                .is_some_and(|document| document.user_id == owner_id),
        }
    }
}

#[async_trait]
impl RemoteRecordStore for MemoryRemoteStore {
    async fn write(
        &self,
        location: RemoteLocation,
        document: &RemoteRecordDocument,
    ) -> Result<RemoteRecordDocument, AppError> {
        let mut stored = document.clone();
        match location {
            RemoteLocation::Private => {
                let mut private = self.private.write().await;
                let key = (document.user_id.clone(), document.id.clone());
                if let Some(existing) = private.get(&key) {
                    stored.created_at = existing.created_at;
                }
                private.insert(key, stored.clone());
            }
            RemoteLocation::Public => {
                let mut public = self.public.write().await;
                if let Some(existing) = public.get(&document.id) {
                    if existing.user_id != document.user_id {
                        return Err(AppError::RemoteWriteFailed(format!(
                            "public record {} belongs to another owner",
                            document.id
                        )));
                    }
                    stored.created_at = existing.created_at;
                }
                public.insert(document.id.clone(), stored.clone());
            }
        }
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(stored)
    }

    async fn read(
        &self,
        owner_id: &str,
        id: &str,
        location: Option<RemoteLocation>,
    ) -> Result<Option<RemoteEntry>, AppError> {
        if location != Some(RemoteLocation::Public) {
            let private = self
                .private
                .read()
                .await
                .get(&(owner_id.to_string(), id.to_string()))
                .cloned()
                .map(|document| RemoteEntry {
                    location: RemoteLocation::Private,
                    document,
                });
            // 非公開側が優先
            if private.is_some() {
                return Ok(private);
            }
        }
        if location == Some(RemoteLocation::Private) {
            return Ok(None);
        }
        Ok(self
            .public
            .read()
            .await
            .get(id)
            .filter(|document| document.user_id == owner_id)
            .cloned()
            .map(|document| RemoteEntry {
                location: RemoteLocation::Public,
                document,
            }))
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
        let removed = match location {
            RemoteLocation::Private => self
                .private
                .write()
                .await
                .remove(&(owner_id.to_string(), id.to_string()))
                .is_some(),
            RemoteLocation::Public => {
                let mut public = self.public.write().await;
                let owned = public
                    .get(id)
                    .is_some_and(|document| document.user_id == owner_id);
                owned && public.remove(id).is_some()
            }
        };
        Ok(removed)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<RemoteEntry>, AppError> {
        let mut entries: Vec<RemoteEntry> = self
            .private
            .read()
            .await
            .iter()
            .filter(|((owner, _), _)| owner == owner_id)
            .map(|(_, document)| RemoteEntry {
                location: RemoteLocation::Private,
                document: document.clone(),
            })
            .collect();
        entries.extend(
            self.public
                .read()
                .await
                .values()
                .filter(|document| document.user_id == owner_id)
                .map(|document| RemoteEntry {
                    location: RemoteLocation::Public,
                    document: document.clone(),
                }),
        );
        entries.sort_by(|a, b| a.document.id.cmp(&b.document.id));
        Ok(entries)
    }
}
