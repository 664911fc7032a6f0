use crate::application::ports::{
    AuthProvider, BlobService, LocalRecordStore, NoopRecovery, RecordRecovery, RemoteRecordStore,
};
use crate::application::services::{MediaSessionRegistry, SyncCollaborators, SyncCoordinator};
use crate::infrastructure::auth::SessionAuthProvider;
use crate::infrastructure::blob::{FsBlobService, HttpBlobService};
use crate::infrastructure::codec::BlobCodec;
use crate::infrastructure::database::{ConnectionPool, SqliteRecordStore};
use crate::infrastructure::metrics::SyncMetrics;
use crate::infrastructure::remote::{HttpRemoteStore, MemoryRemoteStore};
use crate::shared::config::AppConfig;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// エンジン全体の状態。設定から各コンポーネントを組み立てる
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: ConnectionPool,
    pub local_store: Arc<SqliteRecordStore>,
    pub remote_store: Arc<dyn RemoteRecordStore>,
    pub blob_service: Arc<dyn BlobService>,
    pub auth: Arc<SessionAuthProvider>,
    pub sessions: Arc<MediaSessionRegistry>,
    pub metrics: Arc<SyncMetrics>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        Self::with_recovery(config, Arc::new(NoopRecovery)).await
    }

    pub async fn with_recovery(
        config: AppConfig,
        recovery: Arc<dyn RecordRecovery>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;

        let pool = ConnectionPool::from_config(&config.database)
            .await
            .with_context(|| format!("failed to open local store at {}", config.database.url))?;
        let codec = BlobCodec::new(&config.media);
        let local_store = Arc::new(SqliteRecordStore::new(pool.clone(), codec.clone()));
        local_store
            .initialize()
            .await
            .context("failed to migrate local store")?;

        let remote_store: Arc<dyn RemoteRecordStore> =
            match HttpRemoteStore::from_config(&config.remote)? {
                Some(store) => {
                    info!("Remote record store: HTTP");
                    Arc::new(store)
                }
                None => {
                    info!("Remote record store: in-memory (offline mode)");
                    Arc::new(MemoryRemoteStore::new())
                }
            };

        let blob_service: Arc<dyn BlobService> = match HttpBlobService::from_config(&config.remote)?
        {
            Some(service) => {
                info!("Blob service: HTTP");
                Arc::new(service)
            }
            None => Arc::new(
                FsBlobService::new(&config.storage.blob_dir)
                    .context("failed to prepare blob directory")?,
            ),
        };

        let auth = Arc::new(SessionAuthProvider::new());
        let sessions = Arc::new(MediaSessionRegistry::new());
        let metrics = Arc::new(SyncMetrics::new());

        let coordinator = Arc::new(SyncCoordinator::new(
            SyncCollaborators {
                local: Arc::clone(&local_store) as Arc<dyn LocalRecordStore>,
                remote: Arc::clone(&remote_store),
                blobs: Arc::clone(&blob_service),
                auth: Arc::clone(&auth) as Arc<dyn AuthProvider>,
                recovery,
            },
            codec,
            &config.sync,
            Arc::clone(&sessions),
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config: Arc::new(config),
            pool,
            local_store,
            remote_store,
            blob_service,
            auth,
            sessions,
            metrics,
            coordinator,
        })
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::Identity;
    use crate::domain::entities::Record;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_offline_state_wires_local_and_memory_tiers() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.database.url = format!(
            "sqlite://{}?mode=rwc",
            temp_dir.path().join("state.db").display()
        );
        config.storage.blob_dir = temp_dir.path().join("blobs").display().to_string();

        let state = AppState::new(config).await.expect("state");
        assert!(state.local_store.health_check().await.unwrap());

        state.auth.sign_in(Identity::new("owner-1", "Aki")).await;
        let record = Record::draft("owner-1".into(), "Aki".into()).unwrap();
        let outcome = state.coordinator.save(record).await.unwrap();
        assert!(!outcome.remote_synced);
        assert_eq!(state.metrics.snapshot().local_saves, 1);

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.database.url = format!(
            "sqlite://{}?mode=rwc",
            temp_dir.path().join("state.db").display()
        );
        config.remote.blob_upload_base_url = Some("https://upload.example".into());
        assert!(AppState::new(config).await.is_err());
    }
}
