use super::ConnectionPool;
use crate::application::ports::LocalRecordStore;
use crate::domain::entities::{MediaAsset, Record, StoredAsset};
use crate::domain::value_objects::LifecycleState;
use crate::infrastructure::codec::BlobCodec;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error};

mod mapper;
mod queries;

use mapper::map_record_row;
use queries::{
    DELETE_RECORD, MARK_REMOTE_SYNCED, SELECT_ALL_RECORDS, SELECT_RECORDS_BY_OWNER,
    SELECT_RECORDS_BY_OWNER_AND_STATE, SELECT_RECORD_BY_ID, UPSERT_RECORD,
};

/// SQLite-backed local tier. Live media is embedded through the codec before it is written.
pub struct SqliteRecordStore {
    pool: ConnectionPool,
    codec: BlobCodec,
}

impl SqliteRecordStore {
    pub fn new(pool: ConnectionPool, codec: BlobCodec) -> Self {
        Self { pool, codec }
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        self.pool.migrate().await
    }

    pub async fn health_check(&self) -> Result<bool, AppError> {
        let result = sqlx::query("SELECT 1")
            .fetch_one(self.pool.get_pool())
            .await;
        Ok(result.is_ok())
    }

    fn stored_assets(&self, record: &Record) -> Result<Vec<StoredAsset>, AppError> {
        record
            .assets
            .iter()
            .map(|asset| self.codec.embed(asset).map_err(AppError::from))
            .collect()
    }

    async fn upsert(&self, record: &Record) -> Result<(), AppError> {
        let stored_assets = self.stored_assets(record)?;
        let assets_json = serde_json::to_string(&stored_assets)?;
        let categories_json = serde_json::to_string(&record.categories)?;

        sqlx::query(UPSERT_RECORD)
            .bind(&record.id)
            .bind(&record.owner_id)
            .bind(&record.owner_name)
            .bind(record.lifecycle_state.as_str())
            .bind(&record.title)
            .bind(&record.description)
            .bind(categories_json)
            .bind(record.location.map(|point| point.lat()))
            .bind(record.location.map(|point| point.lon()))
            .bind(assets_json)
            .bind(record.created_at.timestamp_millis())
            .bind(record.updated_at.timestamp_millis())
            .bind(record.remote_synced_at.map(|at| at.timestamp_millis()))
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Record>, AppError> {
        let row = sqlx::query(SELECT_RECORD_BY_ID)
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.as_ref().map(map_record_row).transpose()
    }
}

/// ローカル層の失敗は LocalStoreUnavailable に寄せる。サイズ超過だけは呼び出し側で扱えるよう残す
fn local_failure(err: AppError) -> AppError {
    match err {
        AppError::PayloadTooLarge { .. } | AppError::LocalStoreUnavailable(_) => err,
        other => AppError::LocalStoreUnavailable(other.to_string()),
    }
}

#[async_trait]
impl LocalRecordStore for SqliteRecordStore {
    async fn put(&self, record: &Record) -> Result<Record, AppError> {
        if let Err(err) = self.upsert(record).await {
            error!(record_id = %record.id, "Failed to persist record locally: {}", err);
            return Err(local_failure(err));
        }
        debug!(
            record_id = %record.id,
            state = %record.lifecycle_state,
            assets = record.assets.len(),
            "Record persisted locally"
        );

        self.fetch_by_id(&record.id)
            .await
            .map_err(local_failure)?
            .ok_or_else(|| {
                AppError::LocalStoreUnavailable(format!("record {} vanished after write", record.id))
            })
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, AppError> {
        self.fetch_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query(SELECT_ALL_RECORDS)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.iter().map(map_record_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(DELETE_RECORD)
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        state: Option<LifecycleState>,
    ) -> Result<Vec<Record>, AppError> {
        let rows = match state {
            Some(state) => {
                sqlx::query(SELECT_RECORDS_BY_OWNER_AND_STATE)
                    .bind(owner_id)
                    .bind(state.as_str())
                    .fetch_all(self.pool.get_pool())
                    .await?
            }
            None => {
                sqlx::query(SELECT_RECORDS_BY_OWNER)
                    .bind(owner_id)
                    .fetch_all(self.pool.get_pool())
                    .await?
            }
        };
        rows.iter().map(map_record_row).collect()
    }

    async fn mark_remote_synced(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query(MARK_REMOTE_SYNCED)
            .bind(id)
            .bind(at.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("record {id}")));
        }
        Ok(())
    }
}

/// Decodes every embedded asset back to live bytes, e.g. before handing media to a player.
pub fn hydrate_assets(codec: &BlobCodec, record: &Record) -> Result<Vec<MediaAsset>, AppError> {
    record
        .assets
        .iter()
        .map(|asset| match codec.payload_bytes(asset)? {
            Some(bytes) if !asset.is_live() => Ok(MediaAsset::live(
                asset.kind,
                asset.slot_index,
                &asset.content_type,
                bytes,
            )),
            _ => Ok(asset.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::MediaPayload;
    use crate::domain::value_objects::{AssetKind, GeoPoint};
    use crate::shared::config::MediaConfig;
    use bytes::Bytes;

    async fn setup_store() -> SqliteRecordStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        let store = SqliteRecordStore::new(pool, BlobCodec::default());
        store.initialize().await.unwrap();
        store
    }

    fn record(id: &str, owner: &str) -> Record {
        Record::new(id.to_string(), owner.to_string(), "Owner".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_put_embeds_live_media_and_get_decodes_it() {
        let store = setup_store().await;
        let mut draft = record("rec-1", "owner-1");
        draft.set_title("Harbor");
        draft.set_categories(["sea"]);
        draft.set_location(Some(GeoPoint::new(35.0, 139.0).unwrap()));
        draft.attach_photo(0, "image/png", Bytes::from_static(b"png-bytes"));

        let stored = store.put(&draft).await.unwrap();
        assert!(matches!(stored.assets[0].payload, MediaPayload::Embedded(_)));
        assert_eq!(stored.title, "Harbor");
        assert_eq!(stored.location, draft.location);

        let loaded = store.get("rec-1").await.unwrap().expect("record");
        assert_eq!(loaded, stored);

        let hydrated = hydrate_assets(&BlobCodec::default(), &loaded).unwrap();
        match &hydrated[0].payload {
            MediaPayload::Live(live) => assert_eq!(live.bytes().as_ref(), b"png-bytes"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_put_upserts_by_id() {
        let store = setup_store().await;
        let mut draft = record("rec-1", "owner-1");
        store.put(&draft).await.unwrap();
        draft.set_title("Renamed");
        store.put(&draft).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Renamed");
    }

    #[tokio::test]
    async fn test_oversized_media_keeps_payload_error() {
        let pool = ConnectionPool::from_memory().await.unwrap();
        let codec = BlobCodec::new(&MediaConfig {
            max_video_bytes: 8,
            max_photo_bytes: 8,
            max_audio_bytes: 8,
        });
        let store = SqliteRecordStore::new(pool, codec);
        store.initialize().await.unwrap();

        let mut draft = record("rec-big", "owner-1");
        draft.attach_video("video/mp4", vec![0u8; 9]);
        let err = store.put(&draft).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { size: 9, limit: 8 }));
        assert!(store.get("rec-big").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_owner_filters_state() {
        let store = setup_store().await;
        let mut posted = record("rec-a", "owner-1");
        posted.lifecycle_state = LifecycleState::Posted;
        store.put(&posted).await.unwrap();
        store.put(&record("rec-b", "owner-1")).await.unwrap();
        store.put(&record("rec-c", "owner-2")).await.unwrap();

        let mine = store.list_by_owner("owner-1", None).await.unwrap();
        assert_eq!(mine.len(), 2);

        let drafts = store
            .list_by_owner("owner-1", Some(LifecycleState::Draft))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, "rec-b");
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = setup_store().await;
        store.put(&record("rec-1", "owner-1")).await.unwrap();
        assert!(store.delete("rec-1").await.unwrap());
        assert!(!store.delete("rec-1").await.unwrap());
        assert!(store.get("rec-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_remote_synced_survives_later_upserts() {
        let store = setup_store().await;
        let draft = record("rec-1", "owner-1");
        store.put(&draft).await.unwrap();

        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        store.mark_remote_synced("rec-1", at).await.unwrap();
        // remote_synced_at を持たない上書きでは消えない
        store.put(&draft).await.unwrap();

        let loaded = store.get("rec-1").await.unwrap().unwrap();
        assert_eq!(loaded.remote_synced_at, Some(at));
        assert!(matches!(
            store.mark_remote_synced("missing", at).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_referenced_assets_are_stored_as_urls() {
        let store = setup_store().await;
        let mut draft = record("rec-1", "owner-1");
        draft.attach(MediaAsset::referenced(
            AssetKind::Audio,
            0,
            "audio/mp4",
            "https://cdn.example/owner-1/rec-1/audio_0.m4a",
        ));
        let stored = store.put(&draft).await.unwrap();
        assert_eq!(
            stored.assets[0].reference_url(),
            Some("https://cdn.example/owner-1/rec-1/audio_0.m4a")
        );
    }
}
