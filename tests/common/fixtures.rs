use super::mocks::{FlakyBlobService, FlakyRemoteStore, RecordingRecovery};
use bytes::Bytes;
use mediasync::shared::config::{MediaConfig, SyncConfig};
use mediasync::{
    AuthProvider, BlobCodec, BlobService, ConnectionPool, GeoPoint, Identity, LocalRecordStore,
    MediaSessionRegistry, Record, RecordRecovery, RemoteRecordStore, SessionAuthProvider,
    SqliteRecordStore, SyncCollaborators, SyncCoordinator, SyncMetrics,
};
use std::sync::Arc;
use tempfile::TempDir;

pub const OWNER: &str = "owner-1";
pub const OWNER_NAME: &str = "Aki";

pub struct Engine {
    pub coordinator: Arc<SyncCoordinator>,
    pub local: Arc<SqliteRecordStore>,
    pub remote: Arc<FlakyRemoteStore>,
    pub blobs: Arc<FlakyBlobService>,
    pub auth: Arc<SessionAuthProvider>,
    pub recovery: Arc<RecordingRecovery>,
    pub dir: TempDir,
}

pub struct EngineOptions {
    pub signed_in: bool,
    pub media: MediaConfig,
    pub recovery: RecordingRecovery,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            signed_in: true,
            media: MediaConfig::default(),
            recovery: RecordingRecovery::default(),
        }
    }
}

pub async fn engine() -> Engine {
    engine_with(EngineOptions::default()).await
}

pub async fn engine_with(options: EngineOptions) -> Engine {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("records.db").display());
    let pool = ConnectionPool::new(&url).await.expect("pool");
    let codec = BlobCodec::new(&options.media);
    let local = Arc::new(SqliteRecordStore::new(pool, codec.clone()));
    local.initialize().await.expect("migrate");

    let remote = Arc::new(FlakyRemoteStore::new());
    remote.watch_local(Arc::clone(&local) as Arc<dyn LocalRecordStore>);
    let blobs = Arc::new(FlakyBlobService::new(&dir.path().join("blobs")));
    let auth = Arc::new(if options.signed_in {
        SessionAuthProvider::signed_in(Identity::new(OWNER, OWNER_NAME))
    } else {
        SessionAuthProvider::new()
    });
    let recovery = Arc::new(options.recovery);

    let coordinator = Arc::new(SyncCoordinator::new(
        SyncCollaborators {
            local: Arc::clone(&local) as Arc<dyn LocalRecordStore>,
            remote: Arc::clone(&remote) as Arc<dyn RemoteRecordStore>,
            blobs: Arc::clone(&blobs) as Arc<dyn BlobService>,
            auth: Arc::clone(&auth) as Arc<dyn AuthProvider>,
            recovery: Arc::clone(&recovery) as Arc<dyn RecordRecovery>,
        },
        codec,
        &SyncConfig {
            upload_concurrency: 3,
            min_media_count: 1,
        },
        Arc::new(MediaSessionRegistry::new()),
        Arc::new(SyncMetrics::new()),
    ));

    Engine {
        coordinator,
        local,
        remote,
        blobs,
        auth,
        recovery,
        dir,
    }
}

/// A draft that passes every publishability check, with one live photo.
pub fn publishable_draft(id: &str) -> Record {
    let mut record = Record::new(id.to_string(), OWNER.to_string(), OWNER_NAME.to_string())
        .expect("record");
    record.set_title("Harbor at dawn");
    record.set_description("Fishing boats heading out");
    record.set_categories(["sea", "morning"]);
    record.set_location(Some(GeoPoint::new(35.44, 139.64).expect("location")));
    record.attach_photo(0, "image/jpeg", Bytes::from_static(b"\xff\xd8jpeg-bytes"));
    record
}
