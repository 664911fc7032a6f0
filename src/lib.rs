pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{
    AuthProvider, BlobService, Identity, LocalRecordStore, NoopRecovery, RecordRecovery,
    RemoteEntry, RemoteRecordDocument, RemoteRecordStore,
};
pub use application::services::{
    DeleteOutcome, LifecyclePolicy, LoadSource, LoadedRecord, MediaSession, MediaSessionRegistry,
    ReconcileReport, SaveOutcome, SaveStage, SessionMode, SyncCollaborators, SyncCoordinator,
    UploadPipeline,
};
pub use domain::entities::{MediaAsset, MediaPayload, PublishBlocker, Record};
pub use domain::value_objects::{AssetKind, BlobPath, GeoPoint, LifecycleState, RemoteLocation};
pub use infrastructure::auth::SessionAuthProvider;
pub use infrastructure::blob::{FsBlobService, HttpBlobService};
pub use infrastructure::codec::{BlobCodec, CodecError};
pub use infrastructure::database::{ConnectionPool, SqliteRecordStore};
pub use infrastructure::metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use infrastructure::remote::{HttpRemoteStore, MemoryRemoteStore};
pub use shared::{AppConfig, AppError};
pub use state::AppState;

/// `MEDIASYNC_LOG`、なければ `RUST_LOG` でフィルタを決める
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_env("MEDIASYNC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("mediasync=debug,info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
