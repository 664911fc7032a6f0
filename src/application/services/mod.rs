pub mod lifecycle;
pub mod media_session;
pub mod sync_coordinator;
pub mod upload_pipeline;

pub use lifecycle::LifecyclePolicy;
pub use media_session::{MediaSession, MediaSessionRegistry, SessionMode};
pub use sync_coordinator::{
    DeleteOutcome, LoadSource, LoadedRecord, ReconcileReport, SaveOutcome, SaveStage,
    SyncCollaborators, SyncCoordinator,
};
pub use upload_pipeline::UploadPipeline;
