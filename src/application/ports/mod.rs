pub mod auth;
pub mod blob_service;
pub mod local_store;
pub mod recovery;
pub mod remote_store;

pub use auth::{AuthProvider, Identity};
pub use blob_service::BlobService;
pub use local_store::LocalRecordStore;
pub use recovery::{NoopRecovery, RecordRecovery};
pub use remote_store::{RemoteEntry, RemoteRecordDocument, RemoteRecordStore};
