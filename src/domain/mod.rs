pub mod entities;
pub mod value_objects;

pub use entities::{MediaAsset, MediaPayload, PublishBlocker, Record, StoredAsset};
pub use value_objects::{AssetKind, BlobPath, GeoPoint, LifecycleState, RemoteLocation};
