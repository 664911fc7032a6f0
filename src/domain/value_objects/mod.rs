pub mod asset_kind;
pub mod blob_path;
pub mod geo_point;
pub mod lifecycle;

pub use asset_kind::AssetKind;
pub use blob_path::BlobPath;
pub use geo_point::GeoPoint;
pub use lifecycle::{LifecycleState, RemoteLocation};
