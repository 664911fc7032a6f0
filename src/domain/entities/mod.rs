pub mod media_asset;
pub mod record;

pub use media_asset::{
    EmbeddedMedia, LiveMedia, MediaAsset, MediaPayload, StoredAsset, StoredPayload,
};
pub use record::{PublishBlocker, Record};
