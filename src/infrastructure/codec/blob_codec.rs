use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::entities::{
    EmbeddedMedia, MediaAsset, MediaPayload, StoredAsset, StoredPayload,
};
use crate::domain::value_objects::AssetKind;
use crate::shared::config::MediaConfig;
use crate::shared::AppError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload of {size} bytes exceeds the {limit} byte ceiling")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("embedded payload is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("embedded payload is corrupt: {0}")]
    CorruptPayload(String),
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::PayloadTooLarge { size, limit } => AppError::PayloadTooLarge { size, limit },
            other => AppError::DeserializationError(other.to_string()),
        }
    }
}

/// メディアのバイト列と埋め込み用テキストとの相互変換
#[derive(Debug, Clone)]
pub struct BlobCodec {
    max_video_bytes: usize,
    max_photo_bytes: usize,
    max_audio_bytes: usize,
}

impl BlobCodec {
    pub fn new(media: &MediaConfig) -> Self {
        Self {
            max_video_bytes: media.max_video_bytes,
            max_photo_bytes: media.max_photo_bytes,
            max_audio_bytes: media.max_audio_bytes,
        }
    }

    pub fn limit_for(&self, kind: AssetKind) -> usize {
        match kind {
            AssetKind::Video => self.max_video_bytes,
            AssetKind::Photo => self.max_photo_bytes,
            AssetKind::Audio => self.max_audio_bytes,
        }
    }

    pub fn encode(&self, kind: AssetKind, bytes: &[u8]) -> Result<EmbeddedMedia, CodecError> {
        let limit = self.limit_for(kind);
        if bytes.len() > limit {
            return Err(CodecError::PayloadTooLarge {
                size: bytes.len(),
                limit,
            });
        }

        Ok(EmbeddedMedia {
            data: BASE64_STANDARD.encode(bytes),
            byte_len: bytes.len(),
            sha256: content_sha256(bytes),
        })
    }

    pub fn decode(&self, embedded: &EmbeddedMedia) -> Result<Bytes, CodecError> {
        let bytes = BASE64_STANDARD.decode(embedded.data.as_bytes())?;
        if bytes.len() != embedded.byte_len {
            return Err(CodecError::CorruptPayload(format!(
                "expected {} bytes, decoded {}",
                embedded.byte_len,
                bytes.len()
            )));
        }
        let digest = content_sha256(&bytes);
        if digest != embedded.sha256 {
            return Err(CodecError::CorruptPayload(format!(
                "sha256 mismatch (expected {}, got {digest})",
                embedded.sha256
            )));
        }
        Ok(Bytes::from(bytes))
    }

    /// Live -> Embedded. Embedded and Referenced assets pass through unchanged.
    pub fn embed(&self, asset: &MediaAsset) -> Result<StoredAsset, CodecError> {
        if let MediaPayload::Live(live) = &asset.payload {
            let embedded = self.encode(asset.kind, live.bytes())?;
            return Ok(StoredAsset {
                kind: asset.kind,
                slot_index: asset.slot_index,
                content_type: asset.content_type.clone(),
                payload: StoredPayload::Embedded(embedded),
            });
        }

        asset.to_stored().ok_or_else(|| {
            CodecError::CorruptPayload("asset has no storable representation".to_string())
        })
    }

    /// Raw bytes for an upload; `None` when the asset already points at the blob service.
    pub fn payload_bytes(&self, asset: &MediaAsset) -> Result<Option<Bytes>, CodecError> {
        match &asset.payload {
            MediaPayload::Live(live) => {
                let limit = self.limit_for(asset.kind);
                if live.len() > limit {
                    return Err(CodecError::PayloadTooLarge {
                        size: live.len(),
                        limit,
                    });
                }
                Ok(Some(live.bytes().clone()))
            }
            MediaPayload::Embedded(embedded) => self.decode(embedded).map(Some),
            MediaPayload::Referenced(_) => Ok(None),
        }
    }
}

impl Default for BlobCodec {
    fn default() -> Self {
        Self::new(&MediaConfig::default())
    }
}

pub fn content_sha256(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
