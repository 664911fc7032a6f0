use crate::domain::value_objects::AssetKind;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// In-memory media handle. Only lives as long as the process; never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct LiveMedia {
    bytes: Bytes,
}

impl LiveMedia {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for LiveMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveMedia")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Self-contained text form stored inside a local row.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedMedia {
    pub data: String,
    pub byte_len: usize,
    pub sha256: String,
}

impl fmt::Debug for EmbeddedMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedMedia")
            .field("byte_len", &self.byte_len)
            .field("sha256", &self.sha256)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Live(LiveMedia),
    Embedded(EmbeddedMedia),
    Referenced(String),
}

/// Persistable payload. There is no live variant, so a handle cannot reach disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum StoredPayload {
    Embedded(EmbeddedMedia),
    Referenced { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub kind: AssetKind,
    pub slot_index: u32,
    pub content_type: String,
    pub payload: MediaPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    pub kind: AssetKind,
    pub slot_index: u32,
    pub content_type: String,
    pub payload: StoredPayload,
}

impl MediaPayload {
    pub fn form(&self) -> &'static str {
        match self {
            MediaPayload::Live(_) => "live",
            MediaPayload::Embedded(_) => "embedded",
            MediaPayload::Referenced(_) => "referenced",
        }
    }
}

impl MediaAsset {
    pub fn live(kind: AssetKind, slot_index: u32, content_type: &str, bytes: Bytes) -> Self {
        Self {
            kind,
            slot_index: if kind.is_multi_slot() { slot_index } else { 0 },
            content_type: content_type.to_string(),
            payload: MediaPayload::Live(LiveMedia::new(bytes)),
        }
    }

    pub fn referenced(kind: AssetKind, slot_index: u32, content_type: &str, url: &str) -> Self {
        Self {
            kind,
            slot_index: if kind.is_multi_slot() { slot_index } else { 0 },
            content_type: content_type.to_string(),
            payload: MediaPayload::Referenced(url.to_string()),
        }
    }

    pub fn slot(&self) -> (AssetKind, u32) {
        (self.kind, self.slot_index)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.payload, MediaPayload::Live(_))
    }

    pub fn is_referenced(&self) -> bool {
        matches!(self.payload, MediaPayload::Referenced(_))
    }

    pub fn reference_url(&self) -> Option<&str> {
        match &self.payload {
            MediaPayload::Referenced(url) => Some(url.as_str()),
            _ => None,
        }
    }

    /// Live/Embedded -> Referenced once the blob upload is confirmed.
    pub fn into_referenced(self, url: String) -> Self {
        Self {
            payload: MediaPayload::Referenced(url),
            ..self
        }
    }

    /// Embedded -> stored, Referenced -> stored; Live has to go through the codec first.
    pub fn to_stored(&self) -> Option<StoredAsset> {
        let payload = match &self.payload {
            MediaPayload::Live(_) => return None,
            MediaPayload::Embedded(embedded) => StoredPayload::Embedded(embedded.clone()),
            MediaPayload::Referenced(url) => StoredPayload::Referenced { url: url.clone() },
        };
        Some(StoredAsset {
            kind: self.kind,
            slot_index: self.slot_index,
            content_type: self.content_type.clone(),
            payload,
        })
    }
}

impl From<StoredAsset> for MediaAsset {
    fn from(stored: StoredAsset) -> Self {
        let payload = match stored.payload {
            StoredPayload::Embedded(embedded) => MediaPayload::Embedded(embedded),
            StoredPayload::Referenced { url } => MediaPayload::Referenced(url),
        };
        Self {
            kind: stored.kind,
            slot_index: stored.slot_index,
            content_type: stored.content_type,
            payload,
        }
    }
}
