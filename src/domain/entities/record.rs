use super::media_asset::MediaAsset;
use crate::domain::value_objects::blob_path::validate_segment;
use crate::domain::value_objects::{AssetKind, GeoPoint, LifecycleState};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub lifecycle_state: LifecycleState,
    pub title: String,
    pub description: String,
    pub categories: BTreeSet<String>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assets: Vec<MediaAsset>,
    pub remote_synced_at: Option<DateTime<Utc>>,
}

/// Why a record cannot be posted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishBlocker {
    MissingTitle,
    MissingDescription,
    MissingCategory,
    MissingLocation,
    NotEnoughMedia { required: usize, present: usize },
}

impl fmt::Display for PublishBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishBlocker::MissingTitle => f.write_str("title is required"),
            PublishBlocker::MissingDescription => f.write_str("description is required"),
            PublishBlocker::MissingCategory => f.write_str("at least one category is required"),
            PublishBlocker::MissingLocation => f.write_str("location is required"),
            PublishBlocker::NotEnoughMedia { required, present } => {
                write!(f, "at least {required} media assets are required ({present} attached)")
            }
        }
    }
}

impl Record {
    pub fn new(id: String, owner_id: String, owner_name: String) -> Result<Self, String> {
        validate_segment("Record id", &id)?;
        validate_segment("Record owner", &owner_id)?;
        let now = Utc::now();
        Ok(Self {
            id,
            owner_id,
            owner_name,
            lifecycle_state: LifecycleState::Draft,
            title: String::new(),
            description: String::new(),
            categories: BTreeSet::new(),
            location: None,
            created_at: now,
            updated_at: now,
            assets: Vec::new(),
            remote_synced_at: None,
        })
    }

    /// 新規下書き。IDはクライアント側で払い出す
    pub fn draft(owner_id: String, owner_name: String) -> Result<Self, String> {
        Self::new(uuid::Uuid::new_v4().to_string(), owner_id, owner_name)
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        // 同一ミリ秒内の連続更新でも updated_at が後退しないように
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::milliseconds(1)
        };
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn set_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories
            .into_iter()
            .map(Into::into)
            .map(|category: String| category.trim().to_string())
            .filter(|category| !category.is_empty())
            .collect();
        self.touch();
    }

    pub fn add_category(&mut self, category: impl Into<String>) {
        let category = category.into().trim().to_string();
        if !category.is_empty() && self.categories.insert(category) {
            self.touch();
        }
    }

    pub fn set_location(&mut self, location: Option<GeoPoint>) {
        self.location = location;
        self.touch();
    }

    /// Puts an asset into its slot, replacing whatever occupied it.
    pub fn attach(&mut self, asset: MediaAsset) {
        let slot = asset.slot();
        self.assets.retain(|existing| existing.slot() != slot);
        self.assets.push(asset);
        self.assets.sort_by_key(|asset| asset.slot());
        self.touch();
    }

    pub fn attach_video(&mut self, content_type: &str, bytes: impl Into<Bytes>) {
        self.attach(MediaAsset::live(
            AssetKind::Video,
            0,
            content_type,
            bytes.into(),
        ));
    }

    pub fn attach_photo(&mut self, slot_index: u32, content_type: &str, bytes: impl Into<Bytes>) {
        self.attach(MediaAsset::live(
            AssetKind::Photo,
            slot_index,
            content_type,
            bytes.into(),
        ));
    }

    pub fn attach_audio(&mut self, slot_index: u32, content_type: &str, bytes: impl Into<Bytes>) {
        self.attach(MediaAsset::live(
            AssetKind::Audio,
            slot_index,
            content_type,
            bytes.into(),
        ));
    }

    pub fn remove_asset(&mut self, kind: AssetKind, slot_index: u32) -> Option<MediaAsset> {
        let position = self
            .assets
            .iter()
            .position(|asset| asset.slot() == (kind, slot_index))?;
        let removed = self.assets.remove(position);
        self.touch();
        Some(removed)
    }

    pub fn video(&self) -> Option<&MediaAsset> {
        self.assets
            .iter()
            .find(|asset| asset.kind == AssetKind::Video)
    }

    pub fn assets_of(&self, kind: AssetKind) -> impl Iterator<Item = &MediaAsset> {
        self.assets.iter().filter(move |asset| asset.kind == kind)
    }

    pub fn media_count(&self) -> usize {
        self.assets.len()
    }

    pub fn has_unreferenced_assets(&self) -> bool {
        self.assets.iter().any(|asset| !asset.is_referenced())
    }

    pub fn publish_blockers(&self, min_media: usize) -> Vec<PublishBlocker> {
        let mut blockers = Vec::new();
        if self.title.trim().is_empty() {
            blockers.push(PublishBlocker::MissingTitle);
        }
        if self.description.trim().is_empty() {
            blockers.push(PublishBlocker::MissingDescription);
        }
        if self.categories.is_empty() {
            blockers.push(PublishBlocker::MissingCategory);
        }
        if self.location.is_none() {
            blockers.push(PublishBlocker::MissingLocation);
        }
        if self.media_count() < min_media {
            blockers.push(PublishBlocker::NotEnoughMedia {
                required: min_media,
                present: self.media_count(),
            });
        }
        blockers
    }

    pub fn is_publishable(&self, min_media: usize) -> bool {
        self.publish_blockers(min_media).is_empty()
    }
}
