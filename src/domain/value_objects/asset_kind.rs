use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Photo,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Photo => "photo",
            AssetKind::Audio => "audio",
        }
    }

    /// Video is singular; photos and audio tracks occupy ordered slots.
    pub fn is_multi_slot(&self) -> bool {
        !matches!(self, AssetKind::Video)
    }

    pub fn default_content_type(&self) -> &'static str {
        match self {
            AssetKind::Video => "video/mp4",
            AssetKind::Photo => "image/jpeg",
            AssetKind::Audio => "audio/mp4",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            AssetKind::Video => "mp4",
            AssetKind::Photo => "jpg",
            AssetKind::Audio => "m4a",
        }
    }

    /// ファイル拡張子。未知のMIMEは種類ごとの既定値に落とす
    pub fn extension_for(&self, content_type: &str) -> &'static str {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match (self, mime.as_str()) {
            (AssetKind::Photo, "image/jpeg" | "image/jpg") => "jpg",
            (AssetKind::Photo, "image/png") => "png",
            (AssetKind::Photo, "image/heic") => "heic",
            (AssetKind::Video, "video/mp4") => "mp4",
            (AssetKind::Video, "video/quicktime") => "mov",
            (AssetKind::Audio, "audio/mp4" | "audio/m4a" | "audio/x-m4a") => "m4a",
            (AssetKind::Audio, "audio/mpeg") => "mp3",
            (AssetKind::Audio, "audio/wav" | "audio/x-wav") => "wav",
            (AssetKind::Audio, "audio/aac") => "aac",
            _ => self.default_extension(),
        }
    }

    /// Reverse of `extension_for`, used when only a reference URL survived.
    pub fn content_type_for_extension(&self, extension: &str) -> &'static str {
        match (self, extension.to_ascii_lowercase().as_str()) {
            (AssetKind::Photo, "jpg" | "jpeg") => "image/jpeg",
            (AssetKind::Photo, "png") => "image/png",
            (AssetKind::Photo, "heic") => "image/heic",
            (AssetKind::Video, "mp4") => "video/mp4",
            (AssetKind::Video, "mov") => "video/quicktime",
            (AssetKind::Audio, "m4a") => "audio/mp4",
            (AssetKind::Audio, "mp3") => "audio/mpeg",
            (AssetKind::Audio, "wav") => "audio/wav",
            (AssetKind::Audio, "aac") => "audio/aac",
            _ => self.default_content_type(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(AssetKind::Video),
            "photo" => Ok(AssetKind::Photo),
            "audio" => Ok(AssetKind::Audio),
            other => Err(format!("Unknown asset kind: {other}")),
        }
    }
}
