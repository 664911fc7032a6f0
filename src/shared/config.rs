use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub blob_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// ドキュメントストアのベースURL。未設定ならメモリ上のリモートを使う
    #[serde(default)]
    pub records_base_url: Option<String>,
    /// Blob を PUT する先。未設定ならローカルディレクトリへ書き込む
    #[serde(default)]
    pub blob_upload_base_url: Option<String>,
    /// 参照URLの組み立てに使う公開ベースURL
    #[serde(default)]
    pub blob_public_base_url: Option<String>,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub upload_concurrency: usize,
    pub min_media_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub max_video_bytes: usize,
    pub max_photo_bytes: usize,
    pub max_audio_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database: DatabaseConfig {
                url: database_url_for(&data_dir),
                max_connections: 5,
                connection_timeout: 30,
            },
            storage: StorageConfig {
                blob_dir: data_dir.join("blobs").display().to_string(),
                data_dir: data_dir.display().to_string(),
            },
            remote: RemoteConfig {
                records_base_url: None,
                blob_upload_base_url: None,
                blob_public_base_url: None,
                request_timeout: 30,
            },
            sync: SyncConfig {
                upload_concurrency: 4,
                min_media_count: 1,
            },
            media: MediaConfig::default(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_video_bytes: 50 * MIB,
            max_photo_bytes: 10 * MIB,
            max_audio_bytes: 10 * MIB,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        // データディレクトリを変えた場合はDB/Blobの既定パスも追従させる
        if let Some(dir) = lookup("MEDIASYNC_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            let data_dir = PathBuf::from(dir.trim());
            cfg.database.url = database_url_for(&data_dir);
            cfg.storage.blob_dir = data_dir.join("blobs").display().to_string();
            cfg.storage.data_dir = data_dir.display().to_string();
        }
        if let Some(url) = lookup("MEDIASYNC_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            cfg.database.url = url.trim().to_string();
        }
        if let Some(value) = lookup("MEDIASYNC_DB_MAX_CONNECTIONS").and_then(|v| parse_u32(&v)) {
            cfg.database.max_connections = value;
        }
        if let Some(dir) = lookup("MEDIASYNC_BLOB_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.storage.blob_dir = dir.trim().to_string();
        }

        cfg.remote.records_base_url = lookup("MEDIASYNC_REMOTE_URL")
            .and_then(non_empty)
            .or(cfg.remote.records_base_url);
        cfg.remote.blob_upload_base_url = lookup("MEDIASYNC_BLOB_UPLOAD_URL")
            .and_then(non_empty)
            .or(cfg.remote.blob_upload_base_url);
        cfg.remote.blob_public_base_url = lookup("MEDIASYNC_BLOB_PUBLIC_URL")
            .and_then(non_empty)
            .or(cfg.remote.blob_public_base_url);
        if let Some(value) = lookup("MEDIASYNC_HTTP_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.remote.request_timeout = value.max(1);
        }

        if let Some(value) = lookup("MEDIASYNC_UPLOAD_CONCURRENCY").and_then(|v| parse_usize(&v))
        {
            cfg.sync.upload_concurrency = value.max(1);
        }
        if let Some(value) = lookup("MEDIASYNC_MIN_MEDIA_COUNT").and_then(|v| parse_usize(&v)) {
            cfg.sync.min_media_count = value;
        }

        if let Some(value) = lookup("MEDIASYNC_MAX_VIDEO_BYTES").and_then(|v| parse_usize(&v)) {
            cfg.media.max_video_bytes = value;
        }
        if let Some(value) = lookup("MEDIASYNC_MAX_PHOTO_BYTES").and_then(|v| parse_usize(&v)) {
            cfg.media.max_photo_bytes = value;
        }
        if let Some(value) = lookup("MEDIASYNC_MAX_AUDIO_BYTES").and_then(|v| parse_usize(&v)) {
            cfg.media.max_audio_bytes = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.upload_concurrency == 0 {
            return Err("Sync upload_concurrency must be greater than 0".to_string());
        }
        if self.media.max_video_bytes == 0
            || self.media.max_photo_bytes == 0
            || self.media.max_audio_bytes == 0
        {
            return Err("Media size ceilings must be greater than 0".to_string());
        }
        if self.remote.blob_upload_base_url.is_some() && self.remote.blob_public_base_url.is_none()
        {
            return Err(
                "Remote blob_public_base_url is required when blob_upload_base_url is set"
                    .to_string(),
            );
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("mediasync"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn database_url_for(data_dir: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("mediasync.db").display())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.media.max_audio_bytes, 10 * MIB);
        assert_eq!(cfg.sync.min_media_count, 1);
        assert!(cfg.remote.records_base_url.is_none());
    }

    #[test]
    fn data_dir_override_moves_database_and_blobs() {
        let cfg = config_from(&[("MEDIASYNC_DATA_DIR", "/tmp/mediasync-test")]);
        assert_eq!(cfg.storage.data_dir, "/tmp/mediasync-test");
        assert_eq!(
            cfg.database.url,
            "sqlite:///tmp/mediasync-test/mediasync.db?mode=rwc"
        );
        assert_eq!(cfg.storage.blob_dir, "/tmp/mediasync-test/blobs");
    }

    #[test]
    fn numeric_overrides_are_clamped_and_invalid_values_ignored() {
        let cfg = config_from(&[
            ("MEDIASYNC_UPLOAD_CONCURRENCY", "0"),
            ("MEDIASYNC_MIN_MEDIA_COUNT", "3"),
            ("MEDIASYNC_MAX_AUDIO_BYTES", "not-a-number"),
            ("MEDIASYNC_HTTP_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(cfg.sync.upload_concurrency, 1);
        assert_eq!(cfg.sync.min_media_count, 3);
        assert_eq!(cfg.media.max_audio_bytes, 10 * MIB);
        assert_eq!(cfg.remote.request_timeout, 1);
    }

    #[test]
    fn blob_upload_url_requires_public_url() {
        let cfg = config_from(&[("MEDIASYNC_BLOB_UPLOAD_URL", "https://blobs.example/upload")]);
        assert!(cfg.validate().is_err());

        let cfg = config_from(&[
            ("MEDIASYNC_BLOB_UPLOAD_URL", "https://blobs.example/upload"),
            ("MEDIASYNC_BLOB_PUBLIC_URL", "https://cdn.example"),
        ]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blank_remote_url_is_ignored() {
        let cfg = config_from(&[("MEDIASYNC_REMOTE_URL", "   ")]);
        assert!(cfg.remote.records_base_url.is_none());
    }
}
