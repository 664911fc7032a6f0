use crate::application::ports::remote_store::{RemoteEntry, RemoteRecordDocument};
use crate::domain::entities::{MediaAsset, Record};
use crate::domain::value_objects::{AssetKind, BlobPath, GeoPoint};
use crate::shared::error::AppError;
use std::collections::BTreeSet;
use tracing::warn;

/// Builds the wire document. Every asset must already be referenced; embedded
/// or live media never leaves the device through this path.
pub fn record_to_document(record: &Record) -> Result<RemoteRecordDocument, AppError> {
    if let Some(asset) = record.assets.iter().find(|asset| !asset.is_referenced()) {
        return Err(AppError::Internal(format!(
            "record {} still holds {} media for {}_{}; upload it before the remote write",
            record.id,
            asset.payload.form(),
            asset.kind,
            asset.slot_index
        )));
    }

    let urls_of = |kind: AssetKind| -> Vec<String> {
        record
            .assets_of(kind)
            .filter_map(|asset| asset.reference_url().map(str::to_string))
            .collect()
    };

    Ok(RemoteRecordDocument {
        id: record.id.clone(),
        title: record.title.clone(),
        description: record.description.clone(),
        username: record.owner_name.clone(),
        user_id: record.owner_id.clone(),
        categories: record.categories.iter().cloned().collect(),
        latitude: record.location.map(|point| point.lat()),
        longitude: record.location.map(|point| point.lon()),
        video_url: record
            .video()
            .and_then(|asset| asset.reference_url().map(str::to_string)),
        photo_urls: urls_of(AssetKind::Photo),
        audio_urls: urls_of(AssetKind::Audio),
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// リモートの文書からローカル用レコードを復元する。状態は保存先から決まる
pub fn entry_to_record(entry: &RemoteEntry) -> Record {
    let document = &entry.document;

    let location = match (document.latitude, document.longitude) {
        (Some(lat), Some(lon)) => match GeoPoint::new(lat, lon) {
            Ok(point) => Some(point),
            Err(err) => {
                warn!(record_id = %document.id, "dropping remote location: {err}");
                None
            }
        },
        _ => None,
    };

    let mut assets = Vec::new();
    if let Some(url) = document.video_url.as_deref() {
        assets.push(referenced_asset(AssetKind::Video, 0, url));
    }
    assets.extend(slotted_assets(AssetKind::Photo, &document.photo_urls));
    assets.extend(slotted_assets(AssetKind::Audio, &document.audio_urls));
    assets.sort_by_key(|asset| asset.slot());

    Record {
        id: document.id.clone(),
        owner_id: document.user_id.clone(),
        owner_name: document.username.clone(),
        lifecycle_state: entry.location.implied_state(),
        title: document.title.clone(),
        description: document.description.clone(),
        categories: document.categories.iter().cloned().collect::<BTreeSet<_>>(),
        location,
        created_at: document.created_at,
        updated_at: document.updated_at,
        assets,
        remote_synced_at: Some(document.updated_at),
    }
}

/// スロット番号はファイル名 `{kind}_{slot}` から復元し、読めない場合だけ配列位置を使う
fn slotted_assets(kind: AssetKind, urls: &[String]) -> Vec<MediaAsset> {
    let mut taken = BTreeSet::new();
    let named: Vec<Option<u32>> = urls
        .iter()
        .map(|url| match BlobPath::parse_slot(url) {
            Some((found, slot)) if found == kind && taken.insert(slot) => Some(slot),
            _ => None,
        })
        .collect();

    urls.iter()
        .zip(named)
        .enumerate()
        .map(|(position, (url, slot))| {
            let slot = slot.unwrap_or_else(|| {
                let mut candidate = position as u32;
                while !taken.insert(candidate) {
                    candidate += 1;
                }
                candidate
            });
            referenced_asset(kind, slot, url)
        })
        .collect()
}

fn referenced_asset(kind: AssetKind, slot_index: u32, url: &str) -> MediaAsset {
    let content_type = kind.content_type_for_extension(url_extension(url));
    MediaAsset::referenced(kind, slot_index, content_type, url)
}

fn url_extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, extension)) => extension,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{LifecycleState, RemoteLocation};
    use bytes::Bytes;

    fn published_record() -> Record {
        let mut record = Record::new(
            "rec-1".to_string(),
            "owner-1".to_string(),
            "Aki".to_string(),
        )
        .unwrap();
        record.set_title("Harbor");
        record.set_description("Morning walk");
        record.set_categories(["walks", "sea"]);
        record.set_location(Some(GeoPoint::new(35.4, 139.6).unwrap()));
        record.attach(MediaAsset::referenced(
            AssetKind::Photo,
            1,
            "image/png",
            "https://cdn.example/owner-1/rec-1/photo_1.png",
        ));
        record.attach(MediaAsset::referenced(
            AssetKind::Photo,
            0,
            "image/jpeg",
            "https://cdn.example/owner-1/rec-1/photo_0.jpg",
        ));
        record.attach(MediaAsset::referenced(
            AssetKind::Video,
            0,
            "video/mp4",
            "https://cdn.example/owner-1/rec-1/video_0.mp4",
        ));
        record.lifecycle_state = LifecycleState::Posted;
        record
    }

    #[test]
    fn document_carries_references_in_slot_order() {
        let document = record_to_document(&published_record()).expect("document");
        assert_eq!(document.user_id, "owner-1");
        assert_eq!(document.username, "Aki");
        assert_eq!(
            document.video_url.as_deref(),
            Some("https://cdn.example/owner-1/rec-1/video_0.mp4")
        );
        assert_eq!(
            document.photo_urls,
            vec![
                "https://cdn.example/owner-1/rec-1/photo_0.jpg".to_string(),
                "https://cdn.example/owner-1/rec-1/photo_1.png".to_string(),
            ]
        );
        assert!(document.audio_urls.is_empty());
        assert_eq!(document.categories, vec!["sea".to_string(), "walks".to_string()]);
    }

    #[test]
    fn unuploaded_media_is_refused() {
        let mut record = published_record();
        record.attach_audio(0, "audio/mp4", Bytes::from_static(b"raw"));
        assert!(matches!(
            record_to_document(&record),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn wire_format_uses_expected_keys() {
        let document = record_to_document(&published_record()).expect("document");
        let json = serde_json::to_value(&document).unwrap();
        for key in [
            "id",
            "title",
            "description",
            "username",
            "userID",
            "categories",
            "latitude",
            "longitude",
            "videoURL",
            "photoURLs",
            "audioURLs",
            "createdAt",
            "updatedAt",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json.as_object().unwrap().len(), 13);
    }

    #[test]
    fn entry_roundtrips_scalars_and_infers_state() {
        let record = published_record();
        let entry = RemoteEntry {
            location: RemoteLocation::Public,
            document: record_to_document(&record).unwrap(),
        };
        let restored = entry_to_record(&entry);
        assert_eq!(restored.lifecycle_state, LifecycleState::Posted);
        assert_eq!(restored.title, record.title);
        assert_eq!(restored.categories, record.categories);
        assert_eq!(restored.location, record.location);
        assert_eq!(restored.updated_at, record.updated_at);
        assert_eq!(restored.assets, record.assets);
    }

    #[test]
    fn entry_keeps_slots_named_in_blob_urls() {
        let mut document = record_to_document(&published_record()).unwrap();
        document.photo_urls = vec![
            "https://cdn.example/owner-1/rec-1/photo_0.jpg".to_string(),
            "https://cdn.example/owner-1/rec-1/photo_2.jpg".to_string(),
        ];
        document.audio_urls = vec![
            "https://cdn.example/owner-1/rec-1/memo.m4a".to_string(),
            "https://cdn.example/owner-1/rec-1/audio_0.m4a".to_string(),
        ];
        let restored = entry_to_record(&RemoteEntry {
            location: RemoteLocation::Private,
            document,
        });

        let photos: Vec<(u32, &str)> = restored
            .assets_of(AssetKind::Photo)
            .map(|asset| (asset.slot_index, asset.reference_url().unwrap()))
            .collect();
        assert_eq!(
            photos,
            vec![
                (0, "https://cdn.example/owner-1/rec-1/photo_0.jpg"),
                (2, "https://cdn.example/owner-1/rec-1/photo_2.jpg"),
            ]
        );

        // 名前から読めないURLは空いているスロットへ
        let audio: Vec<(u32, &str)> = restored
            .assets_of(AssetKind::Audio)
            .map(|asset| (asset.slot_index, asset.reference_url().unwrap()))
            .collect();
        assert_eq!(
            audio,
            vec![
                (0, "https://cdn.example/owner-1/rec-1/audio_0.m4a"),
                (1, "https://cdn.example/owner-1/rec-1/memo.m4a"),
            ]
        );
    }

    #[test]
    fn url_extension_ignores_query() {
        assert_eq!(url_extension("https://cdn/x/photo_0.png?sig=abc"), "png");
        assert_eq!(url_extension("file:///tmp/blobs/o/r/audio_0.m4a"), "m4a");
        assert_eq!(url_extension("https://cdn/x/noext"), "");
    }
}
