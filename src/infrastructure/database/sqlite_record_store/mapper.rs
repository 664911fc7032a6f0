use crate::domain::entities::{MediaAsset, Record, StoredAsset};
use crate::domain::value_objects::{GeoPoint, LifecycleState};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use std::collections::BTreeSet;

pub(super) fn map_record_row(row: &SqliteRow) -> Result<Record, AppError> {
    let id: String = row.try_get("id")?;
    let state_raw: String = row.try_get("lifecycle_state")?;
    let lifecycle_state = state_raw
        .parse::<LifecycleState>()
        .map_err(|err| AppError::DeserializationError(format!("record {id}: {err}")))?;

    let categories_json: String = row.try_get("categories")?;
    let categories: BTreeSet<String> = serde_json::from_str(&categories_json).map_err(|err| {
        AppError::DeserializationError(format!("record {id}: invalid categories: {err}"))
    })?;

    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;
    let location = match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(
            GeoPoint::new(lat, lon)
                .map_err(|err| AppError::DeserializationError(format!("record {id}: {err}")))?,
        ),
        _ => None,
    };

    let assets_json: String = row.try_get("assets")?;
    let stored_assets: Vec<StoredAsset> = serde_json::from_str(&assets_json).map_err(|err| {
        AppError::DeserializationError(format!("record {id}: invalid assets: {err}"))
    })?;

    let remote_synced_at: Option<i64> = row.try_get("remote_synced_at")?;

    Ok(Record {
        owner_id: row.try_get("owner_id")?,
        owner_name: row.try_get("owner_name")?,
        lifecycle_state,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        categories,
        location,
        created_at: from_millis(row.try_get("created_at")?),
        updated_at: from_millis(row.try_get("updated_at")?),
        assets: stored_assets.into_iter().map(MediaAsset::from).collect(),
        remote_synced_at: remote_synced_at.map(from_millis),
        id,
    })
}

pub(super) fn from_millis(value: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value).unwrap_or_else(Utc::now)
}
