pub(super) const UPSERT_RECORD: &str = r#"
    INSERT INTO records (
        id,
        owner_id,
        owner_name,
        lifecycle_state,
        title,
        description,
        categories,
        latitude,
        longitude,
        assets,
        created_at,
        updated_at,
        remote_synced_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(id) DO UPDATE SET
        owner_id = excluded.owner_id,
        owner_name = excluded.owner_name,
        lifecycle_state = excluded.lifecycle_state,
        title = excluded.title,
        description = excluded.description,
        categories = excluded.categories,
        latitude = excluded.latitude,
        longitude = excluded.longitude,
        assets = excluded.assets,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at,
        remote_synced_at = COALESCE(excluded.remote_synced_at, records.remote_synced_at)
"#;

pub(super) const SELECT_RECORD_BY_ID: &str = r#"
    SELECT id,
           owner_id,
           owner_name,
           lifecycle_state,
           title,
           description,
           categories,
           latitude,
           longitude,
           assets,
           created_at,
           updated_at,
           remote_synced_at
    FROM records
    WHERE id = ?1
"#;

pub(super) const SELECT_ALL_RECORDS: &str = r#"
    SELECT id,
           owner_id,
           owner_name,
           lifecycle_state,
           title,
           description,
           categories,
           latitude,
           longitude,
           assets,
           created_at,
           updated_at,
           remote_synced_at
    FROM records
    ORDER BY updated_at DESC
"#;

pub(super) const SELECT_RECORDS_BY_OWNER: &str = r#"
    SELECT id,
           owner_id,
           owner_name,
           lifecycle_state,
           title,
           description,
           categories,
           latitude,
           longitude,
           assets,
           created_at,
           updated_at,
           remote_synced_at
    FROM records
    WHERE owner_id = ?1
    ORDER BY updated_at DESC
"#;

pub(super) const SELECT_RECORDS_BY_OWNER_AND_STATE: &str = r#"
    SELECT id,
           owner_id,
           owner_name,
           lifecycle_state,
           title,
           description,
           categories,
           latitude,
           longitude,
           assets,
           created_at,
           updated_at,
           remote_synced_at
    FROM records
    WHERE owner_id = ?1 AND lifecycle_state = ?2
    ORDER BY updated_at DESC
"#;

pub(super) const DELETE_RECORD: &str = r#"
    DELETE FROM records
    WHERE id = ?1
"#;

pub(super) const MARK_REMOTE_SYNCED: &str = r#"
    UPDATE records
    SET remote_synced_at = ?2
    WHERE id = ?1
"#;
