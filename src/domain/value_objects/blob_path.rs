use super::AssetKind;
use std::fmt;

/// Blob service key for one asset slot: `{owner}/{record}/{kind}_{slot}.{ext}`.
///
/// The path only depends on the slot identity, so re-uploading a slot
/// overwrites the previous object instead of creating a second one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobPath {
    owner_id: String,
    record_id: String,
    kind: AssetKind,
    slot_index: u32,
    extension: &'static str,
}

impl BlobPath {
    pub fn new(
        owner_id: &str,
        record_id: &str,
        kind: AssetKind,
        slot_index: u32,
        content_type: &str,
    ) -> Result<Self, String> {
        validate_segment("owner_id", owner_id)?;
        validate_segment("record_id", record_id)?;
        Ok(Self {
            owner_id: owner_id.to_string(),
            record_id: record_id.to_string(),
            kind,
            slot_index,
            extension: kind.extension_for(content_type),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn slot_index(&self) -> u32 {
        self.slot_index
    }

    /// `{kind}_{slot}.{ext}`
    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.kind, self.slot_index, self.extension)
    }

    pub fn as_key(&self) -> String {
        self.to_string()
    }

    /// Reads `(kind, slot)` back out of a key or URL whose last segment is a blob file name.
    pub fn parse_slot(url: &str) -> Option<(AssetKind, u32)> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem);
        let (kind, slot) = stem.rsplit_once('_')?;
        Some((kind.parse().ok()?, slot.parse().ok()?))
    }
}

/// Ids become directory names and URL path segments, so they must be one non-traversing segment.
pub fn validate_segment(name: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{name} must not be empty"));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(format!("{name} is not a valid path segment: {value}"));
    }
    Ok(())
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.owner_id,
            self.record_id,
            self.file_name()
        )
    }
}
