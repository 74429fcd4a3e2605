//! Artifacts, listing entries, and the version naming scheme
//!
//! A versioned copy of `data.csv` is named `data_v<N>.csv`; a base name with
//! no extension gets a plain `_v<N>` suffix. Version 0 is the base name
//! itself and is never written by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a well-known artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// The tabular file operators may edit (by creating new versions)
    EditableTable,
    /// A report that is only ever linked to
    ReadOnlyDocument,
}

/// One entry of a folder listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Entry name within its folder
    pub name: String,
    /// Content size in bytes
    pub size: u64,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>, size: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            created_at,
        }
    }
}

/// An immutable, numbered copy of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedArtifact {
    /// Folder the artifact lives in
    pub folder: String,
    /// Unversioned name the version derives from
    pub base_name: String,
    /// Full stored name (`base_v<N>.ext`)
    pub name: String,
    /// Version number, always >= 1 for gateway-created copies
    pub version: u32,
    /// Content size in bytes
    pub size: u64,
    /// When the store recorded the copy
    pub created_at: DateTime<Utc>,
}

/// Split a base name into stem and extension (including the dot)
fn split_extension(base_name: &str) -> (&str, &str) {
    match base_name.rfind('.') {
        Some(idx) if idx > 0 => base_name.split_at(idx),
        _ => (base_name, ""),
    }
}

/// Name of version `version` of `base_name`
///
/// Version 0 is the base name itself.
pub fn versioned_name(base_name: &str, version: u32) -> String {
    if version == 0 {
        return base_name.to_string();
    }
    let (stem, ext) = split_extension(base_name);
    format!("{stem}_v{version}{ext}")
}

/// Version number encoded in `name`, if it is a version of `base_name`
///
/// Returns `Some(0)` for the base name itself and `None` for unrelated names
/// such as `data_v2 (copy).csv`, `data_vx.csv` or `data_v01.csv`. Only the
/// exact form [`versioned_name`] produces is accepted, so each version has
/// one name.
pub fn parse_version(base_name: &str, name: &str) -> Option<u32> {
    if name == base_name {
        return Some(0);
    }
    let (stem, ext) = split_extension(base_name);
    let digits = name
        .strip_prefix(stem)?
        .strip_prefix("_v")?
        .strip_suffix(ext)?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Highest version of `base_name` among `names` (0 when only the original, or nothing, exists)
pub fn max_version<'a>(base_name: &str, names: impl IntoIterator<Item = &'a str>) -> u32 {
    names
        .into_iter()
        .filter_map(|name| parse_version(base_name, name))
        .max()
        .unwrap_or(0)
}
