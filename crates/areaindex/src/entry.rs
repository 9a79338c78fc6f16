//! Index entries and the area document shape they are built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IndexError, IndexResult};

/// One indexed area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaIndexEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Live occupancy is tracked elsewhere; the index only ever writes zero.
    #[serde(default)]
    pub player_count: u32,
}

impl AreaIndexEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            player_count: 0,
        }
    }

    pub fn name_key(&self) -> String {
        normalize_name_key(&self.name)
    }
}

/// The part of an `area-info` document the index cares about.
#[derive(Debug, Deserialize)]
struct AreaInfoShape {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

/// Validates an area document and turns it into an index entry.
pub fn entry_from_area_document(id: &str, document: &Value) -> IndexResult<AreaIndexEntry> {
    let shape = AreaInfoShape::deserialize(document).map_err(|error| IndexError::InvalidArea {
        id: id.to_string(),
        reason: error.to_string(),
    })?;
    if shape.name.is_empty() {
        return Err(IndexError::InvalidArea {
            id: id.to_string(),
            reason: "missing name field".to_string(),
        });
    }
    Ok(AreaIndexEntry::new(
        id,
        shape.name,
        shape.description.unwrap_or_default(),
    ))
}

/// URL-style lookup key: lowercase, keeping only `a-z`, `0-9`, `-` and `_`.
pub fn normalize_name_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_'))
        .collect()
}
