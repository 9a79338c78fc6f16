//! Document kinds and their storage namespaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// How a kind's documents are replaced on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Temp file in the same directory, then rename into place. Readers never
    /// observe a partially written document.
    Atomic,
    /// Overwrite in place. Only for list-style documents whose readers accept
    /// a torn or stale read.
    Direct,
}

/// The entity category a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Account,
    PersonInfo,
    Inventory,
    AreaInfo,
    AreaLoad,
    AreaBundle,
    AreaSubareas,
    AreaList,
    AreaIndexCache,
    /// Scoped under the owning area id.
    Placement,
    ThingInfo,
    ThingDef,
    ThingTags,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 13] = [
        Self::Account,
        Self::PersonInfo,
        Self::Inventory,
        Self::AreaInfo,
        Self::AreaLoad,
        Self::AreaBundle,
        Self::AreaSubareas,
        Self::AreaList,
        Self::AreaIndexCache,
        Self::Placement,
        Self::ThingInfo,
        Self::ThingDef,
        Self::ThingTags,
    ];

    /// Directory name under the data root.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::PersonInfo => "person-info",
            Self::Inventory => "inventory",
            Self::AreaInfo => "area-info",
            Self::AreaLoad => "area-load",
            Self::AreaBundle => "area-bundle",
            Self::AreaSubareas => "area-subareas",
            Self::AreaList => "area-list",
            Self::AreaIndexCache => "area-index-cache",
            Self::Placement => "placement",
            Self::ThingInfo => "thing-info",
            Self::ThingDef => "thing-def",
            Self::ThingTags => "thing-tags",
        }
    }

    pub fn write_policy(self) -> WritePolicy {
        match self {
            // Append-only area list; a reader that races a write just sees the
            // previous list.
            Self::AreaList => WritePolicy::Direct,
            _ => WritePolicy::Atomic,
        }
    }

    /// Whether documents of this kind live under a parent id.
    pub fn is_scoped(self) -> bool {
        matches!(self, Self::Placement)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

impl FromStr for DocumentKind {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.namespace() == value)
            .ok_or_else(|| StoreError::InvalidKey(format!("unknown document kind {value}")))
    }
}
