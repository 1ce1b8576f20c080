//! Catalog resources: segments that partition the fleet, packages that can be
//! rolled out to it, and saved device filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A server-side partition of the fleet.
///
/// Devices of a segment are paginated independently from the devices of other
/// segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Inactive segments are kept for history but hold no live devices
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub device_count: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// A deployable software package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,

    pub name: String,

    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A saved device query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id: String,

    pub name: String,

    /// Structured query, sent URI-encoded in the query string when used
    #[serde(default)]
    pub query: JsonValue,
}
