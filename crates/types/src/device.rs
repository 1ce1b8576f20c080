use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connectivity status reported by the service for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
    Provisioning,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Online => write!(f, "online"),
            DeviceStatus::Offline => write!(f, "offline"),
            DeviceStatus::Provisioning => write!(f, "provisioning"),
            DeviceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A managed device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Service-assigned device identifier
    pub id: String,

    /// Human readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Segment (partition) the device belongs to
    #[serde(default)]
    pub segment_id: Option<String>,

    #[serde(default)]
    pub status: DeviceStatus,

    /// Version of the package currently installed, if any
    #[serde(default)]
    pub installed_version: Option<String>,

    /// Last time the device reached the service
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Device {
    /// Name if set, id otherwise
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
