//! Per-device history: package updates and device events.
//!
//! The service returns both collections newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Dated;

/// State of a package update on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Pending,
    Downloading,
    Installed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateStatus::Pending => write!(f, "pending"),
            UpdateStatus::Downloading => write!(f, "downloading"),
            UpdateStatus::Installed => write!(f, "installed"),
            UpdateStatus::Failed => write!(f, "failed"),
            UpdateStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A package rollout to a single device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: String,

    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default)]
    pub package_id: Option<String>,

    #[serde(default)]
    pub status: UpdateStatus,

    pub created_at: DateTime<Utc>,
}

impl Dated for Update {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Something a device reported or the service recorded about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    pub id: String,

    #[serde(default)]
    pub device_id: Option<String>,

    /// Event type, e.g. `heartbeat` or `update.installed`
    #[serde(rename = "type")]
    pub kind: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub payload: JsonValue,
}

impl Dated for DeviceEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}
