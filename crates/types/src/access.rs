use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A webhook the service calls on fleet events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Target URL receiving the POSTed events
    pub url: String,

    /// Event types the hook subscribes to
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Hook {
    /// Hook definition ready to be created on the service
    pub fn new(url: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            id: String::new(),
            url: url.into(),
            events,
            created_at: None,
        }
    }
}

/// An API token issued to the account. The secret itself is never listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_hook_serializes_without_id() {
        let hook = Hook::new("https://example.com/hook", vec!["device.offline".into()]);
        let json = serde_json::to_value(&hook).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("createdAt").is_none());
        assert_eq!(json["events"][0], "device.offline");
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc::now();
        let token = Token {
            id: "t-1".into(),
            name: None,
            created_at: None,
            expires_at: Some(now - chrono::Duration::seconds(1)),
        };
        assert!(token.is_expired(now));

        let forever = Token {
            expires_at: None,
            ..token
        };
        assert!(!forever.is_expired(now));
    }
}
