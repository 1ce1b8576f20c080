use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::template;

/// One REST operation of the fleet service: a method and a path template
/// with `:name` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Path with the bound variables of `options` substituted
    pub fn resolve(&self, options: &FetchOptions) -> String {
        template::resolve(&self.path, &options.path_vars)
    }
}

/// Every endpoint the client talks to.
///
/// Built once and handed to [`ApiClient`](crate::ApiClient) at construction;
/// tests and alternative deployments swap individual entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub devices: Endpoint,
    pub device: Endpoint,
    pub segments: Endpoint,
    pub segment_devices: Endpoint,
    pub packages: Endpoint,
    pub updates: Endpoint,
    pub device_events: Endpoint,
    pub filters: Endpoint,
    pub filter_devices: Endpoint,
    pub hooks: Endpoint,
    pub create_hook: Endpoint,
    pub delete_hook: Endpoint,
    pub tokens: Endpoint,
    pub login: Endpoint,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            devices: Endpoint::get("/devices"),
            device: Endpoint::get("/devices/:deviceId"),
            segments: Endpoint::get("/segments"),
            segment_devices: Endpoint::get("/segments/:segmentId/devices"),
            packages: Endpoint::get("/packages"),
            updates: Endpoint::get("/devices/:deviceId/updates"),
            device_events: Endpoint::get("/devices/:deviceId/events"),
            filters: Endpoint::get("/filters"),
            filter_devices: Endpoint::get("/devices?filter=:filter"),
            hooks: Endpoint::get("/hooks"),
            create_hook: Endpoint::post("/hooks"),
            delete_hook: Endpoint::delete("/hooks/:hookId"),
            tokens: Endpoint::get("/tokens"),
            login: Endpoint::post("/auth/login"),
        }
    }
}

/// Embedded collection keys used by the service's HAL envelopes
pub mod keys {
    pub const DEVICES: &str = "devices";
    pub const SEGMENTS: &str = "segments";
    pub const PACKAGES: &str = "packages";
    pub const UPDATES: &str = "updates";
    pub const EVENTS: &str = "events";
    pub const FILTERS: &str = "filters";
    pub const HOOKS: &str = "hooks";
    pub const TOKENS: &str = "tokens";
}

/// Per-call request parameters.
///
/// The auth header is added by the client; `headers` holds anything extra.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub headers: BTreeMap<String, String>,
    pub path_vars: BTreeMap<String, String>,
    pub body: Option<JsonValue>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a `:name` placeholder
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_vars.insert(name.into(), value.into());
        self
    }

    /// Bind a placeholder to a structured query, serialized and URI-encoded
    pub fn with_json_var(self, name: impl Into<String>, value: &JsonValue) -> Self {
        self.with_var(name, template::encode_json_value(value))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }
}
