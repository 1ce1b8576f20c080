//! Fleet resources as one-line calls onto the retrieval engine.
//!
//! Listing calls write into a caller-supplied stream and return it right
//! away; the rest are plain request/response calls.

use chrono::{DateTime, Utc};
use fleet_types::{Device, DeviceEvent, Filter, Hook, Package, Segment, Token, Update};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::{
    client::ApiClient,
    endpoint::{FetchOptions, keys},
    error::{Result, SharedError},
    stream::PageStream,
};

/// Credentials accepted by the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Answer of the login endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl ApiClient {
    pub fn list_devices(&self, stream: &PageStream<Device>) -> PageStream<Device> {
        self.retrieve_all_pages(stream, &self.endpoints().devices, FetchOptions::new(), keys::DEVICES)
    }

    pub fn list_segment_devices(
        &self,
        stream: &PageStream<Device>,
        segment_id: &str,
    ) -> PageStream<Device> {
        self.retrieve_all_pages(
            stream,
            &self.endpoints().segment_devices,
            FetchOptions::new().with_var("segmentId", segment_id),
            keys::DEVICES,
        )
    }

    /// Devices matching a structured query, sent URI-encoded in the query string
    pub fn list_filtered_devices(
        &self,
        stream: &PageStream<Device>,
        query: &JsonValue,
    ) -> PageStream<Device> {
        self.retrieve_all_pages(
            stream,
            &self.endpoints().filter_devices,
            FetchOptions::new().with_json_var("filter", query),
            keys::DEVICES,
        )
    }

    /// Devices of every active segment, merged into one stream.
    ///
    /// The segment list is fetched first; if that fails, `stream` fails.
    pub fn list_all_devices(&self, stream: &PageStream<Device>) -> PageStream<Device> {
        let client = self.clone();
        let merged = stream.clone();
        tokio::spawn(async move {
            let segment_ids = match client.active_segment_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(error = %e, "Could not list segments");
                    merged.fail(e);
                    return;
                }
            };
            debug!(segments = segment_ids.len(), "Merging devices of active segments");
            client.retrieve_partitioned(
                &merged,
                segment_ids,
                &client.endpoints().segment_devices,
                FetchOptions::new(),
                "segmentId",
                keys::DEVICES,
            );
        });
        stream.clone()
    }

    /// Ids of the segments currently holding live devices
    pub async fn active_segment_ids(&self) -> std::result::Result<Vec<String>, SharedError> {
        let segments: Vec<Segment> = self
            .collect_all_pages(&self.endpoints().segments, FetchOptions::new(), keys::SEGMENTS)
            .await?;
        Ok(segments
            .into_iter()
            .filter(|segment| segment.active)
            .map(|segment| segment.id)
            .collect())
    }

    pub async fn get_device(&self, device_id: &str) -> Result<Device> {
        self.request(
            &self.endpoints().device,
            FetchOptions::new().with_var("deviceId", device_id),
        )
        .await
    }

    pub fn list_segments(&self, stream: &PageStream<Segment>) -> PageStream<Segment> {
        self.retrieve_all_pages(stream, &self.endpoints().segments, FetchOptions::new(), keys::SEGMENTS)
    }

    pub fn list_packages(&self, stream: &PageStream<Package>) -> PageStream<Package> {
        self.retrieve_all_pages(stream, &self.endpoints().packages, FetchOptions::new(), keys::PACKAGES)
    }

    pub fn list_updates(&self, stream: &PageStream<Update>, device_id: &str) -> PageStream<Update> {
        self.retrieve_all_pages(
            stream,
            &self.endpoints().updates,
            FetchOptions::new().with_var("deviceId", device_id),
            keys::UPDATES,
        )
    }

    /// Events of a device recorded after `since`, newest first
    pub fn device_events_since(
        &self,
        stream: &PageStream<DeviceEvent>,
        device_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> PageStream<DeviceEvent> {
        self.retrieve_since(
            stream,
            &self.endpoints().device_events,
            FetchOptions::new().with_var("deviceId", device_id),
            keys::EVENTS,
            since,
        )
    }

    pub fn list_filters(&self, stream: &PageStream<Filter>) -> PageStream<Filter> {
        self.retrieve_all_pages(stream, &self.endpoints().filters, FetchOptions::new(), keys::FILTERS)
    }

    pub fn list_hooks(&self, stream: &PageStream<Hook>) -> PageStream<Hook> {
        self.retrieve_all_pages(stream, &self.endpoints().hooks, FetchOptions::new(), keys::HOOKS)
    }

    pub async fn create_hook(&self, hook: &Hook) -> Result<Hook> {
        let body = serde_json::to_value(hook)?;
        self.request(&self.endpoints().create_hook, FetchOptions::new().with_body(body))
            .await
    }

    pub async fn delete_hook(&self, hook_id: &str) -> Result<()> {
        self.send(
            &self.endpoints().delete_hook,
            FetchOptions::new().with_var("hookId", hook_id),
        )
        .await
    }

    pub fn list_tokens(&self, stream: &PageStream<Token>) -> PageStream<Token> {
        self.retrieve_all_pages(stream, &self.endpoints().tokens, FetchOptions::new(), keys::TOKENS)
    }

    /// Exchange credentials for an API token
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let body = serde_json::to_value(request)?;
        self.request(&self.endpoints().login, FetchOptions::new().with_body(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{Canned, FakeService, Recorder};

    #[tokio::test]
    async fn test_list_all_devices_skips_inactive_segments() {
        let service = FakeService::start(vec![
            (
                "/segments",
                Canned::Json(json!({
                    "_embedded": { "segments": [
                        { "id": "north", "active": true },
                        { "id": "south", "active": false },
                        { "id": "east" }
                    ] }
                })),
            ),
            (
                "/segments/north/devices",
                Canned::Json(json!({ "_embedded": { "devices": [{ "id": "n1" }, { "id": "n2" }] } })),
            ),
            (
                "/segments/east/devices",
                Canned::Json(json!({ "_embedded": { "devices": [{ "id": "e1" }] } })),
            ),
        ])
        .await;
        let client = service.client();
        let stream = PageStream::new();
        let recorder = Recorder::attach(&stream);

        client.list_all_devices(&stream).wait().await.unwrap();

        let mut ids: Vec<String> = recorder
            .batches()
            .into_iter()
            .flatten()
            .map(|device| device.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["e1", "n1", "n2"]);
        assert_eq!(service.hits("/segments/south/devices"), 0);
    }

    #[tokio::test]
    async fn test_list_all_devices_with_no_segments_completes() {
        let service = FakeService::start(vec![(
            "/segments",
            Canned::Json(json!({ "_embedded": { "segments": [] } })),
        )])
        .await;
        let stream = PageStream::new();
        let recorder = Recorder::attach(&stream);

        service.client().list_all_devices(&stream).wait().await.unwrap();

        assert!(recorder.batches().is_empty());
        assert_eq!(recorder.completions(), 1);
    }

    #[tokio::test]
    async fn test_filtered_devices_encode_query() {
        let service = FakeService::start(vec![(
            "/devices?filter=%7B%22status%22%3A%22online%22%7D",
            Canned::Json(json!({ "_embedded": { "devices": [{ "id": "d1", "status": "online" }] } })),
        )])
        .await;
        let stream = PageStream::new();
        let recorder = Recorder::attach(&stream);

        service
            .client()
            .list_filtered_devices(&stream, &json!({ "status": "online" }))
            .wait()
            .await
            .unwrap();

        assert_eq!(recorder.batches().concat().len(), 1);
    }

    #[tokio::test]
    async fn test_create_hook_posts_body() {
        let service = FakeService::start(vec![(
            "/hooks",
            Canned::Json(json!({ "id": "h-1", "url": "https://example.com/h", "events": ["device.offline"] })),
        )])
        .await;

        let created = service
            .client()
            .create_hook(&Hook::new("https://example.com/h", vec!["device.offline".into()]))
            .await
            .unwrap();

        assert_eq!(created.id, "h-1");
        assert_eq!(service.hits("/hooks"), 1);
    }
}
