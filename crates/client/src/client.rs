use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ClientConfig,
    endpoint::{Endpoint, Endpoints, FetchOptions},
    error::{ClientError, Result, SharedError},
    page::{self, Envelope},
    stream::PageStream,
};

/// Header carrying the API token on every request
pub const AUTH_HEADER: &str = "x-auth-token";

/// Per-page predicate ending a walk early.
///
/// Evaluated on the items of the page just fetched (not on everything fetched
/// so far), before the next page is requested.
pub type StopCondition<T> = Arc<dyn Fn(&[T]) -> bool + Send + Sync>;

/// HTTP client for the fleet service.
///
/// Cheap to clone; clones share the connection pool and configuration.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.config.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            config: Arc::new(config),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.config.endpoints
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of `endpoint` with the path variables of `options` bound
    pub fn url_for(&self, endpoint: &Endpoint, options: &FetchOptions) -> Result<Url> {
        let path = endpoint.resolve(options);
        Ok(Url::parse(&format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        ))?)
    }

    /// Resolve a `next` href against the URL of the page it was found in.
    /// Absolute links are used as-is.
    fn resolve_link(page: &Url, href: &str) -> Result<Url> {
        Ok(page.join(href)?)
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        options: &FetchOptions,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(ref token) = self.config.token {
            request = request.header(AUTH_HEADER, token);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if method != Method::GET
            && let Some(ref body) = options.body
        {
            request = request.json(body);
        }
        request
    }

    /// Issue one request and parse the body as JSON. Empty bodies parse as null.
    async fn fetch_json(
        &self,
        method: Method,
        url: Url,
        options: &FetchOptions,
    ) -> Result<JsonValue> {
        let url_str = url.to_string();
        let response = self.build_request(method, url, options).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Status {
                status,
                url: url_str,
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            url: url_str,
            message: e.to_string(),
        })
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        options: &FetchOptions,
        embedded_key: &str,
    ) -> Result<Envelope<T>> {
        let url_str = url.to_string();
        let body = self.fetch_json(method, url, options).await?;
        page::classify(body, embedded_key).map_err(|e| ClientError::Decode {
            url: url_str,
            message: e.to_string(),
        })
    }

    /// Walk the pages of `endpoint`, writing each page's items to `stream`.
    ///
    /// Page N+1 is requested only after page N has been handed to the
    /// stream. Any failure fails the stream and ends the walk.
    async fn walk_pages<T>(
        self,
        stream: PageStream<T>,
        endpoint: Endpoint,
        options: FetchOptions,
        embedded_key: String,
        stop: Option<StopCondition<T>>,
    ) where
        T: DeserializeOwned + Send + 'static,
    {
        let mut method = endpoint.method.clone();
        let mut next = match self.url_for(&endpoint, &options) {
            Ok(url) => Some(url),
            Err(e) => {
                stream.fail(e);
                return;
            }
        };
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            debug!(url = %url, page = pages + 1, "Fetching page");
            let envelope = self
                .fetch_page::<T>(method.clone(), url.clone(), &options, &embedded_key)
                .await;
            method = Method::GET;

            let (items, href) = match envelope {
                Ok(Envelope::Page { items, next }) => (items, next),
                Ok(Envelope::Terminal) => {
                    debug!(url = %url, "Response is not a page, completing");
                    break;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Page fetch failed");
                    stream.fail(e);
                    return;
                }
            };

            pages += 1;
            let stop_here = stop.as_ref().is_some_and(|stop| stop(&items));
            debug!(
                url = %url,
                items = items.len(),
                has_next = href.is_some(),
                stop_here,
                "Received page"
            );
            stream.write_batch(items);

            if stop_here {
                break;
            }
            if let Some(href) = href {
                match Self::resolve_link(&url, &href) {
                    Ok(url) => next = Some(url),
                    Err(e) => {
                        stream.fail(e);
                        return;
                    }
                }
            }
        }

        info!(endpoint = %endpoint.path, pages, "Retrieval complete");
        stream.complete();
    }

    fn spawn_walk<T>(
        &self,
        stream: &PageStream<T>,
        endpoint: &Endpoint,
        options: FetchOptions,
        embedded_key: &str,
        stop: Option<StopCondition<T>>,
    ) -> PageStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let walk = self.clone().walk_pages(
            stream.clone(),
            endpoint.clone(),
            options,
            embedded_key.to_string(),
            stop,
        );
        let handle = tokio::spawn(walk);

        // a panicking walk (e.g. in a stop condition) must still end the stream
        let watched = stream.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await
                && e.is_panic()
            {
                warn!(error = %e, "Retrieval task panicked");
                let _ = watched.try_fail(ClientError::Task(e.to_string()));
            }
        });
        stream.clone()
    }

    /// Fetch every page of `endpoint` into `stream`.
    ///
    /// Returns immediately; pages are fetched on a spawned task. Register the
    /// stream's callbacks before calling this.
    pub fn retrieve_all_pages<T>(
        &self,
        stream: &PageStream<T>,
        endpoint: &Endpoint,
        options: FetchOptions,
        embedded_key: &str,
    ) -> PageStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.spawn_walk(stream, endpoint, options, embedded_key, None)
    }

    /// Like [`retrieve_all_pages`](Self::retrieve_all_pages), but treats the
    /// first page on which `stop` holds as the last one
    pub fn retrieve_pages_until<T, F>(
        &self,
        stream: &PageStream<T>,
        endpoint: &Endpoint,
        options: FetchOptions,
        embedded_key: &str,
        stop: F,
    ) -> PageStream<T>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(&[T]) -> bool + Send + Sync + 'static,
    {
        self.spawn_walk(stream, endpoint, options, embedded_key, Some(Arc::new(stop)))
    }

    /// Fetch every page of `endpoint` and gather the items in page order
    pub async fn collect_all_pages<T>(
        &self,
        endpoint: &Endpoint,
        options: FetchOptions,
        embedded_key: &str,
    ) -> std::result::Result<Vec<T>, SharedError>
    where
        T: Clone + DeserializeOwned + Send + 'static,
    {
        let stream = PageStream::new();
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        stream.on_item_batch(move |items: &[T]| sink.lock().extend_from_slice(items));

        self.retrieve_all_pages(&stream, endpoint, options, embedded_key)
            .wait()
            .await?;
        let items = std::mem::take(&mut *collected.lock());
        Ok(items)
    }

    /// Single non-paginated call, decoding the response body
    pub async fn request<R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        options: FetchOptions,
    ) -> Result<R> {
        let url = self.url_for(endpoint, &options)?;
        let url_str = url.to_string();
        let body = self
            .fetch_json(endpoint.method.clone(), url, &options)
            .await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode {
            url: url_str,
            message: e.to_string(),
        })
    }

    /// Single non-paginated call whose response body is ignored
    pub async fn send(&self, endpoint: &Endpoint, options: FetchOptions) -> Result<()> {
        let url = self.url_for(endpoint, &options)?;
        self.fetch_json(endpoint.method.clone(), url, &options)
            .await
            .map(|_| ())
    }
}
