//! Date-bounded history retrieval.
//!
//! History collections come back newest first, so once a page holds an item
//! older than the boundary no later page can hold a newer one and the walk
//! stops there. Items at or before the boundary are filtered out of the
//! delivered batches.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_types::Dated;
use serde::de::DeserializeOwned;

use crate::{
    client::ApiClient,
    endpoint::{Endpoint, FetchOptions},
    stream::PageStream,
};

/// True when `items` reaches past the boundary. Never true without one.
pub fn boundary_crossed<T: Dated>(boundary: Option<DateTime<Utc>>, items: &[T]) -> bool {
    boundary.is_some_and(|boundary| items.iter().any(|item| item.timestamp() < boundary))
}

/// Items strictly newer than the boundary; everything without one
pub fn newer_than<T: Dated + Clone>(boundary: Option<DateTime<Utc>>, items: &[T]) -> Vec<T> {
    match boundary {
        Some(boundary) => items
            .iter()
            .filter(|item| item.timestamp() > boundary)
            .cloned()
            .collect(),
        None => items.to_vec(),
    }
}

fn forward_newer<T>(boundary: Option<DateTime<Utc>>, raw: &PageStream<T>, result: &PageStream<T>)
where
    T: Dated + Clone + Send + 'static,
{
    let batches = result.clone();
    let errors = result.clone();
    let completions = result.clone();

    raw.on_item_batch(move |items| {
        let kept = newer_than(boundary, items);
        if !kept.is_empty() {
            batches.write_batch(kept);
        }
    })
    .on_error(move |error| errors.fail(Arc::clone(error)))
    .on_completed(move || completions.complete());
}

/// Derive a stream carrying only the items of `raw` newer than `boundary`.
///
/// Empty batches are never written. Completion and errors of `raw` are
/// forwarded as-is. Subscribe to the returned stream before `raw` is driven.
pub fn filter_since<T>(boundary: Option<DateTime<Utc>>, raw: &PageStream<T>) -> PageStream<T>
where
    T: Dated + Clone + Send + 'static,
{
    let result = PageStream::new();
    forward_newer(boundary, raw, &result);
    result
}

impl ApiClient {
    /// Fetch the items of a newest-first collection recorded after `boundary`
    /// into `result`.
    ///
    /// Pages are fetched until one holds an item older than the boundary (or
    /// the collection is exhausted); `result` only ever sees non-empty,
    /// filtered batches.
    pub fn retrieve_since<T>(
        &self,
        result: &PageStream<T>,
        endpoint: &Endpoint,
        options: FetchOptions,
        embedded_key: &str,
        boundary: Option<DateTime<Utc>>,
    ) -> PageStream<T>
    where
        T: Dated + Clone + DeserializeOwned + Send + 'static,
    {
        let buffer = PageStream::new();
        forward_newer(boundary, &buffer, result);
        self.retrieve_pages_until(&buffer, endpoint, options, embedded_key, move |items: &[T]| {
            boundary_crossed(boundary, items)
        });
        result.clone()
    }
}
