//! Fan-in of independently paginated partitions into one stream.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    client::ApiClient,
    endpoint::{Endpoint, FetchOptions},
    stream::PageStream,
};

/// Merge one source stream per partition into `merged`.
///
/// For every partition id a source stream is created and subscribed to, then
/// handed to `per_partition_fetch` together with the id; the closure starts
/// driving it (usually through [`ApiClient::retrieve_all_pages`]).
///
/// - batches are forwarded as they arrive, in no particular partition order;
/// - the first source error fails `merged` without waiting for the others;
/// - `merged` completes once every source completed, or right away when there
///   are no partitions;
/// - anything a source emits after `merged` terminated is dropped.
pub fn merge_all<P, T, F>(
    merged: &PageStream<T>,
    partition_ids: impl IntoIterator<Item = P>,
    mut per_partition_fetch: F,
) -> PageStream<T>
where
    T: Clone + Send + 'static,
    F: FnMut(P, PageStream<T>),
{
    let partition_ids: Vec<P> = partition_ids.into_iter().collect();
    let total = partition_ids.len();

    if total == 0 {
        debug!("No partitions to merge, completing");
        merged.complete();
        return merged.clone();
    }

    let completed = Arc::new(AtomicUsize::new(0));

    for (index, partition_id) in partition_ids.into_iter().enumerate() {
        let source = PageStream::new();

        let batches = merged.clone();
        let errors = merged.clone();
        let completions = merged.clone();
        let completed = Arc::clone(&completed);

        source
            .on_item_batch(move |items| {
                if batches.try_write_batch(items.to_vec()).is_err() {
                    debug!(partition = index, "Dropping batch, merged stream already terminated");
                }
            })
            .on_error(move |error| {
                if errors.try_fail(Arc::clone(error)).is_err() {
                    debug!(partition = index, error = %error, "Ignoring partition error, merged stream already terminated");
                }
            })
            .on_completed(move || {
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(partition = index, done, total, "Partition completed");
                if done == total {
                    let _ = completions.try_complete();
                }
            });

        per_partition_fetch(partition_id, source);
    }

    merged.clone()
}

impl ApiClient {
    /// Fetch every page of `endpoint` once per partition, binding the
    /// partition id to the `partition_var` placeholder, into `merged`
    pub fn retrieve_partitioned<T>(
        &self,
        merged: &PageStream<T>,
        partition_ids: Vec<String>,
        endpoint: &Endpoint,
        options: FetchOptions,
        partition_var: &str,
        embedded_key: &str,
    ) -> PageStream<T>
    where
        T: Clone + DeserializeOwned + Send + 'static,
    {
        merge_all(merged, partition_ids, |partition_id, source| {
            let options = options.clone().with_var(partition_var, partition_id);
            self.retrieve_all_pages(&source, endpoint, options, embedded_key);
        })
    }
}
