//! HAL envelope classification.
//!
//! ```text
//! {
//!   "_embedded": { "<key>": [ <item>, ... ] },
//!   "_links":    { "next": { "href": "<uri>" } }
//! }
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// What one response turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    /// A slice of a paginated collection; `next` is absent on the last page
    Page { items: Vec<T>, next: Option<String> },

    /// A plain, non-paginated response
    Terminal,
}

impl<T> Envelope<T> {
    pub fn is_page(&self) -> bool {
        matches!(self, Envelope::Page { .. })
    }
}

/// Classify a response body.
///
/// Only an array under `_embedded.<embedded_key>` makes a page. A missing
/// `_embedded`, a missing key or a single embedded object all mean the
/// response is terminal, which is not an error.
pub fn classify<T: DeserializeOwned>(
    body: JsonValue,
    embedded_key: &str,
) -> Result<Envelope<T>, serde_json::Error> {
    let JsonValue::Object(mut body) = body else {
        return Ok(Envelope::Terminal);
    };

    let items = match body
        .get_mut("_embedded")
        .and_then(|embedded| embedded.get_mut(embedded_key))
    {
        Some(collection) if collection.is_array() => collection.take(),
        _ => return Ok(Envelope::Terminal),
    };

    let items: Vec<T> = serde_json::from_value(items)?;
    let next = body
        .get("_links")
        .and_then(|links| links.get("next"))
        .and_then(|next| next.get("href"))
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    Ok(Envelope::Page { items, next })
}
