//! Path templates with `:name` placeholders.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substitute bound `:name` placeholders in `template`.
///
/// A placeholder name is the longest run of `[A-Za-z0-9_]` following the
/// colon, so with both `id` and `identity` bound, `:identity` is never
/// rewritten through `:id`. Unbound placeholders are kept verbatim. Values are
/// inserted as given; encode them first if they may hold reserved characters.
pub fn resolve(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(colon) = rest.find(':') {
        out.push_str(&rest[..colon]);
        let after = &rest[colon + 1..];
        let name_len = after
            .find(|c: char| !is_name_char(c))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        match vars.get(name) {
            Some(value) if !name.is_empty() => out.push_str(value),
            _ => {
                out.push(':');
                out.push_str(name);
            }
        }
        rest = &after[name_len..];
    }
    out.push_str(rest);
    out
}

/// Serialize a structured query and percent-encode it for a query string
pub fn encode_json_value(value: &JsonValue) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_single_placeholder() {
        assert_eq!(
            resolve("/devices/:deviceId/events", &vars(&[("deviceId", "dev-7")])),
            "/devices/dev-7/events"
        );
    }

    #[test]
    fn test_resolve_placeholder_at_end() {
        assert_eq!(
            resolve("/hooks/:hookId", &vars(&[("hookId", "h1")])),
            "/hooks/h1"
        );
    }

    #[test]
    fn test_prefix_names_do_not_collide() {
        let bound = vars(&[("id", "A"), ("identity", "B")]);
        assert_eq!(resolve("/x/:id/y/:identity", &bound), "/x/A/y/B");
        assert_eq!(resolve("/x/:identity/y/:id", &bound), "/x/B/y/A");

        let only_short = vars(&[("id", "A")]);
        assert_eq!(resolve("/x/:identity", &only_short), "/x/:identity");
    }

    #[test]
    fn test_unbound_and_bare_colons_are_kept() {
        let bound = vars(&[("deviceId", "d")]);
        assert_eq!(
            resolve("/a/:segmentId/b/:deviceId", &bound),
            "/a/:segmentId/b/d"
        );
        assert_eq!(resolve("/time/12:/x", &bound), "/time/12:/x");
        assert_eq!(resolve("/trailing:", &bound), "/trailing:");
    }

    #[test]
    fn test_values_are_inserted_verbatim() {
        let bound = vars(&[("filter", "%7B%7D"), ("deviceId", ":segmentId")]);
        assert_eq!(resolve("/devices?filter=:filter", &bound), "/devices?filter=%7B%7D");
        // substituted text is not rescanned
        assert_eq!(
            resolve("/devices/:deviceId", &bound),
            "/devices/:segmentId"
        );
    }

    #[test]
    fn test_encode_json_value() {
        let encoded = encode_json_value(&serde_json::json!({ "status": "online" }));
        assert_eq!(encoded, "%7B%22status%22%3A%22online%22%7D");
    }
}
