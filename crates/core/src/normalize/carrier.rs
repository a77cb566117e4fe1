//! Direct extraction of result URLs from the known field paths.

use serde_json::Value;

use super::is_http_url;
use super::paths::{lookup, RESULT_URL_PATHS};

/// How far a JSON document may be embedded inside string or object fields
/// before the direct lookup gives up.
const MAX_EMBED_DEPTH: usize = 4;

/// Recognized shapes of a result-URL field.
#[derive(Debug)]
pub(crate) enum UrlCarrier<'a> {
    /// `["https://…", …]` (elements may also be `{"url": "…"}` objects).
    List(&'a [Value]),
    /// A JSON document serialized into a string, e.g. `resultJson`.
    EmbeddedJson(Value),
    /// A single URL string.
    Bare(&'a str),
    /// An object that may itself hold one of the known fields.
    Nested(&'a Value),
}

impl<'a> UrlCarrier<'a> {
    pub(crate) fn classify(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Self::List(items)),
            Value::Object(_) => Some(Self::Nested(value)),
            Value::String(raw) => {
                let trimmed = raw.trim();
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(parsed @ (Value::Object(_) | Value::Array(_) | Value::String(_))) => {
                        Some(Self::EmbeddedJson(parsed))
                    }
                    _ if is_http_url(trimmed) => Some(Self::Bare(trimmed)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn into_urls(self, depth: usize) -> Vec<String> {
        match self {
            Self::List(items) => collect_list(items),
            Self::Bare(url) => vec![url.to_string()],
            Self::Nested(inner) => direct_urls(inner, depth + 1),
            Self::EmbeddedJson(parsed) => match &parsed {
                Value::Object(_) => direct_urls(&parsed, depth + 1),
                other => UrlCarrier::classify(other)
                    .map(|carrier| carrier.into_urls(depth + 1))
                    .unwrap_or_default(),
            },
        }
    }
}

/// Walk [`RESULT_URL_PATHS`] in order and return the first non-empty URL
/// list. String fields holding JSON are parsed and searched the same way.
pub(crate) fn direct_urls(value: &Value, depth: usize) -> Vec<String> {
    if depth > MAX_EMBED_DEPTH {
        return Vec::new();
    }

    RESULT_URL_PATHS
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter_map(UrlCarrier::classify)
        .map(|carrier| carrier.into_urls(depth))
        .find(|urls| !urls.is_empty())
        .unwrap_or_default()
}

fn collect_list(items: &[Value]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for item in items {
        let candidate = match item {
            Value::String(s) => Some(s.trim()),
            Value::Object(_) => item.get("url").and_then(Value::as_str).map(str::trim),
            _ => None,
        };
        if let Some(url) = candidate {
            if is_http_url(url) && !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
    }
    urls
}
