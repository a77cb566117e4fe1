//! Depth-bounded fallback scan over every string leaf of a payload.

use serde_json::Value;

use super::is_http_url;
use crate::task_result::MediaKind;

/// Deepest level visited by [`scan_urls`]. The root value is depth 0, its
/// direct children depth 1.
pub const MAX_SCAN_DEPTH: usize = 7;

/// Collect every `http://` / `https://` string within [`MAX_SCAN_DEPTH`],
/// de-duplicated in first-seen order.
///
/// `serde_json::Value` is an owned tree, so there are no cycles to guard
/// against; the depth cap alone bounds the recursion.
pub fn scan_urls(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    visit(value, 0, &mut found);
    found
}

fn visit(value: &Value, depth: usize, found: &mut Vec<String>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }

    match value {
        Value::String(s) => {
            if is_http_url(s) && !found.iter().any(|f| f == s) {
                found.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, depth + 1, found);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                visit(child, depth + 1, found);
            }
        }
        _ => {}
    }
}

/// Apply the media preference to scanned URLs.
///
/// Video lookups keep a single URL: the first mentioning `mp4` or `video`,
/// else the first found. Other kinds keep the whole list.
pub(crate) fn fallback_urls(value: &Value, kind: MediaKind) -> Vec<String> {
    let urls = scan_urls(value);
    match kind {
        MediaKind::Video => {
            let preferred = urls
                .iter()
                .position(|u| u.contains("mp4") || u.contains("video"))
                .unwrap_or(0);
            urls.into_iter().nth(preferred).into_iter().collect()
        }
        MediaKind::Image | MediaKind::Any => urls,
    }
}
