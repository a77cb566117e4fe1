//! Stuck-task detection and media URL guessing.
//!
//! When the provider keeps reporting a task as running long after it was
//! created, the output is sometimes already sitting in its storage bucket.
//! These helpers build the candidate URLs to probe; they are a best-effort
//! heuristic and guarantee nothing about which (if any) URL exists.

use crate::normalize::is_http_url;
use crate::task_result::TaskStatus;
use crate::types::Timestamp;

/// Age after which a non-terminal task is considered stuck.
pub const DEFAULT_STUCK_THRESHOLD_SECS: i64 = 10 * 60;

/// Upper bound on guessed URLs per task.
pub const DEFAULT_MAX_GUESS_ATTEMPTS: usize = 10;

/// Number of seconds after the record timestamp also tried when rendering
/// `{timestamp}` / `{date}`.
const TIMESTAMP_SPREAD_SECS: i64 = 2;

/// A task is stuck when it is still non-terminal and older than `threshold`.
pub fn is_stuck(
    status: TaskStatus,
    created_at: Timestamp,
    now: Timestamp,
    threshold: chrono::Duration,
) -> bool {
    !status.is_terminal() && now - created_at > threshold
}

/// Render candidate URLs from `template` for each timestamp in the spread
/// and each candidate ID, in that order, capped at `max_attempts`.
///
/// Supported placeholders: `{task_id}`, `{timestamp}` (epoch seconds),
/// `{timestamp_ms}`, `{date}` (`YYYYMMDD`) and `{candidate}`. Rendered values
/// that are not http(s) URLs, and duplicates, are skipped.
pub fn guess_urls(
    template: &str,
    task_id: &str,
    created_at: Timestamp,
    candidates: &[String],
    max_attempts: usize,
) -> Vec<String> {
    let mut urls = Vec::new();

    for offset in 0..=TIMESTAMP_SPREAD_SECS {
        let at = created_at + chrono::Duration::seconds(offset);
        for candidate in candidates {
            if urls.len() >= max_attempts {
                return urls;
            }
            let url = render(template, task_id, at, candidate);
            if is_http_url(&url) && !urls.contains(&url) {
                urls.push(url);
            }
        }
    }

    urls
}

fn render(template: &str, task_id: &str, at: Timestamp, candidate: &str) -> String {
    template
        .replace("{task_id}", task_id)
        .replace("{timestamp_ms}", &at.timestamp_millis().to_string())
        .replace("{timestamp}", &at.timestamp().to_string())
        .replace("{date}", &at.format("%Y%m%d").to_string())
        .replace("{candidate}", candidate)
}
