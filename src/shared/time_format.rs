//! Relative timestamps for the wall feed ("5m ago", "2d ago", ...).

use chrono::{DateTime, Utc};

/// Format used once a post is a week old, e.g. `Oct 9, 2026, 02:30 PM`
const ABSOLUTE_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

/// Render `created_at` relative to `now`.
///
/// Whole units are truncated, so 119 seconds is `1m ago`. Timestamps in the
/// future (clock skew between backend and server) render as `Just now`.
pub fn format_relative(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        created_at.format(ABSOLUTE_FORMAT).to_string()
    }
}
