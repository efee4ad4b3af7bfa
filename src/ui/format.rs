//! Text shown by the view, computed from tokens and claims.

use chrono::{DateTime, Local, TimeZone};

/// Number of access token characters shown before the ellipsis.
pub const TOKEN_PREVIEW_CHARS: usize = 20;

/// First characters of a token followed by `...`.
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    format!("{}...", head)
}

/// Countdown until `exp`: `"{minutes}m {seconds}s"`, or `"Expired"`.
pub fn time_remaining(exp: i64, now: i64) -> String {
    let seconds = exp - now;
    if seconds > 0 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        "Expired".to_string()
    }
}

/// Wall-clock time of a unix timestamp in `tz`, as `HH:MM:SS`.
pub fn clock_time<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(timestamp, 0)?;
    Some(utc.with_timezone(tz).format("%H:%M:%S").to_string())
}

/// Issued-at time in the browser's local time zone.
pub fn issued_at(iat: i64) -> String {
    clock_time(iat, &Local).unwrap_or_else(|| iat.to_string())
}

pub fn check_mark(flag: bool) -> &'static str {
    if flag { "✓" } else { "✗" }
}

pub fn presence(present: bool) -> &'static str {
    if present { "present" } else { "none" }
}

/// Label of the token details toggle.
pub fn toggle_label(shown: bool) -> &'static str {
    if shown { "Hide" } else { "Show" }
}
