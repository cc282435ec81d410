//! Argument decoding for tool handlers.
//!
//! Models send loosely-typed JSON: numbers arrive as numbers or quoted
//! strings, dates arrive as ISO-8601 or as half-filled placeholders like
//! "2024-10-???". Every handler goes through these helpers so the coercion
//! rules stay in one place.

use chrono::{DateTime, NaiveDateTime, Utc};
use concierge_core::error::ToolError;
use serde_json::{Map, Value};
use tracing::debug;

/// The caller identity, injected by the orchestrator. Number or numeric string.
pub fn require_user_id(args: &Map<String, Value>) -> Result<i64, ToolError> {
    require_i64(args, "userId")
}

pub fn require_i64(args: &Map<String, Value>, key: &str) -> Result<i64, ToolError> {
    match args.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArguments(format!("{key} must be an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ToolError::InvalidArguments(format!("{key} must be an integer"))),
        _ => Err(ToolError::InvalidArguments(format!("{key} is required"))),
    }
}

pub fn require_str(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    match opt_str(args, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ToolError::InvalidArguments(format!("{key} is required"))),
    }
}

/// String form of any present value, `None` for absent or JSON null.
pub fn opt_str(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

pub fn opt_usize(args: &Map<String, Value>, key: &str) -> Option<usize> {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_i64().filter(|v| *v > 0).map(|v| v as usize),
        _ => None,
    }
}

/// Free-text field hygiene before anything reaches a store: strip control
/// characters (newlines survive), trim, and cap the length.
pub fn sanitize(text: &str, max_len: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();
    cleaned.trim().chars().take(max_len).collect()
}

/// Parse an optional timestamp argument. Missing, blank, placeholder or
/// unparseable values all come back as `None` so the operation still
/// proceeds without that field.
pub fn opt_datetime(args: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = opt_str(args, key)?;
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if is_placeholder_date(s) {
        debug!(key, value = s, "Skipping invalid or placeholder date");
        return None;
    }
    parse_datetime(s)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // No timezone (e.g. "2024-10-21T09:00:00"): treat as UTC wall time
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Rejects strings a model emits when it does not actually know the date,
/// like "2024-???" or "2024-10-???". Anything that does not start with a
/// literal YYYY-MM-DD shape is a placeholder.
fn is_placeholder_date(s: &str) -> bool {
    if s.len() < 10 {
        return true;
    }
    if s.contains('?') || s.contains('*') || s.contains('_') {
        return true;
    }
    let bytes = s.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return true;
    }
    bytes[..10]
        .iter()
        .enumerate()
        .any(|(i, b)| i != 4 && i != 7 && !b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn user_id_accepts_number_or_string() {
        assert_eq!(require_user_id(&map(json!({"userId": 7}))).unwrap(), 7);
        assert_eq!(require_user_id(&map(json!({"userId": "7"}))).unwrap(), 7);
    }

    #[test]
    fn user_id_missing_is_invalid_arguments() {
        let err = require_user_id(&map(json!({}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(m) if m.contains("userId")));
    }

    #[test]
    fn require_str_rejects_blank() {
        assert!(require_str(&map(json!({"title": "  "})), "title").is_err());
        assert!(require_str(&map(json!({})), "title").is_err());
        assert_eq!(
            require_str(&map(json!({"title": "buy milk"})), "title").unwrap(),
            "buy milk"
        );
    }

    #[test]
    fn sanitize_strips_control_chars_and_caps_length() {
        assert_eq!(sanitize("  buy milk\t\r ", 255), "buy milk");
        assert_eq!(sanitize("line one\nline two", 255), "line one\nline two");
        assert_eq!(sanitize("abcdef", 3), "abc");
    }

    #[test]
    fn placeholder_dates_are_omitted() {
        for bad in ["2024-10-???", "2024-??-15", "2024-???", "abc", "tomorrow", "2024/10/21"] {
            assert!(
                opt_datetime(&map(json!({"dueTime": bad})), "dueTime").is_none(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn real_dates_parse_with_and_without_zone() {
        let zoned = opt_datetime(&map(json!({"dueTime": "2025-02-24T15:00:00Z"})), "dueTime");
        assert!(zoned.is_some());
        let naive = opt_datetime(&map(json!({"dueTime": "2025-02-24T15:00:00"})), "dueTime");
        assert!(naive.is_some());
    }

    #[test]
    fn missing_date_is_simply_absent() {
        assert!(opt_datetime(&map(json!({})), "dueTime").is_none());
        assert!(opt_datetime(&map(json!({"dueTime": null})), "dueTime").is_none());
        assert!(opt_datetime(&map(json!({"dueTime": ""})), "dueTime").is_none());
    }
}
