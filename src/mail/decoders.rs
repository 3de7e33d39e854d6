use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::MessageId;

// "8.2.2026 klo 11:42", "08.02.2026 11.42"
static FINNISH_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})\s*(?:klo\s*)?(\d{1,2})[.:](\d{2})")
        .expect("valid regex")
});

/// Listing timestamps: `2026-02-08 11:42`, sometimes with seconds.
pub fn decode_list_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| decode_page_timestamp(raw))
}

/// First Finnish-style timestamp found anywhere in `text`.
pub fn decode_page_timestamp(text: &str) -> Option<NaiveDateTime> {
    find_page_timestamp(text).map(|(ts, _)| ts)
}

/// Like [`decode_page_timestamp`], also returning the byte offset where the
/// timestamp text ends.
pub fn find_page_timestamp(text: &str) -> Option<(NaiveDateTime, usize)> {
    FINNISH_TIMESTAMP.captures_iter(text).find_map(|caps| {
        let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
        let ts = NaiveDate::from_ymd_opt(year, num(2)?, num(1)?)?.and_hms_opt(num(4)?, num(5)?, 0)?;
        Some((ts, caps.get(0)?.end()))
    })
}

/// Message ids arrive as JSON numbers or as numeric strings.
pub fn decode_id(v: &Value) -> Option<MessageId> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
