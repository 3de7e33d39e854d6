// Reads the schedule page's embedded `Events : [...]` script data.

use chrono::{NaiveDate, NaiveTime};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::LessonEntry;
use crate::error::{Result, WilmaError};
use crate::html;

static EVENTS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Events\s*:\s*\[").expect("valid regex"));
// "O: Virtanen Liisa", "L: A204"
static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}{1,3}:\s*").expect("valid regex"));

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Start", default)]
    start: i64,
    #[serde(rename = "End", default)]
    end: i64,
    #[serde(rename = "Text", default)]
    text: Option<Value>,
    #[serde(rename = "LongText", default)]
    long_text: Option<Value>,
    #[serde(rename = "Opet", default)]
    teachers: Option<Value>,
    #[serde(rename = "Luokat", default)]
    rooms: Option<Value>,
}

impl RawEvent {
    /// Free periods have no subject, holidays cover the whole day.
    fn is_lesson(&self, subject: &str) -> bool {
        !subject.trim().is_empty()
            && self.end > self.start
            && !(self.start <= 0 && self.end >= MINUTES_PER_DAY)
    }
}

/// All lessons on the page, paired with the day they fall on.
pub fn parse_events(html: &str) -> Result<Vec<(NaiveDate, LessonEntry)>> {
    let json = events_json(html)?;
    let raw: Vec<RawEvent> = serde_json::from_str(json)
        .map_err(|e| WilmaError::Parse(format!("schedule events are not valid JSON: {e}")))?;

    let mut out = Vec::with_capacity(raw.len());
    for ev in raw {
        let Ok(date) = NaiveDate::parse_from_str(ev.date.trim(), "%d.%m.%Y") else {
            debug!("skipping schedule event with date {:?}", ev.date);
            continue;
        };
        let subject = ev.text.as_ref().and_then(first_label).unwrap_or_default();
        if !ev.is_lesson(&subject) {
            continue;
        }
        out.push((
            date,
            LessonEntry {
                start_time: clock(ev.start),
                end_time: clock(ev.end),
                subject,
                room: ev.rooms.as_ref().and_then(first_label).map(strip_prefix),
                teacher: ev.teachers.as_ref().and_then(first_label).map(strip_prefix),
                notes: ev.long_text.as_ref().and_then(first_label),
            },
        ));
    }
    Ok(out)
}

/// Lessons on `date`, ordered by start time.
pub fn lessons_on(events: &[(NaiveDate, LessonEntry)], date: NaiveDate) -> Vec<LessonEntry> {
    let mut lessons: Vec<LessonEntry> = events
        .iter()
        .filter(|(d, _)| *d == date)
        .map(|(_, l)| l.clone())
        .collect();
    sort_lessons(&mut lessons);
    lessons
}

pub fn sort_lessons(lessons: &mut [LessonEntry]) {
    lessons.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then(a.end_time.cmp(&b.end_time))
            .then_with(|| a.subject.cmp(&b.subject))
    });
}

fn events_json(html: &str) -> Result<&str> {
    let m = EVENTS_MARKER
        .find(html)
        .ok_or_else(|| WilmaError::Parse("schedule page has no Events data".into()))?;
    html::json_array_at(html, m.end() - 1)
        .ok_or_else(|| WilmaError::Parse("schedule Events array is not terminated".into()))
}

/// Label fields come as a plain string or as `{"0": "...", "1": "..."}`.
fn first_label(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("0")
            .or_else(|| map.values().next())
            .and_then(Value::as_str),
        Value::Array(items) => items.iter().find_map(Value::as_str),
        _ => None,
    }?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn strip_prefix(label: String) -> String {
    LABEL_PREFIX.replace(&label, "").trim().to_string()
}

fn clock(minutes: i64) -> NaiveTime {
    let m = minutes.clamp(0, MINUTES_PER_DAY - 1) as u32;
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap_or(NaiveTime::MIN)
}
