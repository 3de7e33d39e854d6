//! Natural-language date expressions in English and Finnish.
//!
//! Bare weekday names resolve to the next occurrence strictly after the
//! reference date: asking for "monday" on a Monday means the Monday a week
//! later.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::{Result, WilmaError};

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("maanantai", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("tiistai", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("keskiviikko", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("torstai", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("perjantai", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("lauantai", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("sunnuntai", Weekday::Sun),
];

pub fn resolve(input: &str, reference: NaiveDate) -> Result<NaiveDate> {
    let key = input.trim().to_lowercase();
    let fail = || WilmaError::DateParse(input.trim().to_string());

    let offset = match key.as_str() {
        "today" | "tänään" | "tanaan" => Some(0),
        "tomorrow" | "huomenna" => Some(1),
        "yesterday" | "eilen" => Some(-1),
        "ylihuomenna" => Some(2),
        "toissapäivänä" | "toissapaivana" => Some(-2),
        _ => None,
    };
    if let Some(days) = offset {
        return shift(reference, days).ok_or_else(fail);
    }

    if let Some(weekday) = weekday(&key) {
        let diff = (weekday.num_days_from_monday() + 7
            - reference.weekday().num_days_from_monday())
            % 7;
        let ahead = if diff == 0 { 7 } else { diff };
        return reference.checked_add_days(Days::new(ahead.into())).ok_or_else(fail);
    }

    parse_literal(&key, reference).ok_or_else(fail)
}

fn weekday(key: &str) -> Option<Weekday> {
    // Finnish essive: "maanantaina" = "on Monday"
    let base = key.strip_suffix("na").unwrap_or(key);
    WEEKDAYS
        .iter()
        .find(|(name, _)| *name == key || *name == base)
        .map(|(_, d)| *d)
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

fn parse_literal(key: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(key, "%d.%m.%Y") {
        return Some(d);
    }
    // "15.3." means this year's 15 March
    let short = key.strip_suffix('.')?;
    let (day, month) = short.split_once('.')?;
    NaiveDate::from_ymd_opt(reference.year(), month.parse().ok()?, day.parse().ok()?)
}
