use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonEntry {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject: String,
    pub room: Option<String>,
    pub teacher: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    /// Ordered by start time.
    pub lessons: Vec<LessonEntry>,
    /// Set when the page could not be read and `lessons` is empty because of it.
    pub diagnostic: Option<String>,
}

impl DaySchedule {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            lessons: Vec::new(),
            diagnostic: None,
        }
    }
}

/// Seven consecutive days, each present even when it has no lessons.
#[derive(Debug, Clone, Serialize)]
pub struct WeekSchedule {
    pub days: BTreeMap<NaiveDate, Vec<LessonEntry>>,
    pub diagnostics: Vec<String>,
}

impl WeekSchedule {
    pub fn day(&self, date: NaiveDate) -> DaySchedule {
        DaySchedule {
            date,
            lessons: self.days.get(&date).cloned().unwrap_or_default(),
            diagnostic: None,
        }
    }
}
