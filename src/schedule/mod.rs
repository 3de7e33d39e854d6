pub mod parser;

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Days, NaiveDate};
use log::warn;

use crate::auth::SessionManager;
use crate::domain::{DaySchedule, LessonEntry, WeekSchedule};
use crate::error::{Result, WilmaError};

/// Fetches schedule pages and turns their embedded event data into lessons.
pub struct ScheduleExtractor<'a> {
    session: &'a SessionManager,
}

impl<'a> ScheduleExtractor<'a> {
    pub fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Lessons on `date`. A page we cannot read gives an empty day with a diagnostic.
    pub fn get_schedule(&self, date: NaiveDate) -> Result<DaySchedule> {
        match self.fetch_events(date) {
            Ok(events) => Ok(DaySchedule {
                date,
                lessons: parser::lessons_on(&events, date),
                diagnostic: None,
            }),
            Err(WilmaError::Parse(msg)) => {
                warn!("schedule for {date}: {msg}");
                Ok(DaySchedule {
                    diagnostic: Some(msg),
                    ..DaySchedule::empty(date)
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Seven days starting at `start`, every day present.
    ///
    /// One schedule page covers one week, so a window crossing a week boundary
    /// needs two pages.
    pub fn get_week_schedule(&self, start: NaiveDate) -> Result<WeekSchedule> {
        let dates: Vec<NaiveDate> = (0..7u64)
            .filter_map(|i| start.checked_add_days(Days::new(i)))
            .collect();

        let mut days: BTreeMap<NaiveDate, Vec<LessonEntry>> =
            dates.iter().map(|d| (*d, Vec::new())).collect();
        let mut diagnostics = Vec::new();
        let mut fetched_weeks = HashSet::new();

        for date in &dates {
            let week = date.iso_week();
            if !fetched_weeks.insert((week.year(), week.week())) {
                continue;
            }
            match self.fetch_events(*date) {
                Ok(events) => {
                    for (day, lesson) in events {
                        if let Some(bucket) = days.get_mut(&day) {
                            bucket.push(lesson);
                        }
                    }
                }
                Err(WilmaError::Parse(msg)) => {
                    warn!("schedule week of {date}: {msg}");
                    diagnostics.push(format!("week of {date}: {msg}"));
                }
                Err(e) => return Err(e),
            }
        }

        for lessons in days.values_mut() {
            parser::sort_lessons(lessons);
        }
        Ok(WeekSchedule { days, diagnostics })
    }

    fn fetch_events(&self, date: NaiveDate) -> Result<Vec<(NaiveDate, LessonEntry)>> {
        let path = format!("/schedule?date={}", date.format("%d.%m.%Y"));
        let resp = self.session.get(&path)?.error_for_status()?;
        parser::parse_events(&resp.body)
    }
}
