//! Calendar domain logic for the baby tracker.
//!
//! Events are attributed to local calendar days. Most events occupy the day
//! of their timestamp; a sleep with an end time occupies every day from its
//! start through its end. A sleep without an end time stays on its start day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use log::debug;
use shared::{CalendarDay, CalendarDayType, CalendarMonth, Event, EventDetails, EventKind};
use std::collections::BTreeMap;

/// Calendar service that handles all calendar-related business logic
#[derive(Clone, Default)]
pub struct CalendarService;

impl CalendarService {
    pub fn new() -> Self {
        Self
    }

    /// Inclusive range of local dates the event occupies
    pub fn event_span<Tz: TimeZone>(&self, event: &Event, tz: &Tz) -> (NaiveDate, NaiveDate) {
        let start = event.timestamp.with_timezone(tz).date_naive();
        let end = event
            .end_boundary()
            .map(|end| end.with_timezone(tz).date_naive())
            .filter(|end| *end >= start)
            .unwrap_or(start);
        (start, end)
    }

    /// Events of a permitted kind whose span contains `date`
    pub fn events_for_date<Tz: TimeZone>(
        &self,
        events: &[Event],
        date: NaiveDate,
        tz: &Tz,
        allowed_kinds: &[EventKind],
    ) -> Vec<Event> {
        events
            .iter()
            .filter(|event| allowed_kinds.contains(&event.kind()))
            .filter(|event| {
                let (start, end) = self.event_span(event, tz);
                start <= date && date <= end
            })
            .cloned()
            .collect()
    }

    /// Map of every occupied date to its events, each event listed under
    /// every date of its span
    pub fn group_by_date_spanning<Tz: TimeZone>(
        &self,
        events: &[Event],
        tz: &Tz,
        allowed_kinds: &[EventKind],
    ) -> BTreeMap<NaiveDate, Vec<Event>> {
        let mut grouped: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for event in events.iter().filter(|event| allowed_kinds.contains(&event.kind())) {
            let (start, end) = self.event_span(event, tz);
            for date in start.iter_days().take_while(|date| *date <= end) {
                grouped.entry(date).or_default().push(event.clone());
            }
        }
        grouped
    }

    /// Generate a month grid with per-day event counts and sleep totals
    pub fn generate_calendar_month<Tz: TimeZone>(
        &self,
        month: u32,
        year: i32,
        events: &[Event],
        tz: &Tz,
        allowed_kinds: &[EventKind],
    ) -> CalendarMonth {
        let days_in_month = self.days_in_month(month, year);
        let first_day = self.first_day_of_month(month, year);
        let grouped = self.group_by_date_spanning(events, tz, allowed_kinds);

        debug!(
            "Generating calendar for {}/{}: {} days, first weekday {}",
            month, year, days_in_month, first_day
        );

        let mut days = Vec::new();
        for _ in 0..first_day {
            days.push(Self::padding_day(CalendarDayType::PaddingBefore));
        }

        for day in 1..=days_in_month {
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            let day_events = grouped.get(&date).map(Vec::as_slice).unwrap_or_default();

            let mut event_counts = BTreeMap::new();
            for event in day_events {
                *event_counts.entry(event.kind()).or_insert(0) += 1;
            }
            let sleep_minutes = day_events
                .iter()
                .map(|event| self.sleep_minutes_on(event, date, tz))
                .sum();

            days.push(CalendarDay {
                day,
                day_type: CalendarDayType::MonthDay,
                event_counts,
                sleep_minutes,
            });
        }

        while days.len() % 7 != 0 {
            days.push(Self::padding_day(CalendarDayType::PaddingAfter));
        }

        CalendarMonth {
            month,
            year,
            days,
            first_day_of_week: first_day,
        }
    }

    /// Minutes of a finished sleep that fall within the local `date`
    pub fn sleep_minutes_on<Tz: TimeZone>(&self, event: &Event, date: NaiveDate, tz: &Tz) -> i64 {
        let EventDetails::Sleep(sleep) = &event.details else {
            return 0;
        };
        let Some(end) = sleep.end_time else {
            return 0;
        };
        let begin = sleep.begin_time.unwrap_or(event.timestamp);
        let (Some(day_start), Some(day_end)) = (
            Self::local_midnight(date, tz),
            date.succ_opt().and_then(|next| Self::local_midnight(next, tz)),
        ) else {
            return 0;
        };

        let overlap_start = begin.max(day_start);
        let overlap_end = end.min(day_end);
        if overlap_end <= overlap_start {
            0
        } else {
            (overlap_end - overlap_start).num_minutes()
        }
    }

    fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        tz.from_local_datetime(&midnight)
            .earliest()
            // Midnight skipped by a DST change; the day starts an hour later
            .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
            .map(|local| local.with_timezone(&Utc))
    }

    fn padding_day(day_type: CalendarDayType) -> CalendarDay {
        CalendarDay {
            day: 0,
            day_type,
            event_counts: BTreeMap::new(),
            sleep_minutes: 0,
        }
    }

    /// Get the number of days in a given month and year
    pub fn days_in_month(&self, month: u32, year: i32) -> u32 {
        match month {
            2 => {
                if self.is_leap_year(year) {
                    29
                } else {
                    28
                }
            }
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    pub fn is_leap_year(&self, year: i32) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    /// Get the first day of month (0 = Sunday, 1 = Monday, etc.)
    pub fn first_day_of_month(&self, month: u32, year: i32) -> u32 {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|date| date.weekday().num_days_from_sunday())
            .unwrap_or(0)
    }

    pub fn month_name(&self, month: u32) -> &'static str {
        match month {
            1 => "January", 2 => "February", 3 => "March", 4 => "April",
            5 => "May", 6 => "June", 7 => "July", 8 => "August",
            9 => "September", 10 => "October", 11 => "November", 12 => "December",
            _ => "Invalid Month",
        }
    }

    pub fn previous_month(&self, month: u32, year: i32) -> (u32, i32) {
        if month <= 1 {
            (12, year - 1)
        } else {
            (month - 1, year)
        }
    }

    pub fn next_month(&self, month: u32, year: i32) -> (u32, i32) {
        if month >= 12 {
            (1, year + 1)
        } else {
            (month + 1, year)
        }
    }
}
