// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TrainingPeaks iCal feed client and VEVENT extraction.
//!
//! Handles:
//! - webcal:// to https:// rewriting
//! - All-day vs clocked events (a pure date value means all-day)
//! - Duration breakdown when both endpoints carry clock times
//! - Description heuristics via the description parsing stage
//! - Future-dated events forced back to planned status

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use icalendar::{Calendar, CalendarDateTime, Component, DatePerhapsTime, Event};

use crate::error::AppError;
use crate::models::{DurationBreakdown, ExecutionStatus, Workout};
use crate::services::description::parse_description;

const FETCH_TIMEOUT_SECS: u64 = 30;

/// iCal feed client.
#[derive(Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
}

impl Default for CalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .expect("reqwest client"),
        }
    }

    /// Fetch an iCal feed body, rewriting webcal:// to https://.
    pub async fn fetch_calendar(&self, url: &str) -> Result<String, AppError> {
        let url = rewrite_webcal(url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::CalendarFeed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::CalendarFeed(format!(
                "HTTP {} from calendar feed",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::CalendarFeed(e.to_string()))
    }
}

/// Rewrite a webcal:// URL to https://.
pub fn rewrite_webcal(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Parse iCal content into workouts keyed by UID.
///
/// Events that cannot be extracted are skipped individually; they never
/// abort the batch.
pub fn parse_calendar(
    content: &str,
    today: NaiveDate,
) -> Result<BTreeMap<String, Workout>, AppError> {
    let calendar: Calendar = content
        .parse()
        .map_err(|e: String| AppError::CalendarFeed(format!("invalid iCal content: {}", e)))?;

    let mut workouts = BTreeMap::new();
    for event in calendar.components.iter().filter_map(|c| c.as_event()) {
        match extract_workout(event, today) {
            Some(workout) => {
                workouts.insert(workout.uid.clone(), workout);
            }
            None => {
                tracing::warn!(
                    summary = event.get_summary().unwrap_or_default(),
                    "Skipping calendar event without usable UID/start"
                );
            }
        }
    }

    Ok(workouts)
}

/// A DTSTART/DTEND value resolved to an instant and/or calendar date.
struct EventInstant {
    instant: Option<DateTime<Utc>>,
    date: NaiveDate,
}

/// TrainingPeaks emits naive times in UTC, so floating (and unresolvable
/// TZID) values are read as UTC.
fn resolve_instant(value: DatePerhapsTime) -> EventInstant {
    match value {
        DatePerhapsTime::Date(date) => EventInstant {
            instant: None,
            date,
        },
        DatePerhapsTime::DateTime(dt) => {
            let instant = match dt {
                CalendarDateTime::Utc(utc) => utc,
                CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
                CalendarDateTime::WithTimezone { date_time, .. } => {
                    Utc.from_utc_datetime(&date_time)
                }
            };
            EventInstant {
                instant: Some(instant),
                date: instant.date_naive(),
            }
        }
    }
}

/// Extract a workout from one VEVENT, or None if the event is unusable.
fn extract_workout(event: &Event, today: NaiveDate) -> Option<Workout> {
    let uid = event.get_uid()?.to_string();
    if uid.is_empty() {
        return None;
    }

    let start = event.get_start().map(resolve_instant);
    let end = event.get_end().map(resolve_instant);

    // An all-day event carries a pure date value, no usable clock time.
    let is_all_day = matches!(&start, Some(EventInstant { instant: None, .. }));

    let duration = match (&start, &end) {
        (
            Some(EventInstant {
                instant: Some(start_at),
                ..
            }),
            Some(EventInstant {
                instant: Some(end_at),
                ..
            }),
        ) => Some(DurationBreakdown::from_seconds(
            (*end_at - *start_at).num_seconds(),
        )),
        _ => None,
    };

    let description = event.get_description().unwrap_or_default().to_string();
    let details = parse_description(&description);

    // Future workouts can never be completed, whatever the text claims.
    let mut execution_status = details.execution_status;
    if execution_status == Some(ExecutionStatus::Completed) {
        if let Some(date) = start.as_ref().map(|s| s.date) {
            if date > today {
                execution_status = Some(ExecutionStatus::Planned);
            }
        }
    }

    Some(Workout {
        uid,
        summary: event.get_summary().unwrap_or_default().to_string(),
        description,
        start_time: start.as_ref().and_then(|s| s.instant),
        start_date: start.as_ref().map(|s| s.date),
        end_time: end.as_ref().and_then(|e| e.instant),
        end_date: end.as_ref().map(|e| e.date),
        is_all_day,
        has_time: !is_all_day,
        duration,
        location: event.property_value("LOCATION").map(str::to_string),
        status: event.property_value("STATUS").map(str::to_string),
        sequence: event
            .property_value("SEQUENCE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        created: event.property_value("CREATED").and_then(parse_ical_utc),
        last_modified: event
            .property_value("LAST-MODIFIED")
            .and_then(parse_ical_utc),
        categories: event.property_value("CATEGORIES").map(str::to_string),
        parsed_duration: details.duration,
        parsed_duration_formatted: details.duration_formatted,
        parsed_planned_duration: details.planned_duration,
        parsed_planned_duration_formatted: details.planned_duration_formatted,
        parsed_distance: details.distance,
        parsed_tss: details.tss,
        parsed_pace: details.pace,
        parsed_power: details.power,
        parsed_heart_rate: details.heart_rate,
        parsed_execution_status: execution_status,
        duration_type: details.duration_type,
        ..Default::default()
    })
}

/// Parse a raw iCal UTC timestamp property (`20240115T090000Z`).
fn parse_ical_utc(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_rewrite_webcal() {
        assert_eq!(
            rewrite_webcal("webcal://example.com/cal.ics"),
            "https://example.com/cal.ics"
        );
        assert_eq!(
            rewrite_webcal("https://example.com/cal.ics"),
            "https://example.com/cal.ics"
        );
    }

    #[test]
    fn test_parse_timed_event() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   PRODID:-//TrainingPeaks//CalendarExport//EN\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:tp-100\r\n\
                   SUMMARY:Morning Run\r\n\
                   DTSTART:20240114T090000Z\r\n\
                   DTEND:20240114T100000Z\r\n\
                   DESCRIPTION:Moving Time: 58:30\r\n\
                   STATUS:CONFIRMED\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let workouts = parse_calendar(ics, sample_today()).unwrap();
        assert_eq!(workouts.len(), 1);

        let workout = &workouts["tp-100"];
        assert_eq!(workout.summary, "Morning Run");
        assert!(!workout.is_all_day);
        assert!(workout.has_time);
        assert_eq!(
            workout.start_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap())
        );
        assert_eq!(
            workout.duration.as_ref().map(|d| d.total_seconds),
            Some(3600)
        );
        assert_eq!(workout.parsed_duration.as_deref(), Some("58:30"));
        assert_eq!(
            workout.parsed_execution_status,
            Some(ExecutionStatus::Completed)
        );
    }

    #[test]
    fn test_parse_all_day_event() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:tp-200\r\n\
                   SUMMARY:Bike Intervals\r\n\
                   DTSTART;VALUE=DATE:20240116\r\n\
                   DESCRIPTION:Planned 1:30 endurance ride\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let workouts = parse_calendar(ics, sample_today()).unwrap();
        let workout = &workouts["tp-200"];

        assert!(workout.is_all_day);
        assert!(!workout.has_time);
        assert_eq!(workout.start_time, None);
        assert_eq!(
            workout.start_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap())
        );
        // All-day entries never get a computed duration
        assert_eq!(workout.duration, None);
        assert_eq!(
            workout.parsed_execution_status,
            Some(ExecutionStatus::Planned)
        );
    }

    #[test]
    fn test_future_event_forced_to_planned() {
        // Dated tomorrow but the description claims completion
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:tp-300\r\n\
                   SUMMARY:5k Run\r\n\
                   DTSTART;VALUE=DATE:20240116\r\n\
                   DESCRIPTION:completed 5k run\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let workouts = parse_calendar(ics, sample_today()).unwrap();
        assert_eq!(
            workouts["tp-300"].parsed_execution_status,
            Some(ExecutionStatus::Planned)
        );
    }

    #[test]
    fn test_naive_times_read_as_utc() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:tp-400\r\n\
                   SUMMARY:Swim\r\n\
                   DTSTART:20240114T070000\r\n\
                   DTEND:20240114T080000\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let workouts = parse_calendar(ics, sample_today()).unwrap();
        let workout = &workouts["tp-400"];
        assert_eq!(
            workout.start_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 14, 7, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_content_is_an_error() {
        assert!(parse_calendar("not a calendar", sample_today()).is_err());
    }
}
