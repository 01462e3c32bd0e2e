// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Free-text heuristics over workout descriptions.
//!
//! TrainingPeaks descriptions are unstructured; this stage extracts what it
//! can and leaves the rest absent. Failures here never propagate as errors,
//! only as missing optional fields.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{DurationType, ExecutionStatus};

// Duration extraction priority: moving time beats elapsed time beats labeled
// durations beats planned-duration keywords beats bare time patterns.
static MOVING_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)moving\s+time[:\s]*(\d+:\d+(?::\d+)?)").unwrap());
static ELAPSED_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)elapsed\s+time[:\s]*(\d+:\d+(?::\d+)?)").unwrap());
static LABELED_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:duration|planned duration|est\.? time|estimated time)[:\s]+(\d+:[\d:]+)")
        .unwrap()
});
static PLANNED_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:planned|target|goal)\s+(?:time|duration)[:\s]*(\d+:\d+(?::\d+)?)").unwrap()
});
static BARE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}:\d{2}(?::\d{2})?)\b").unwrap());
static PACE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)pace|per|/|split").unwrap());

static DISTANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+\.?\d*)\s*(km|mi|miles?|meters?|m)\b").unwrap());
static TSS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)tss[:\s]*(\d+)").unwrap());
static PACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+:\d+)\s*/\s*(mile|km|mi)").unwrap());
static POWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*w\b|(\d+)%?\s*ftp").unwrap());
static HEART_RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*bpm|hr[:\s]*(\d+)").unwrap());

static COMPLETED_INDICATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bcompleted\b|\bfinished\b|\bdone\b|\bactual\b|moving time|elapsed time")
        .unwrap()
});
static PLANNED_INDICATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bplanned\b|\bscheduled\b|\bestimated\b|\best\.|\bgoal\b|\btarget\b").unwrap()
});

/// Bare time patterns are only accepted as planned durations in this range.
const MIN_PLAUSIBLE_MINUTES: u32 = 5;
const MAX_PLAUSIBLE_MINUTES: u32 = 480;
const MAX_PLAUSIBLE_HOURS: u32 = 8;

/// Structured-or-absent result per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDetails {
    pub duration: Option<String>,
    pub duration_formatted: Option<String>,
    pub planned_duration: Option<String>,
    pub planned_duration_formatted: Option<String>,
    pub distance: Option<String>,
    pub tss: Option<String>,
    pub pace: Option<String>,
    pub power: Option<String>,
    pub heart_rate: Option<String>,
    pub execution_status: Option<ExecutionStatus>,
    pub duration_type: Option<DurationType>,
}

/// Extract structured details from a free-text workout description.
pub fn parse_description(description: &str) -> ParsedDetails {
    let mut details = ParsedDetails::default();
    if description.is_empty() {
        return details;
    }

    if let Some(caps) = MOVING_TIME.captures(description) {
        let raw = caps[1].to_string();
        details.duration_formatted = Some(format_duration_string(&raw));
        details.duration = Some(raw);
        details.duration_type = Some(DurationType::MovingTime);
    } else if let Some(caps) = ELAPSED_TIME.captures(description) {
        let raw = caps[1].to_string();
        details.duration_formatted = Some(format_duration_string(&raw));
        details.duration = Some(raw);
        details.duration_type = Some(DurationType::ElapsedTime);
    } else if let Some(caps) = LABELED_DURATION.captures(description) {
        let raw = caps[1].trim().to_string();
        details.duration_formatted = Some(format_duration_string(&raw));
        details.duration = Some(raw);
    } else if let Some(caps) = PLANNED_DURATION.captures(description) {
        let raw = caps[1].to_string();
        details.planned_duration_formatted = Some(format_duration_string(&raw));
        details.planned_duration = Some(raw);
        details.duration_type = Some(DurationType::Planned);
    } else if !PACE_LIKE.is_match(description) {
        // Bare time patterns are ambiguous; only accept one that looks like a
        // plausible workout duration.
        for caps in BARE_TIME.captures_iter(description) {
            if let Some(raw) = plausible_bare_duration(&caps[1]) {
                details.planned_duration_formatted = Some(format_duration_string(&raw));
                details.planned_duration = Some(raw);
                details.duration_type = Some(DurationType::Planned);
                break;
            }
        }
    }

    if let Some(caps) = DISTANCE.captures(description) {
        details.distance = Some(format!("{} {}", &caps[1], &caps[2]));
    }
    if let Some(caps) = TSS.captures(description) {
        details.tss = Some(caps[1].to_string());
    }
    if let Some(caps) = PACE.captures(description) {
        details.pace = Some(format!("{}/{}", &caps[1], &caps[2]));
    }
    if let Some(m) = POWER.find(description) {
        details.power = Some(m.as_str().to_string());
    }
    if let Some(m) = HEART_RATE.find(description) {
        details.heart_rate = Some(m.as_str().to_string());
    }

    // Completed wins over planned when the text claims both.
    if COMPLETED_INDICATORS.is_match(description) {
        details.execution_status = Some(ExecutionStatus::Completed);
    } else if PLANNED_INDICATORS.is_match(description) {
        details.execution_status = Some(ExecutionStatus::Planned);
    }

    details
}

/// Accept a bare `H:MM`/`MM:SS`/`HH:MM:SS` pattern only in the 5 min - 8 h range.
fn plausible_bare_duration(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.len() {
        2 => {
            let first: u32 = parts[0].parse().ok()?;
            (MIN_PLAUSIBLE_MINUTES..=MAX_PLAUSIBLE_MINUTES)
                .contains(&first)
                .then(|| raw.to_string())
        }
        3 => {
            let hours: u32 = parts[0].parse().ok()?;
            (hours <= MAX_PLAUSIBLE_HOURS).then(|| raw.to_string())
        }
        _ => None,
    }
}

/// Normalize a colon-separated duration string to `1h 5m 3s` form.
///
/// Two-part strings are ambiguous: a first component under 24 is read as
/// hours (`1:30` is an hour and a half), anything larger as minutes.
pub fn format_duration_string(raw: &str) -> String {
    let parts: Vec<Option<i64>> = raw.split(':').map(|p| p.parse().ok()).collect();

    match parts.as_slice() {
        [Some(hours), Some(minutes), Some(seconds)] => {
            if *hours > 0 {
                if *seconds > 0 {
                    format!("{}h {}m {}s", hours, minutes, seconds)
                } else {
                    format!("{}h {}m", hours, minutes)
                }
            } else if *minutes > 0 {
                if *seconds > 0 {
                    format!("{}m {}s", minutes, seconds)
                } else {
                    format!("{}m", minutes)
                }
            } else {
                format!("{}s", seconds)
            }
        }
        [Some(first), Some(second)] => {
            if *first < 24 {
                if *first > 0 {
                    format!("{}h {}m", first, second)
                } else {
                    format!("{}m", second)
                }
            } else {
                format!("{}m {}s", first, second)
            }
        }
        _ => raw.to_string(),
    }
}

/// Render seconds as `H:MM:SS` (or `M:SS`) for the duration formatter.
pub fn seconds_to_clock(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
