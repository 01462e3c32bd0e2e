// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Canonical workout record shared by both feeds.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Feed a workout is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    TrainingPeaks,
    Strava,
}

impl Source {
    /// Wire name, as used in `replaced_by_<source>` deletion reasons.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::TrainingPeaks => "training_peaks",
            Source::Strava => "strava",
        }
    }
}

/// Whether a workout was executed or is still on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Planned,
}

/// Which description field a parsed duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    MovingTime,
    ElapsedTime,
    Planned,
}

/// Structured duration derived from concrete start/end clock times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBreakdown {
    pub total_seconds: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub formatted: String,
}

impl DurationBreakdown {
    pub fn from_seconds(total_seconds: i64) -> Self {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        let formatted = if hours > 0 {
            if seconds > 0 {
                format!("{}h {}m {}s", hours, minutes, seconds)
            } else {
                format!("{}h {}m", hours, minutes)
            }
        } else if minutes > 0 {
            if seconds > 0 {
                format!("{}m {}s", minutes, seconds)
            } else {
                format!("{}m", minutes)
            }
        } else {
            format!("{}s", seconds)
        };

        Self {
            total_seconds,
            hours,
            minutes,
            seconds,
            formatted,
        }
    }
}

/// Strava performance metrics, carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StravaMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moving_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_elevation_gain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_heartrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heartrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_watts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kilojoules: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
}

impl StravaMetrics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One workout as seen by a feed, normalized to a common shape.
///
/// Calendar entries get their feed-assigned UID; activity-feed entries get
/// `strava_<activity_id>`. UIDs are never reused across sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub uid: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub has_time: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,

    // Free-text-derived fields. Absent when the heuristics found nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_duration_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_planned_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_planned_duration_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_distance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_tss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_pace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_power: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_heart_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_execution_status: Option<ExecutionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_type: Option<DurationType>,

    /// Set by the reconciler when this workout supersedes a calendar entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_tp_uid: Option<String>,

    #[serde(default, skip_serializing_if = "StravaMetrics::is_empty")]
    pub strava: StravaMetrics,
}

impl Workout {
    /// Calendar date of the workout, from `start_date` or the clock time.
    pub fn date(&self) -> Option<NaiveDate> {
        self.start_date
            .or_else(|| self.start_time.map(|t| t.date_naive()))
    }

    /// Whether this workout was executed.
    ///
    /// Executed workouts carry a completed status or a concrete clock time;
    /// all-day entries are plans without one.
    pub fn was_completed(&self) -> bool {
        self.parsed_execution_status == Some(ExecutionStatus::Completed)
            || self.status.as_deref() == Some("COMPLETED")
            || (self.has_time && !self.is_all_day)
    }
}
