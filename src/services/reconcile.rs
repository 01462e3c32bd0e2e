// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconciliation of the two workout feeds into one logical set.
//!
//! Policy: completed Strava data always wins over planned TrainingPeaks data
//! for the same physical activity. Matching is first-fit over a BTreeMap, so
//! the scan order is the lexicographic UID order and stable across refreshes.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::models::{ExecutionStatus, Source, Workout};

/// Maximum start-time distance for a today/future match.
const TIME_PROXIMITY_SECS: i64 = 3600;

/// Which feeds participate in a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnabledSources {
    pub tp: bool,
    pub strava: bool,
}

impl EnabledSources {
    /// Parse the wire form (`["tp", "strava"]`). Unknown names are ignored.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut enabled = Self::default();
        for name in names {
            match name.as_ref() {
                "tp" => enabled.tp = true,
                "strava" => enabled.strava = true,
                other => tracing::warn!(source = other, "Ignoring unknown source name"),
            }
        }
        enabled
    }

    pub fn any(&self) -> bool {
        self.tp || self.strava
    }
}

/// Find the TrainingPeaks workout that denotes the same physical activity as
/// a Strava candidate, if any.
///
/// Gates, in order: same calendar date, compatible sport, temporal
/// compatibility. Past workouts (strictly before `today`) are assumed 1:1
/// per day per sport, so any same-date/same-sport entry matches; today and
/// future need start times within an hour of each other. First qualifying
/// pool entry wins.
pub fn find_matching_tp_workout(
    candidate: &Workout,
    pool: &BTreeMap<String, Workout>,
    already_matched: &HashSet<String>,
    today: NaiveDate,
) -> Option<String> {
    let candidate_date = candidate.date()?;
    let candidate_type = candidate
        .activity_type
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let candidate_summary = candidate.summary.to_lowercase();
    let is_past = candidate_date < today;

    for (tp_uid, tp_workout) in pool {
        if already_matched.contains(tp_uid) {
            continue;
        }

        if tp_workout.date() != Some(candidate_date) {
            continue;
        }

        let tp_summary = tp_workout.summary.to_lowercase();
        if !activities_match(&candidate_type, &candidate_summary, &tp_summary) {
            continue;
        }

        if is_past {
            return Some(tp_uid.clone());
        }

        // Today or future: need clock-time proximity on both sides.
        if let (Some(candidate_start), Some(tp_start)) =
            (candidate.start_time, tp_workout.start_time)
        {
            let delta = (candidate_start - tp_start).num_seconds().abs();
            if delta <= TIME_PROXIMITY_SECS {
                return Some(tp_uid.clone());
            }
        }
    }

    None
}

/// Symmetric keyword-overlap test across known sport synonym groups.
fn activities_match(strava_type: &str, strava_summary: &str, tp_summary: &str) -> bool {
    let ride_names = ["ride", "bike", "virtualride"];
    let tp_ride_names = ["bike", "ride"];

    if strava_type.contains("run") && tp_summary.contains("run") {
        return true;
    }
    if ride_names.iter().any(|x| strava_type.contains(x))
        && tp_ride_names.iter().any(|x| tp_summary.contains(x))
    {
        return true;
    }
    if strava_type.contains("swim") && tp_summary.contains("swim") {
        return true;
    }
    if tp_summary.contains(strava_type) {
        return true;
    }

    // Zwift sessions are rides whatever the sport tag says
    if strava_summary.contains("zwift") && tp_ride_names.iter().any(|x| tp_summary.contains(x)) {
        return true;
    }

    false
}

/// A planned calendar entry whose date already passed without execution is
/// assumed abandoned and dropped from the merged set.
fn is_past_planned_tp_workout(workout: &Workout, today: NaiveDate) -> bool {
    let Some(date) = workout.date() else {
        return false;
    };
    if date >= today {
        return false;
    }
    if workout.parsed_execution_status == Some(ExecutionStatus::Completed) {
        return false;
    }
    // Only calendar-sourced entries age out this way
    matches!(workout.source, None | Some(Source::TrainingPeaks))
}

/// Merge the two feeds into one set keyed by UID.
///
/// Strava workouts keep their own UID and record the calendar UID they
/// replace; the replaced calendar UID is not emitted at all. Unmatched
/// calendar workouts are normalized to `source = training_peaks`.
pub fn merge_workouts_by_source(
    tp_workouts: &BTreeMap<String, Workout>,
    strava_workouts: &BTreeMap<String, Workout>,
    enabled: EnabledSources,
    today: NaiveDate,
) -> BTreeMap<String, Workout> {
    let mut merged = BTreeMap::new();
    let mut matched_tp_uids: HashSet<String> = HashSet::new();

    if enabled.strava {
        for (uid, workout) in strava_workouts {
            let mut workout = workout.clone();

            if enabled.tp {
                if let Some(tp_uid) =
                    find_matching_tp_workout(&workout, tp_workouts, &matched_tp_uids, today)
                {
                    matched_tp_uids.insert(tp_uid.clone());
                    workout.replaced_tp_uid = Some(tp_uid);
                }
            }

            merged.insert(uid.clone(), workout);
        }
    }

    if enabled.tp {
        for (uid, workout) in tp_workouts {
            if matched_tp_uids.contains(uid) {
                continue;
            }
            if is_past_planned_tp_workout(workout, today) {
                continue;
            }

            let mut workout = workout.clone();
            workout.source = Some(Source::TrainingPeaks);
            merged.insert(uid.clone(), workout);
        }
    }

    merged
}
