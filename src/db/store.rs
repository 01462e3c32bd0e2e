// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable workout store with change tracking.
//!
//! One JSON document per calendar-feed identity:
//! `{last_updated, workouts: {uid: {current, history}}, change_log: [...]}`.
//!
//! The store owns the on-disk snapshot exclusively. Every update computes a
//! field-level diff against the previous merged state; history logs are
//! append-only and survive deletion and re-addition of a UID.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{
    ChangeSet, Deletion, DeletionType, FieldChange, FieldChanges, HistoryAction, HistoryEntry,
    Modification, Movement, Source, Workout, WorkoutRecord,
};
use crate::time_utils::floor_days_between;

/// On-disk document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub workouts: BTreeMap<String, WorkoutRecord>,
    #[serde(default)]
    pub change_log: Vec<ChangeSet>,
}

/// File-backed workout store.
pub struct WorkoutStore {
    path: PathBuf,
    data: StoreData,
}

impl WorkoutStore {
    /// Load a store from disk.
    ///
    /// A missing file is a fresh store; a corrupt file is treated as no prior
    /// state and reinitialized empty rather than failing the refresh.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Workout store corrupt, reinitializing empty"
                    );
                    StoreData::default()
                }
            },
            Err(_) => StoreData::default(),
        };

        Self { path, data }
    }

    /// Persist via temp-file-and-rename so a crashed writer never leaves a
    /// torn store behind.
    pub fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("creating {}: {}", parent.display(), e)))?;
        }

        let body = serde_json::to_string_pretty(&self.data)
            .map_err(|e| AppError::Store(format!("serializing store: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, body)
            .map_err(|e| AppError::Store(format!("writing {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| AppError::Store(format!("replacing {}: {}", self.path.display(), e)))?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.data.last_updated
    }

    /// All workouts currently considered live (non-null `current`).
    pub fn current_workouts(&self) -> BTreeMap<String, Workout> {
        self.data
            .workouts
            .iter()
            .filter_map(|(uid, record)| record.current.clone().map(|w| (uid.clone(), w)))
            .collect()
    }

    /// Full lifecycle record for one UID.
    pub fn record(&self, uid: &str) -> Option<&WorkoutRecord> {
        self.data.workouts.get(uid)
    }

    /// The most recent change sets, newest last.
    pub fn change_log(&self, limit: Option<usize>) -> &[ChangeSet] {
        let log = &self.data.change_log;
        match limit {
            Some(n) => &log[log.len().saturating_sub(n)..],
            None => log,
        }
    }

    /// Apply one refresh cycle's merged workout set and persist the result.
    ///
    /// Returns the delta against the previous state. Applying the same input
    /// twice yields an empty second ChangeSet.
    pub fn update(
        &mut self,
        new_workouts: &BTreeMap<String, Workout>,
        now: DateTime<Utc>,
    ) -> Result<ChangeSet, AppError> {
        let current = self.current_workouts();
        let mut changes = ChangeSet::new(now);
        let mut replaced_uids: HashSet<String> = HashSet::new();

        for (uid, new_workout) in new_workouts {
            // A workout carrying replaced_tp_uid supersedes that calendar
            // entry: record the replacement deletion while the entry is
            // still live, and keep it out of the deletion scan below.
            if let Some(replaced_uid) = &new_workout.replaced_tp_uid {
                replaced_uids.insert(replaced_uid.clone());

                if let Some(old_workout) = current.get(replaced_uid) {
                    let source = new_workout.source.unwrap_or(Source::TrainingPeaks);
                    let reason = format!("replaced_by_{}", source.as_str());

                    changes.deletions.push(Deletion {
                        uid: replaced_uid.clone(),
                        summary: old_workout.summary.clone(),
                        reason: Some(reason.clone()),
                        deletion_type: None,
                        workout: None,
                    });

                    if let Some(record) = self.data.workouts.get_mut(replaced_uid) {
                        record.history.push(HistoryEntry {
                            reason: Some(reason),
                            replaced_by: Some(uid.clone()),
                            ..HistoryEntry::new(now, HistoryAction::Deleted)
                        });
                        record.current = None;
                    }
                }
            }

            match current.get(uid) {
                None => {
                    changes.additions.push(new_workout.clone());

                    // Re-added UIDs keep their existing history
                    let record = self.data.workouts.entry(uid.clone()).or_default();
                    record.current = Some(new_workout.clone());
                    record.history.push(HistoryEntry {
                        data: Some(new_workout.clone()),
                        ..HistoryEntry::new(now, HistoryAction::Added)
                    });
                }
                Some(old_workout) => {
                    let Some(diff) = field_changes(old_workout, new_workout) else {
                        continue;
                    };

                    changes.modifications.push(Modification {
                        uid: uid.clone(),
                        old: old_workout.clone(),
                        new: new_workout.clone(),
                        changes: diff.clone(),
                    });

                    if diff.contains_key("start_time") || diff.contains_key("end_time") {
                        changes.movements.push(Movement {
                            uid: uid.clone(),
                            summary: new_workout.summary.clone(),
                            old_start: old_workout.start_time,
                            new_start: new_workout.start_time,
                        });
                    }

                    if let Some(record) = self.data.workouts.get_mut(uid) {
                        record.current = Some(new_workout.clone());
                        record.history.push(HistoryEntry {
                            data: Some(new_workout.clone()),
                            changes: Some(diff),
                            ..HistoryEntry::new(now, HistoryAction::Modified)
                        });
                    }
                }
            }
        }

        // Deletion scan: anything live that left the merged set. Completed
        // workouts are permanent records; a rolling-window feed dropping
        // them is not a deletion.
        for (uid, old_workout) in &current {
            if new_workouts.contains_key(uid) || replaced_uids.contains(uid) {
                continue;
            }
            if old_workout.was_completed() {
                continue;
            }

            let deletion_type = classify_deletion(old_workout, now);
            changes.deletions.push(Deletion {
                uid: uid.clone(),
                summary: old_workout.summary.clone(),
                reason: None,
                deletion_type: Some(deletion_type),
                workout: Some(old_workout.clone()),
            });

            if let Some(record) = self.data.workouts.get_mut(uid) {
                record.history.push(HistoryEntry {
                    data: Some(old_workout.clone()),
                    deletion_type: Some(deletion_type),
                    ..HistoryEntry::new(now, HistoryAction::Deleted)
                });
                record.current = None;
            }
        }

        self.data.last_updated = Some(now);
        if !changes.is_empty() {
            self.data.change_log.push(changes.clone());
        }
        self.save()?;

        Ok(changes)
    }
}

/// Classify why a non-completed workout left the feeds.
///
/// TrainingPeaks iCal feeds typically expose 4-7 days of the past and
/// 6-14 days of the future, so a disappearance a few days back is usually
/// the window moving on rather than a coach deleting the entry. The
/// classification is advisory only and never changes what is retained.
pub fn classify_deletion(workout: &Workout, now: DateTime<Utc>) -> DeletionType {
    // Date-only entries are read as midnight UTC, mirroring the
    // naive-vs-aware normalization the feeds already get.
    let reference = workout
        .start_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .or(workout.start_time);

    let Some(reference) = reference else {
        // Can't determine, assume deliberate deletion
        return DeletionType::Deleted;
    };

    let days_since = floor_days_between(now, reference);
    let was_completed = workout.was_completed();

    if days_since < 0 {
        // Removing a future workout is always a coach action
        DeletionType::DeletedFuture
    } else if days_since <= 2 {
        if was_completed || days_since == 0 {
            DeletionType::DeletedRecent
        } else {
            DeletionType::NotExecutedAgedOut
        }
    } else if days_since <= 5 {
        if was_completed {
            DeletionType::AgedOutCompleted
        } else {
            DeletionType::NotExecutedAgedOut
        }
    } else if was_completed {
        DeletionType::AgedOutCompleted
    } else {
        DeletionType::AgedOutNotExecuted
    }
}

/// Field-level diff over the fixed comparison set.
fn field_changes(old: &Workout, new: &Workout) -> Option<FieldChanges> {
    let mut changes = FieldChanges::new();

    diff_field(&mut changes, "summary", &old.summary, &new.summary);
    diff_field(&mut changes, "description", &old.description, &new.description);
    diff_field(&mut changes, "start_time", &old.start_time, &new.start_time);
    diff_field(&mut changes, "end_time", &old.end_time, &new.end_time);
    diff_field(&mut changes, "start_date", &old.start_date, &new.start_date);
    diff_field(&mut changes, "location", &old.location, &new.location);
    diff_field(&mut changes, "status", &old.status, &new.status);
    diff_field(&mut changes, "sequence", &old.sequence, &new.sequence);
    diff_field(&mut changes, "is_all_day", &old.is_all_day, &new.is_all_day);
    diff_field(&mut changes, "duration", &old.duration, &new.duration);
    diff_field(
        &mut changes,
        "parsed_duration",
        &old.parsed_duration,
        &new.parsed_duration,
    );
    diff_field(
        &mut changes,
        "parsed_planned_duration",
        &old.parsed_planned_duration,
        &new.parsed_planned_duration,
    );
    diff_field(
        &mut changes,
        "parsed_distance",
        &old.parsed_distance,
        &new.parsed_distance,
    );
    diff_field(
        &mut changes,
        "duration_type",
        &old.duration_type,
        &new.duration_type,
    );
    diff_field(&mut changes, "source", &old.source, &new.source);
    diff_field(
        &mut changes,
        "activity_type",
        &old.activity_type,
        &new.activity_type,
    );
    diff_field(
        &mut changes,
        "strava_average_heartrate",
        &old.strava.average_heartrate,
        &new.strava.average_heartrate,
    );
    diff_field(
        &mut changes,
        "strava_average_watts",
        &old.strava.average_watts,
        &new.strava.average_watts,
    );
    diff_field(
        &mut changes,
        "strava_calories",
        &old.strava.calories,
        &new.strava.calories,
    );

    (!changes.is_empty()).then_some(changes)
}

fn diff_field<T: Serialize + PartialEq>(
    changes: &mut FieldChanges,
    name: &str,
    old: &T,
    new: &T,
) {
    if old != new {
        changes.insert(
            name.to_string(),
            FieldChange {
                old: serde_json::to_value(old).unwrap_or(serde_json::Value::Null),
                new: serde_json::to_value(new).unwrap_or(serde_json::Value::Null),
            },
        );
    }
}
