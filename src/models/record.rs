// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-UID lifecycle record: current state plus append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::changes::FieldChanges;
use crate::models::Workout;

/// What happened to a workout in one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Added,
    Modified,
    Deleted,
}

/// Why a workout disappeared from the feeds.
///
/// Advisory metadata only: it distinguishes "coach deleted this" from "the
/// feed's rolling window moved on" but never changes what is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionType {
    Deleted,
    DeletedFuture,
    DeletedRecent,
    NotExecutedAgedOut,
    AgedOutCompleted,
    AgedOutNotExecuted,
}

/// One entry in a workout's permanent history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Workout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<FieldChanges>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_type: Option<DeletionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
}

impl HistoryEntry {
    pub fn new(timestamp: DateTime<Utc>, action: HistoryAction) -> Self {
        Self {
            timestamp,
            action,
            data: None,
            changes: None,
            deletion_type: None,
            reason: None,
            replaced_by: None,
        }
    }
}

/// Stored unit, one per UID for the lifetime of the store file.
///
/// `current == None` means "currently considered deleted"; the history log
/// still holds everything ever observed for this identity and is never
/// mutated or pruned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub current: Option<Workout>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}
