// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The diff artifact produced by one refresh cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::record::DeletionType;
use crate::models::Workout;

/// Old and new value of one compared field.
///
/// Values are JSON so heterogeneous fields (strings, dates, nested duration
/// blocks) share one representation in the stored diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// Field-name → change map, ordered for stable serialization.
pub type FieldChanges = BTreeMap<String, FieldChange>;

/// A workout whose compared fields differ from the stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub uid: String,
    pub old: Workout,
    pub new: Workout,
    pub changes: FieldChanges,
}

/// A workout that left the current set this cycle.
///
/// Replacement deletions carry a `reason` (`replaced_by_<source>`); window
/// deletions carry the classification and the full final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deletion {
    pub uid: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_type: Option<DeletionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout: Option<Workout>,
}

/// A modification that moved a workout's start or end time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub uid: String,
    pub summary: String,
    pub old_start: Option<DateTime<Utc>>,
    pub new_start: Option<DateTime<Utc>>,
}

/// Everything that changed in one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub additions: Vec<Workout>,
    #[serde(default)]
    pub modifications: Vec<Modification>,
    #[serde(default)]
    pub deletions: Vec<Deletion>,
    #[serde(default)]
    pub movements: Vec<Movement>,
}

impl ChangeSet {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            additions: Vec::new(),
            modifications: Vec::new(),
            deletions: Vec::new(),
            movements: Vec::new(),
        }
    }

    /// An empty ChangeSet is not appended to the change log.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
            && self.modifications.is_empty()
            && self.deletions.is_empty()
            && self.movements.is_empty()
    }
}
