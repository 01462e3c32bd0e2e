// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod changes;
pub mod record;
pub mod workout;

pub use changes::{ChangeSet, Deletion, FieldChange, FieldChanges, Modification, Movement};
pub use record::{DeletionType, HistoryAction, HistoryEntry, WorkoutRecord};
pub use workout::{
    DurationBreakdown, DurationType, ExecutionStatus, Source, StravaMetrics, Workout,
};
