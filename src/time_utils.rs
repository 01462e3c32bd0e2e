// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time arithmetic.

use chrono::{DateTime, Utc};

/// Whole days from `earlier` to `later`, flooring toward negative infinity.
///
/// A workout one hour in the future is already "day -1", so future-dated
/// entries always classify as future even inside the first 24 hours.
pub fn floor_days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds().div_euclid(86_400)
}
