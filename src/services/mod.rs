// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod calendar;
pub mod description;
pub mod reconcile;
pub mod refresh;
pub mod strava;

pub use calendar::CalendarClient;
pub use reconcile::EnabledSources;
pub use refresh::{RefreshOutcome, RefreshRequest, RefreshService};
pub use strava::StravaClient;
