// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! TP-Sync: reconcile TrainingPeaks and Strava workout feeds
//!
//! This crate provides the backend API for merging a planned-workout
//! calendar with executed Strava activities and tracking every change
//! across refresh cycles.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::RefreshService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub refresh_service: RefreshService,
}
