// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout API routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ChangeSet, Workout, WorkoutRecord};
use crate::services::{EnabledSources, RefreshRequest};
use crate::AppState;

/// Change log entries returned alongside the workout listing.
const RECENT_CHANGES: usize = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts", get(get_workouts))
        .route("/api/workouts/{uid}", get(get_workout_history))
        .route("/api/refresh", post(refresh_workouts))
        .route("/api/history", get(get_history))
}

// ─── Current Workouts ────────────────────────────────────────

#[derive(Deserialize)]
struct StoreQuery {
    /// Calendar feed URL identifying the store; defaults to the configured feed
    url: Option<String>,
}

#[derive(Serialize)]
pub struct WorkoutsResponse {
    pub workouts: BTreeMap<String, Workout>,
    pub last_updated: Option<DateTime<Utc>>,
    pub change_log: Vec<ChangeSet>,
}

/// Get all current workouts and recent changes.
async fn get_workouts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StoreQuery>,
) -> Result<Json<WorkoutsResponse>> {
    let url = params
        .url
        .unwrap_or_else(|| state.config.default_ical_url.clone());
    let store = state.refresh_service.open_store(&url);

    Ok(Json(WorkoutsResponse {
        workouts: store.current_workouts(),
        last_updated: store.last_updated(),
        change_log: store.change_log(Some(RECENT_CHANGES)).to_vec(),
    }))
}

// ─── Workout History ─────────────────────────────────────────

/// Get the full lifecycle record for a specific workout.
async fn get_workout_history(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Query(params): Query<StoreQuery>,
) -> Result<Json<WorkoutRecord>> {
    let url = params
        .url
        .unwrap_or_else(|| state.config.default_ical_url.clone());
    let store = state.refresh_service.open_store(&url);

    store
        .record(&uid)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Workout {}", uid)))
}

// ─── Change Log ──────────────────────────────────────────────

#[derive(Deserialize)]
struct HistoryQuery {
    url: Option<String>,
    /// Most recent N change sets; everything when absent
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub change_log: Vec<ChangeSet>,
}

/// Get the change history for a store.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let url = params
        .url
        .unwrap_or_else(|| state.config.default_ical_url.clone());
    let store = state.refresh_service.open_store(&url);

    Ok(Json(HistoryResponse {
        change_log: store.change_log(params.limit).to_vec(),
    }))
}

// ─── Refresh ─────────────────────────────────────────────────

fn default_sources() -> Vec<String> {
    vec!["tp".to_string()]
}

#[derive(Deserialize)]
struct RefreshBody {
    url: Option<String>,
    /// Accepted for compatibility with older clients
    tp_url: Option<String>,
    #[serde(default = "default_sources")]
    sources: Vec<String>,
    strava_access_token: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub changes: ChangeSet,
    pub workouts: BTreeMap<String, Workout>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Pull from the enabled feeds, reconcile, and apply to the store.
async fn refresh_workouts(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<RefreshResponse>> {
    let ical_url = body
        .url
        .or(body.tp_url)
        .unwrap_or_else(|| state.config.default_ical_url.clone());

    let outcome = state
        .refresh_service
        .refresh(RefreshRequest {
            ical_url,
            sources: EnabledSources::from_names(&body.sources),
            strava_access_token: body.strava_access_token,
        })
        .await?;

    Ok(Json(RefreshResponse {
        message: outcome.message,
        warnings: outcome.warnings,
        changes: outcome.changes,
        workouts: outcome.workouts,
        last_updated: outcome.last_updated,
    }))
}
