// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh orchestrator.
//!
//! Handles the core workflow:
//! 1. Fetch the calendar and activity feeds (tolerating partial failure)
//! 2. Reconcile the two sets into one logical timeline
//! 3. Apply the result to the durable store under a per-store lock
//! 4. Return the cycle's ChangeSet plus the updated current map

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;

use crate::db::WorkoutStore;
use crate::error::AppError;
use crate::models::{ChangeSet, Workout};
use crate::services::calendar::{parse_calendar, CalendarClient};
use crate::services::reconcile::{merge_workouts_by_source, EnabledSources};
use crate::services::strava::{parse_strava_activities, StravaClient};

/// Source ID token of a TrainingPeaks iCal URL.
static ICAL_SOURCE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/([A-Z0-9]+)\.ics").unwrap());

/// Per-store mutex map to serialize refreshes against the same file.
type StoreLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// One refresh invocation.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    /// Calendar feed URL; also determines the store file identity.
    pub ical_url: String,
    pub sources: EnabledSources,
    /// Bearer token for the activity feed. Acquiring and refreshing it is
    /// the caller's concern.
    pub strava_access_token: Option<String>,
}

/// What a refresh cycle produced.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub message: String,
    /// Per-source failures recovered from during this cycle.
    pub warnings: Vec<String>,
    pub changes: ChangeSet,
    pub workouts: BTreeMap<String, Workout>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Orchestrates feed fetches, reconciliation, and store updates.
#[derive(Clone)]
pub struct RefreshService {
    calendar: CalendarClient,
    strava: StravaClient,
    data_dir: PathBuf,
    store_locks: StoreLocks,
}

impl RefreshService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            calendar: CalendarClient::new(),
            strava: StravaClient::new(),
            data_dir: data_dir.into(),
            store_locks: Arc::new(DashMap::new()),
        }
    }

    /// Store file for a calendar URL.
    ///
    /// Distinct athletes get distinct files keyed by the feed's ID token, so
    /// they never collide within the same store.
    pub fn store_path(&self, ical_url: &str) -> PathBuf {
        let file = match ICAL_SOURCE_ID
            .captures(ical_url)
            .map(|caps| caps[1].to_string())
        {
            Some(id) => format!("workouts_{}.json", id),
            None => "workouts_default.json".to_string(),
        };
        self.data_dir.join(file)
    }

    /// Open the store for a calendar URL without refreshing it.
    pub fn open_store(&self, ical_url: &str) -> WorkoutStore {
        WorkoutStore::load(self.store_path(ical_url))
    }

    /// Run one refresh cycle.
    ///
    /// Each enabled source may fail independently; failures become warnings
    /// and the cycle continues with whatever succeeded. Only when every
    /// enabled source failed does the refresh fail, leaving the store
    /// untouched.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<RefreshOutcome, AppError> {
        let mut enabled = request.sources;
        let mut warnings = Vec::new();

        if !enabled.any() {
            return Err(AppError::BadRequest("no sources enabled".to_string()));
        }

        if enabled.strava && request.strava_access_token.is_none() {
            warnings.push("Strava: access token required".to_string());
            enabled.strava = false;
            if !enabled.any() {
                return Err(AppError::FeedUnavailable(warnings.join(" | ")));
            }
        }

        let today = Utc::now().date_naive();

        let mut tp_workouts = BTreeMap::new();
        let mut tp_ok = false;
        if enabled.tp {
            match self.fetch_calendar_workouts(&request.ical_url, today).await {
                Ok(workouts) => {
                    tp_workouts = workouts;
                    tp_ok = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Calendar feed failed");
                    warnings.push(format!("Training Peaks: {}", e));
                }
            }
        }

        let mut strava_workouts = BTreeMap::new();
        let mut strava_ok = false;
        if enabled.strava {
            // Token presence checked above
            let token = request.strava_access_token.as_deref().unwrap_or_default();
            match self.fetch_strava_workouts(token).await {
                Ok(workouts) => {
                    strava_workouts = workouts;
                    strava_ok = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Activity feed failed");
                    warnings.push(format!("Strava: {}", e));
                }
            }
        }

        if !tp_ok && !strava_ok {
            return Err(AppError::FeedUnavailable(warnings.join(" | ")));
        }

        let merged = merge_workouts_by_source(&tp_workouts, &strava_workouts, enabled, today);

        tracing::info!(
            tp = tp_workouts.len(),
            strava = strava_workouts.len(),
            merged = merged.len(),
            "Feeds reconciled"
        );

        // Single writer per store file: hold the lock across load/update/save.
        let path = self.store_path(&request.ical_url);
        let lock = self
            .store_locks
            .entry(path.display().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut store = WorkoutStore::load(&path);
        let changes = store.update(&merged, Utc::now())?;

        tracing::info!(
            store = %path.display(),
            additions = changes.additions.len(),
            modifications = changes.modifications.len(),
            deletions = changes.deletions.len(),
            movements = changes.movements.len(),
            "Store updated"
        );

        Ok(RefreshOutcome {
            message: format!(
                "Fetched {} TP + {} Strava workouts",
                tp_workouts.len(),
                strava_workouts.len()
            ),
            warnings,
            changes,
            workouts: store.current_workouts(),
            last_updated: store.last_updated(),
        })
    }

    async fn fetch_calendar_workouts(
        &self,
        url: &str,
        today: chrono::NaiveDate,
    ) -> Result<BTreeMap<String, Workout>, AppError> {
        let content = self.calendar.fetch_calendar(url).await?;
        parse_calendar(&content, today)
    }

    async fn fetch_strava_workouts(
        &self,
        access_token: &str,
    ) -> Result<BTreeMap<String, Workout>, AppError> {
        let activities = self
            .strava
            .list_activities(access_token, None, None, 200)
            .await?;
        Ok(parse_strava_activities(activities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_from_ical_url() {
        let service = RefreshService::new("data");

        assert_eq!(
            service.store_path("https://www.trainingpeaks.com/ical/FQ52PNFB5MWLS.ics"),
            PathBuf::from("data/workouts_FQ52PNFB5MWLS.json")
        );
        assert_eq!(
            service.store_path("https://example.com/feed"),
            PathBuf::from("data/workouts_default.json")
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_empty_sources() {
        let service = RefreshService::new("data");
        let err = service
            .refresh(RefreshRequest {
                ical_url: "https://example.com/cal.ics".to_string(),
                sources: EnabledSources::default(),
                strava_access_token: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_refresh_strava_only_without_token_fails() {
        let service = RefreshService::new("data");
        let err = service
            .refresh(RefreshRequest {
                ical_url: "https://example.com/cal.ics".to_string(),
                sources: EnabledSources {
                    tp: false,
                    strava: true,
                },
                strava_access_token: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::FeedUnavailable(_)));
    }
}
