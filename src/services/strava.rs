// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching athlete activities.
//!
//! Handles:
//! - Activity listing with an after/before time window
//! - Bearer-token auth (the token is supplied per request by the caller)
//! - Rate limit and expired-token detection
//! - Mapping activity JSON into the canonical Workout shape

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{
    DurationBreakdown, DurationType, ExecutionStatus, Source, StravaMetrics, Workout,
};
use crate::services::description::{format_duration_string, seconds_to_clock};

/// Activities per page, capped by the Strava API.
const MAX_PER_PAGE: u32 = 200;

/// Default lookback window when the caller gives no `after` bound.
const DEFAULT_WINDOW_DAYS: i64 = 10;

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for StravaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StravaClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(StdDuration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .expect("reqwest client"),
            base_url: "https://www.strava.com/api/v3".to_string(),
        }
    }

    /// List athlete activities inside a time window.
    ///
    /// Defaults to the last 10 days when no `after` bound is given, to keep
    /// well inside the API rate limits. Items are returned raw so one
    /// malformed activity can be skipped without dropping the batch.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        before: Option<i64>,
        per_page: u32,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let url = format!("{}/activities", self.base_url);

        let after = after
            .unwrap_or_else(|| (Utc::now() - Duration::days(DEFAULT_WINDOW_DAYS)).timestamp());

        let mut query = vec![
            ("per_page", per_page.min(MAX_PER_PAGE).to_string()),
            ("after", after.to_string()),
        ];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaApi(
                    "rate limit exceeded, try again in 15 minutes".to_string(),
                ));
            }

            if status.as_u16() == 401 {
                return Err(AppError::StravaApi(
                    "invalid or expired access token".to_string(),
                ));
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Activity as returned by the List Athlete Activities endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub start_date_local: Option<String>,
    pub sport_type: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub distance: Option<f64>,
    pub moving_time: Option<i64>,
    pub elapsed_time: Option<i64>,
    pub total_elevation_gain: Option<f64>,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_watts: Option<f64>,
    pub kilojoules: Option<f64>,
    pub calories: Option<f64>,
}

/// Convert Strava activities to the canonical workout shape, keyed by UID.
///
/// Strava only reports executed activities, so everything comes out with a
/// completed status and a concrete clock time. An activity that cannot be
/// decoded is skipped individually; it never aborts the batch.
pub fn parse_strava_activities(activities: Vec<serde_json::Value>) -> BTreeMap<String, Workout> {
    let mut workouts = BTreeMap::new();

    for raw in activities {
        let activity: StravaActivity = match serde_json::from_value(raw) {
            Ok(activity) => activity,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed Strava activity");
                continue;
            }
        };

        let uid = format!("strava_{}", activity.id);

        // Local date for day matching; fall back to the UTC instant's date.
        let start_date = activity
            .start_date_local
            .as_deref()
            .and_then(local_date)
            .or_else(|| activity.start_date.map(|t| t.date_naive()));

        let end_time = match (activity.start_date, activity.elapsed_time) {
            (Some(start), Some(elapsed)) => Some(start + Duration::seconds(elapsed)),
            _ => None,
        };

        let location = [
            activity.location_city.as_deref().unwrap_or(""),
            activity.location_state.as_deref().unwrap_or(""),
        ]
        .join(" ")
        .trim()
        .to_string();

        let sport = activity.sport_type.clone().or(activity.activity_type);

        let workout = Workout {
            uid: uid.clone(),
            summary: activity.name,
            description: activity.description.unwrap_or_default(),
            start_time: activity.start_date,
            start_date,
            end_time,
            end_date: end_time.map(|t| t.date_naive()),
            is_all_day: false,
            has_time: true,
            duration: activity.elapsed_time.map(DurationBreakdown::from_seconds),
            location: (!location.is_empty()).then_some(location),
            status: Some("COMPLETED".to_string()),
            sequence: 0,
            created: activity.start_date,
            last_modified: activity.start_date,
            categories: sport.clone(),
            source: Some(Source::Strava),
            activity_type: sport,
            parsed_duration: activity.moving_time.map(|s| s.to_string()),
            parsed_duration_formatted: activity
                .moving_time
                .map(|s| format_duration_string(&seconds_to_clock(s))),
            parsed_distance: activity
                .distance
                .filter(|d| *d > 0.0)
                .map(|d| format!("{:.2} km", d / 1000.0)),
            parsed_execution_status: Some(ExecutionStatus::Completed),
            duration_type: Some(DurationType::MovingTime),
            strava: StravaMetrics {
                distance: activity.distance,
                moving_time: activity.moving_time,
                elapsed_time: activity.elapsed_time,
                total_elevation_gain: activity.total_elevation_gain,
                average_speed: activity.average_speed,
                max_speed: activity.max_speed,
                average_heartrate: activity.average_heartrate,
                max_heartrate: activity.max_heartrate,
                average_watts: activity.average_watts,
                kilojoules: activity.kilojoules,
                calories: activity.calories,
            },
            ..Default::default()
        };

        workouts.insert(uid, workout);
    }

    workouts
}

/// Date component of Strava's `start_date_local` (naive local time).
fn local_date(raw: &str) -> Option<NaiveDate> {
    raw.split('T').next()?.parse().ok()
}
