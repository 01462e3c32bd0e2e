// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TP-Sync API Server
//!
//! Polls a TrainingPeaks iCal calendar and the Strava activity feed,
//! reconciles them into one logical timeline, and keeps an auditable
//! change history per athlete.

use std::sync::Arc;

use tp_sync::{config::Config, services::RefreshService, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env();
    tracing::info!(port = config.port, data_dir = %config.data_dir.display(), "Starting TP-Sync API");

    let refresh_service = RefreshService::new(config.data_dir.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        refresh_service,
    });

    let app = tp_sync::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tp_sync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
