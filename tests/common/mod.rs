// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;

use tempfile::TempDir;
use tp_sync::config::Config;
use tp_sync::services::RefreshService;
use tp_sync::AppState;

/// Create a test app backed by a temporary data directory.
/// Returns the router and the directory guard (dropping it removes the dir).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, TempDir) {
    let data_dir = TempDir::new().expect("temp data dir");

    let config = Config {
        data_dir: data_dir.path().to_path_buf(),
        ..Config::default()
    };

    let refresh_service = RefreshService::new(config.data_dir.clone());

    let state = Arc::new(AppState {
        config,
        refresh_service,
    });

    (tp_sync::routes::create_router(state), data_dir)
}
