// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Calendar feed used when a request gives no URL
    pub default_ical_url: String,
    /// Directory holding the per-feed workout store files
    pub data_dir: PathBuf,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            default_ical_url: "https://www.trainingpeaks.com/ical/TEST0000.ics".to_string(),
            data_dir: PathBuf::from("data"),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable has a default, so local development works with no
    /// environment at all.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self {
            default_ical_url: env::var("DEFAULT_ICAL_URL").unwrap_or_else(|_| {
                "https://www.trainingpeaks.com/ical/FQ52PNFB5MWLS.ics".to_string()
            }),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        }
    }
}
