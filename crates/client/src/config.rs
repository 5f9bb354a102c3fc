// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use crate::client::ClientOptions;

/// Configuration for the shipment API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the shipment service API.
    #[arg(long, default_value = "http://127.0.0.1:5000/api", env = "TRACKLINE_BASE_URL")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "TRACKLINE_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Login endpoint, relative to the base URL.
    #[arg(long, default_value = "auth/login", env = "TRACKLINE_LOGIN_PATH")]
    pub login_path: String,

    /// Refresh endpoint, relative to the base URL.
    #[arg(long, default_value = "auth/refresh-token", env = "TRACKLINE_REFRESH_PATH")]
    pub refresh_path: String,

    /// Shipment collection, relative to the base URL.
    #[arg(long, default_value = "products", env = "TRACKLINE_SHIPMENTS_PATH")]
    pub shipments_path: String,

    /// Extra attempts when the refresh endpoint cannot be reached.
    #[arg(long, default_value_t = 0, env = "TRACKLINE_REFRESH_RETRIES")]
    pub refresh_retries: u32,

    /// Credential file. Defaults to `<state dir>/credentials.json`.
    #[arg(long, env = "TRACKLINE_CREDENTIAL_FILE")]
    pub credential_file: Option<PathBuf>,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    pub fn credential_file(&self) -> PathBuf {
        self.credential_file
            .clone()
            .unwrap_or_else(|| crate::credential::state_dir().join("credentials.json"))
    }

    pub fn options(&self) -> ClientOptions {
        ClientOptions {
            login_path: self.login_path.clone(),
            refresh_path: self.refresh_path.clone(),
            shipments_path: self.shipments_path.clone(),
            refresh_retries: self.refresh_retries,
            ..ClientOptions::default()
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
