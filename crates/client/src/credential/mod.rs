// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session credentials: the token pair, its store, and the refresh call.

pub mod persist;
pub mod refresh;
pub mod store;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use store::CredentialStore;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "authToken";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// An issued access/refresh token pair. Replaced wholesale, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    refresh_token: Option<String>,
}

impl Credential {
    /// Returns `None` for an empty access token; an empty refresh token is
    /// treated as absent.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Option<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return None;
        }
        let refresh_token = refresh_token.filter(|t| !t.is_empty());
        Some(Self { access_token, refresh_token })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Token body returned by the login and refresh endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Build a credential, keeping `previous_refresh` when the server did not
    /// rotate the refresh token.
    pub fn into_credential(self, previous_refresh: Option<&str>) -> Option<Credential> {
        let refresh = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_owned));
        Credential::new(self.access_token, refresh)
    }
}

/// Resolve the state directory for client data.
///
/// Checks `TRACKLINE_STATE_DIR`, then `$XDG_STATE_HOME/trackline`,
/// then `$HOME/.local/state/trackline`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TRACKLINE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("trackline");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/trackline");
    }
    PathBuf::from(".trackline")
}
