// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::http::Response;

/// The HTTP exchange did not produce a response at all.
///
/// Never treated as an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid request: {0}")]
    Request(String),
    #[error("transport failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() {
            Self::Request(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Why a credential refresh did not yield a usable credential.
///
/// `Clone` because one outcome is delivered to every queued waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("refresh response unusable: {0}")]
    Malformed(String),
    #[error("refresh task ended without an outcome")]
    Interrupted,
    /// The session was logged out or replaced while the refresh ran.
    #[error("session changed while refreshing")]
    Superseded,
}

/// Errors returned to callers of [`crate::client::ApiClient`].
///
/// Authentication variants carry the original 401 response so callers see
/// what the server actually said.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Still unauthorized after the one replay with a refreshed credential.
    #[error("unauthorized ({}) after credential refresh", .response.status)]
    Unauthorized { response: Response },

    /// Unauthorized and no refresh credential to recover with.
    #[error("no active session (server replied {})", .response.status)]
    NoSession { response: Response },

    /// Unauthorized and the refresh attempt failed; the session has ended.
    #[error("session refresh failed after {}: {reason}", .response.status)]
    RefreshFailed {
        response: Response,
        #[source]
        reason: RefreshError,
    },

    /// Non-success reply from a typed service call.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// The server response behind this error, if there was one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Unauthorized { response }
            | Self::NoSession { response }
            | Self::RefreshFailed { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status behind this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => self.response().map(|r| r.status),
        }
    }

    /// True for every variant that means "the caller must log in again".
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::NoSession { .. } | Self::RefreshFailed { .. })
    }
}
