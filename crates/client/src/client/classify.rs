// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::credential::CredentialStore;
use crate::error::TransportError;
use crate::http::Response;

/// What to do with a completed request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the response or error back to the caller unchanged.
    NotAuthFailure,
    /// Suspend behind the refresh coordinator, then replay once.
    Refreshable,
    /// Authentication failed and cannot be recovered here.
    Terminal(TerminalReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The request was already the one permitted replay.
    AlreadyRetried,
    /// No refresh credential is stored.
    NoRefreshCredential,
}

/// Classify an attempt. Pure: reads the store, changes nothing.
///
/// Transport errors are never authentication failures.
pub fn classify(
    attempt: &Result<Response, TransportError>,
    retried: bool,
    store: &CredentialStore,
) -> Verdict {
    match attempt {
        Ok(response) if response.is_unauthorized() => {
            if retried {
                Verdict::Terminal(TerminalReason::AlreadyRetried)
            } else if !store.has_refresh_token() {
                Verdict::Terminal(TerminalReason::NoRefreshCredential)
            } else {
                Verdict::Refreshable
            }
        }
        _ => Verdict::NotAuthFailure,
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
