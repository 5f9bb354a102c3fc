// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh-endpoint exchange with optional transport retries.

use std::time::Duration;

use crate::credential::{Credential, TokenResponse};
use crate::error::RefreshError;
use crate::http::{ApiRequest, Backend};

/// Perform a single refresh request.
///
/// Sent straight to the backend: the refresh call is never signed and never
/// goes back through the client's own failure handling.
pub async fn do_refresh(
    backend: &dyn Backend,
    refresh_path: &str,
    refresh_token: &str,
) -> Result<Credential, RefreshError> {
    let request =
        ApiRequest::post(refresh_path, serde_json::json!({ "refreshToken": refresh_token }));
    let resp = backend.execute(&request).await?;

    if !resp.is_success() {
        return Err(RefreshError::Rejected { status: resp.status, body: resp.text() });
    }

    let token: TokenResponse =
        serde_json::from_slice(&resp.body).map_err(|e| RefreshError::Malformed(e.to_string()))?;
    token
        .into_credential(Some(refresh_token))
        .ok_or_else(|| RefreshError::Malformed("response carried no access token".to_owned()))
}

/// Refresh, retrying transport failures with exponential backoff.
///
/// A rejected or malformed reply is final; only failures to reach the
/// endpoint are retried.
pub async fn refresh_with_retries(
    backend: &dyn Backend,
    refresh_path: &str,
    refresh_token: &str,
    max_retries: u32,
) -> Result<Credential, RefreshError> {
    let mut backoff = Duration::from_millis(250);
    let max_backoff = Duration::from_secs(5);

    let mut attempt = 0;
    loop {
        match do_refresh(backend, refresh_path, refresh_token).await {
            Err(RefreshError::Transport(e)) if attempt < max_retries => {
                tracing::debug!(attempt, err = %e, "refresh attempt failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
                attempt += 1;
            }
            result => return result,
        }
    }
}
