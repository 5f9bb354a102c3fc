// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::credential::Credential;
use crate::http::ApiRequest;

/// Attach `credential` as a bearer token, replacing any earlier one.
///
/// Without a credential the request goes out unmodified (anonymous).
pub fn sign(request: &mut ApiRequest, credential: Option<&Credential>) {
    let Some(credential) = credential else {
        return;
    };
    match HeaderValue::from_str(&format!("Bearer {}", credential.access_token())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
            request.signed_with = Some(credential.access_token().to_owned());
        }
        Err(_) => {
            // Not representable as a header; the server will answer 401.
            tracing::warn!(path = %request.path, "access token is not a valid header value");
            request.headers.remove(AUTHORIZATION);
            request.signed_with = Some(credential.access_token().to_owned());
        }
    }
}
