// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trackline: authenticated client for the shipment-tracking API.

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod session;
pub mod shipment;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

pub use crate::client::{ApiClient, ClientOptions};
pub use crate::credential::{Credential, CredentialStore};
pub use crate::error::{ClientError, RefreshError, TransportError};
pub use crate::http::{ApiRequest, Backend, Response};
pub use crate::session::{EndReason, SessionEvent};

use crate::config::ClientConfig;
use crate::credential::persist::FileStore;
use crate::http::ReqwestBackend;

/// Build a client over HTTP with the file-backed credential store.
pub fn connect(config: &ClientConfig) -> anyhow::Result<ApiClient> {
    let backend = ReqwestBackend::new(&config.base_url, config.request_timeout())?;
    let path = config.credential_file();
    let store = CredentialStore::new(FileStore::open(&path)?);
    tracing::debug!(
        base_url = %config.base_url,
        credentials = %path.display(),
        authenticated = store.is_authenticated(),
        "client ready"
    );
    Ok(ApiClient::new(Arc::new(backend), store, config.options()))
}
