// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response descriptors and the network boundary.

use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, TransportError};

/// Status code the server uses for a missing or rejected credential.
pub const UNAUTHORIZED: u16 = 401;

/// One outbound request as issued by a caller.
///
/// Cloned for the single replay after a credential refresh, so the body is
/// kept as a JSON value rather than a stream.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the backend's base URL.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub(crate) retried: bool,
    pub(crate) signed_with: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
            signed_with: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether this request is already the one permitted replay.
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    /// Access token the signer attached, if any.
    pub fn signed_with(&self) -> Option<&str> {
        self.signed_with.as_deref()
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == UNAUTHORIZED
    }

    /// Body as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// The network boundary. Implementations perform exactly one exchange per
/// call and never retry on their own.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<Response, TransportError>;
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// [`Backend`] over a shared `reqwest::Client` rooted at one base URL.
pub struct ReqwestBackend {
    base_url: String,
    client: Client,
}

impl ReqwestBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        ensure_crypto();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn execute(&self, request: &ApiRequest) -> Result<Response, TransportError> {
        let mut req = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        tracing::debug!(method = %request.method, path = %request.path, status, "exchange complete");
        Ok(Response { status, headers, body })
    }
}
