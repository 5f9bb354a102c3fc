// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fake of the shipment service for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use tokio::sync::Semaphore;

use crate::client::{ApiClient, ClientOptions};
use crate::credential::{Credential, CredentialStore};
use crate::error::TransportError;
use crate::http::{ApiRequest, Backend, Response};

pub const REFRESH_PATH: &str = "auth/refresh-token";

/// How the fake answers the refresh endpoint.
#[derive(Debug, Clone)]
pub enum RefreshReply {
    /// Issue a new pair; `accept` makes the new access token valid.
    Issue { access: String, refresh: Option<String>, accept: bool },
    Reject(u16),
    Unreachable,
}

/// One exchange as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub path: String,
    pub bearer: Option<String>,
    pub retried: bool,
}

/// Fake service. Protected paths accept exactly one access token.
///
/// Special paths: `down` fails at the transport layer, `status/<code>`
/// answers `<code>` without checking auth.
pub struct FakeServer {
    accepted: Mutex<String>,
    refresh_reply: Mutex<RefreshReply>,
    gate: Option<Semaphore>,
    refresh_calls: AtomicUsize,
    log: Mutex<Vec<Seen>>,
}

impl FakeServer {
    pub fn new(accepted: &str, refresh_reply: RefreshReply) -> Self {
        Self {
            accepted: Mutex::new(accepted.to_owned()),
            refresh_reply: Mutex::new(refresh_reply),
            gate: None,
            refresh_calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Hold every refresh reply until [`FakeServer::open_gate`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn open_gate(&self) {
        if let Some(ref gate) = self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<Seen> {
        self.log.lock().clone()
    }

    /// Entries recorded for non-refresh paths carrying `token`.
    pub fn calls_with(&self, token: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|s| s.path != REFRESH_PATH && s.bearer.as_deref() == Some(token))
            .count()
    }

    async fn refresh(&self) -> Result<Response, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.log.lock().push(Seen { path: REFRESH_PATH.to_owned(), bearer: None, retried: false });
        let reply = self.refresh_reply.lock().clone();
        match reply {
            RefreshReply::Issue { access, refresh, accept } => {
                if accept {
                    *self.accepted.lock() = access.clone();
                }
                let body = serde_json::json!({ "accessToken": access, "refreshToken": refresh });
                Ok(Response::new(200, body.to_string()))
            }
            RefreshReply::Reject(status) => {
                Ok(Response::new(status, r#"{"message":"invalid refresh token"}"#))
            }
            RefreshReply::Unreachable => Err(TransportError::Connect("refused".into())),
        }
    }
}

#[async_trait::async_trait]
impl Backend for FakeServer {
    async fn execute(&self, request: &ApiRequest) -> Result<Response, TransportError> {
        if request.path == REFRESH_PATH {
            return self.refresh().await;
        }
        if request.path == "down" {
            return Err(TransportError::Connect("refused".into()));
        }

        let bearer = request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned);
        self.log.lock().push(Seen {
            path: request.path.clone(),
            bearer: bearer.clone(),
            retried: request.is_retry(),
        });
        tokio::task::yield_now().await;

        if let Some(code) = request.path.strip_prefix("status/").and_then(|c| c.parse().ok()) {
            return Ok(Response::new(code, ""));
        }
        if bearer.as_deref() == Some(self.accepted.lock().as_str()) {
            let body = serde_json::json!({ "path": request.path });
            Ok(Response::new(200, body.to_string()))
        } else {
            Ok(Response::new(401, r#"{"message":"jwt expired"}"#))
        }
    }
}

pub fn credential(access: &str, refresh: Option<&str>) -> anyhow::Result<Credential> {
    Credential::new(access, refresh.map(str::to_owned))
        .ok_or_else(|| anyhow::anyhow!("empty access token"))
}

/// A client over `server` whose store holds `initial`.
pub fn client_for(server: &Arc<FakeServer>, initial: Option<Credential>) -> ApiClient {
    let store = CredentialStore::in_memory();
    if let Some(ref cred) = initial {
        store.set(cred);
    }
    let backend: Arc<dyn Backend> = Arc::clone(server) as Arc<dyn Backend>;
    ApiClient::new(backend, store, ClientOptions::default())
}

/// Poll `cond` until it holds or five seconds pass.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await?;
    Ok(())
}
