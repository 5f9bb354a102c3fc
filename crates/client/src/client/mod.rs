// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated API client.
//!
//! Every call is signed with the stored credential. A 401 with a refresh
//! credential on hand suspends the call behind the single-flight refresh
//! coordinator and replays it once with the renewed credential; a failed
//! refresh ends the session.

pub mod classify;
pub mod coordinator;
pub mod signer;
pub mod terminator;

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::client::classify::{classify, TerminalReason, Verdict};
use crate::client::coordinator::{RefreshCoordinator, RefreshOutcome, Ticket, Waiter};
use crate::credential::refresh::refresh_with_retries;
use crate::credential::{Credential, CredentialStore};
use crate::error::{ClientError, RefreshError};
use crate::http::{ApiRequest, Backend, Response};
use crate::session::{EndReason, SessionEvent, SessionEvents};

/// Endpoint paths and policy knobs for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub login_path: String,
    pub refresh_path: String,
    pub shipments_path: String,
    /// Extra attempts for a refresh call that could not reach the server.
    pub refresh_retries: u32,
    pub event_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            login_path: "auth/login".to_owned(),
            refresh_path: "auth/refresh-token".to_owned(),
            shipments_path: "products".to_owned(),
            refresh_retries: 0,
            event_capacity: 16,
        }
    }
}

/// Cheap, cloneable handle; all clones share one session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn Backend>,
    store: CredentialStore,
    coordinator: RefreshCoordinator,
    events: SessionEvents,
    options: ClientOptions,
}

/// Outcome of one signed exchange.
enum Step {
    Done(Response),
    /// 401 eligible for refresh; carries the original response.
    Refresh(Response),
}

impl ApiClient {
    pub fn new(backend: Arc<dyn Backend>, store: CredentialStore, options: ClientOptions) -> Self {
        let events = SessionEvents::new(options.event_capacity);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                coordinator: RefreshCoordinator::new(),
                events,
                options,
            }),
        }
    }

    /// Send a request, refreshing the credential and replaying once on 401.
    ///
    /// Non-401 responses of any status are returned as `Ok`; only transport
    /// failures and unrecoverable authentication failures are errors.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let mut request = request;
        request.retried = false;
        signer::sign(&mut request, self.inner.store.get().as_ref());

        let unauthorized = match self.attempt(&request).await? {
            Step::Done(response) => return Ok(response),
            Step::Refresh(response) => response,
        };

        let waiter = match self.inner.coordinator.join(&self.inner.store, request.signed_with()) {
            Ticket::Ready(credential) => return self.replay(request, &credential).await,
            Ticket::NoSession => return Err(ClientError::NoSession { response: unauthorized }),
            Ticket::Follow(waiter) => waiter,
            Ticket::Lead { refresh_token, waiter } => {
                self.spawn_refresh(refresh_token);
                waiter
            }
        };

        self.await_release(request, unauthorized, waiter).await
    }

    async fn await_release(
        &self,
        request: ApiRequest,
        unauthorized: Response,
        waiter: Waiter,
    ) -> Result<Response, ClientError> {
        match waiter.outcome().await {
            RefreshOutcome::Renewed(credential) => self.replay(request, &credential).await,
            RefreshOutcome::Failed(reason) => {
                tracing::debug!(path = %request.path, "releasing call after failed refresh");
                Err(ClientError::RefreshFailed { response: unauthorized, reason })
            }
        }
    }

    /// Replay a request exactly once with `credential`.
    async fn replay(
        &self,
        mut request: ApiRequest,
        credential: &Credential,
    ) -> Result<Response, ClientError> {
        request.retried = true;
        signer::sign(&mut request, Some(credential));
        tracing::debug!(method = %request.method, path = %request.path, "replaying after refresh");
        match self.attempt(&request).await? {
            Step::Done(response) => Ok(response),
            // Unreachable by classification; a retried request is terminal.
            Step::Refresh(response) => Err(ClientError::Unauthorized { response }),
        }
    }

    /// One signed exchange plus classification.
    async fn attempt(&self, request: &ApiRequest) -> Result<Step, ClientError> {
        let attempt = self.inner.backend.execute(request).await;
        let verdict = classify(&attempt, request.retried, &self.inner.store);
        let response = attempt?;
        match verdict {
            Verdict::NotAuthFailure => Ok(Step::Done(response)),
            Verdict::Refreshable => Ok(Step::Refresh(response)),
            Verdict::Terminal(TerminalReason::AlreadyRetried) => {
                tracing::warn!(path = %request.path, "still unauthorized after refresh");
                Err(ClientError::Unauthorized { response })
            }
            Verdict::Terminal(TerminalReason::NoRefreshCredential) => {
                Err(ClientError::NoSession { response })
            }
        }
    }

    /// Run the refresh detached from the leading call, and settle from the
    /// call's join handle so neither a dropped caller nor a panicking
    /// backend can strand the waiters.
    fn spawn_refresh(&self, refresh_token: String) {
        let inner = Arc::clone(&self.inner);
        let backend = Arc::clone(&self.inner.backend);
        let refresh_path = self.inner.options.refresh_path.clone();
        let retries = self.inner.options.refresh_retries;

        let call = tokio::spawn(async move {
            refresh_with_retries(backend.as_ref(), &refresh_path, &refresh_token, retries).await
        });
        tokio::spawn(async move {
            let outcome = match call.await {
                Ok(Ok(credential)) => RefreshOutcome::Renewed(credential),
                Ok(Err(e)) => RefreshOutcome::Failed(e),
                Err(e) => {
                    tracing::error!(err = %e, "refresh task did not complete");
                    RefreshOutcome::Failed(RefreshError::Interrupted)
                }
            };
            inner.coordinator.settle(&inner.store, &inner.events, outcome);
        });
    }

    /// Store a credential obtained outside the refresh flow (login).
    ///
    /// A refresh still in flight for the previous session is discarded.
    pub fn sign_in(&self, credential: &Credential) {
        let inner = &self.inner;
        inner.coordinator.replace_session(|| {
            inner.store.set(credential);
            inner.events.emit(SessionEvent::LoggedIn);
        });
        tracing::info!("signed in");
    }

    /// Clear the credential and emit `Ended { Logout }`.
    ///
    /// A refresh still in flight cannot bring the session back.
    pub fn logout(&self) {
        let inner = &self.inner;
        inner.coordinator.replace_session(|| {
            terminator::end_session(&inner.store, &inner.events, EndReason::Logout);
        });
    }

    /// The raw network boundary, bypassing signing and refresh.
    pub(crate) fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_authenticated()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
