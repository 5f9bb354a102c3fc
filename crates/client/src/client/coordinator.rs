// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight refresh coordination.
//!
//! At most one refresh is in flight per coordinator. Calls that fail
//! authentication while it runs queue behind it and all observe its one
//! outcome, released in the order they joined.
//!
//! Logins and logouts bump a session generation under the same lock. A
//! refresh that settles after its session was replaced leaves the store
//! alone and fails its waiters with [`RefreshError::Superseded`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::client::terminator::end_session;
use crate::credential::{Credential, CredentialStore};
use crate::error::RefreshError;
use crate::session::{EndReason, SessionEvent, SessionEvents};

/// The settled result of one refresh, shared by all of its waiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Renewed(Credential),
    Failed(RefreshError),
}

/// What a call that failed authentication should do next.
#[derive(Debug)]
pub enum Ticket {
    /// This call started the refresh: it must run it and call
    /// [`RefreshCoordinator::settle`], then wait like everyone else.
    Lead { refresh_token: String, waiter: Waiter },
    /// A refresh is already running; wait for its outcome.
    Follow(Waiter),
    /// The credential was renewed after this request was signed; replay
    /// with it, no refresh needed.
    Ready(Credential),
    /// The refresh credential vanished before a refresh could start.
    NoSession,
}

/// Receiving end of one queued call.
#[derive(Debug)]
pub struct Waiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl Waiter {
    pub async fn outcome(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(RefreshOutcome::Failed(RefreshError::Interrupted))
    }
}

enum Phase {
    Idle,
    Refreshing { generation: u64, waiters: VecDeque<oneshot::Sender<RefreshOutcome>> },
}

struct State {
    phase: Phase,
    /// Bumped on every login and logout.
    generation: u64,
}

/// Idle/Refreshing state machine guarding the refresh endpoint.
pub struct RefreshCoordinator {
    state: Mutex<State>,
    started: AtomicU64,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State { phase: Phase::Idle, generation: 0 }),
            started: AtomicU64::new(0),
        }
    }

    /// Enter the coordinator after a refreshable failure.
    ///
    /// `signed_with` is the access token the failed request carried.
    pub fn join(&self, store: &CredentialStore, signed_with: Option<&str>) -> Ticket {
        let mut state = self.state.lock();
        let (tx, rx) = oneshot::channel();
        let waiter = Waiter { rx };

        if let Phase::Refreshing { waiters, .. } = &mut state.phase {
            waiters.push_back(tx);
            tracing::debug!(waiters = waiters.len(), "joined in-flight refresh");
            return Ticket::Follow(waiter);
        }

        if let Some(current) = store.get() {
            if signed_with != Some(current.access_token()) {
                tracing::debug!("request carried a superseded token, replaying with current");
                return Ticket::Ready(current);
            }
        }

        let Some(refresh_token) = store.refresh_token() else {
            return Ticket::NoSession;
        };

        let generation = state.generation;
        state.phase = Phase::Refreshing { generation, waiters: VecDeque::from([tx]) };
        self.started.fetch_add(1, Ordering::Relaxed);
        tracing::info!("starting credential refresh");
        Ticket::Lead { refresh_token, waiter }
    }

    /// Replace the session outside the refresh flow (login or logout).
    ///
    /// `apply` runs under the coordinator lock, so it cannot interleave with
    /// a refresh settling. Any refresh in flight is superseded.
    pub fn replace_session(&self, apply: impl FnOnce()) {
        let mut state = self.state.lock();
        state.generation += 1;
        if matches!(state.phase, Phase::Refreshing { .. }) {
            tracing::debug!("session replaced during refresh");
        }
        apply();
    }

    /// Deliver the outcome of the running refresh and return to idle.
    ///
    /// The store is updated before any new arrival can observe the idle
    /// state. On failure the session is ended once for the whole batch.
    /// Returns the number of waiters released.
    pub fn settle(
        &self,
        store: &CredentialStore,
        events: &SessionEvents,
        outcome: RefreshOutcome,
    ) -> usize {
        let (waiters, outcome) = {
            let mut state = self.state.lock();
            let (generation, waiters) = match std::mem::replace(&mut state.phase, Phase::Idle) {
                Phase::Refreshing { generation, waiters } => (generation, waiters),
                Phase::Idle => {
                    tracing::warn!("refresh settled with no refresh in flight");
                    return 0;
                }
            };
            if generation != state.generation {
                tracing::info!(
                    waiters = waiters.len(),
                    "discarding refresh outcome for a replaced session"
                );
                (waiters, RefreshOutcome::Failed(RefreshError::Superseded))
            } else {
                Self::apply_outcome(store, events, &outcome, waiters.len());
                (waiters, outcome)
            }
        };

        let released = waiters.len();
        for tx in waiters {
            // A closed receiver means the caller stopped listening.
            let _ = tx.send(outcome.clone());
        }
        released
    }

    fn apply_outcome(
        store: &CredentialStore,
        events: &SessionEvents,
        outcome: &RefreshOutcome,
        waiters: usize,
    ) {
        match outcome {
            RefreshOutcome::Renewed(credential) => {
                store.set(credential);
                events.emit(SessionEvent::Refreshed);
                tracing::info!(waiters, "credential refreshed");
            }
            RefreshOutcome::Failed(e) => {
                end_session(store, events, EndReason::RefreshFailed { error: e.to_string() });
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Refreshing { .. })
    }

    /// Calls currently queued behind the in-flight refresh.
    pub fn waiters(&self) -> usize {
        match &self.state.lock().phase {
            Phase::Refreshing { waiters, .. } => waiters.len(),
            Phase::Idle => 0,
        }
    }

    /// Refreshes started over the coordinator's lifetime.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
