// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::credential::CredentialStore;
use crate::session::{EndReason, SessionEvent, SessionEvents};

/// End the session: clear the store and emit one `Ended` event.
///
/// Called once per failed refresh (not once per waiter) and on logout.
pub fn end_session(store: &CredentialStore, events: &SessionEvents, reason: EndReason) {
    store.clear();
    match &reason {
        EndReason::RefreshFailed { error } => {
            tracing::warn!(err = %error, "session ended: credential refresh failed");
        }
        EndReason::Logout => tracing::info!("session ended: logout"),
    }
    events.emit(SessionEvent::Ended { reason });
}
