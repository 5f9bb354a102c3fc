// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle events for the surrounding application.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Emitted on the client's broadcast channel. Never carries token material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A credential was obtained by logging in.
    LoggedIn,
    /// The access credential was renewed through the refresh endpoint.
    Refreshed,
    /// The session is over; the application should re-authenticate.
    Ended { reason: EndReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    RefreshFailed { error: String },
    Logout,
}

/// Sender half of the session event channel.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ended_serializes_with_reason() -> anyhow::Result<()> {
        let event = SessionEvent::Ended {
            reason: EndReason::RefreshFailed { error: "refresh rejected (401)".into() },
        };
        let json = serde_json::to_value(&event)?;
        assert_eq!(json["event"], "ended");
        assert_eq!(json["reason"]["kind"], "refresh_failed");
        Ok(())
    }

    #[tokio::test]
    async fn subscribers_receive_events() -> anyhow::Result<()> {
        let events = SessionEvents::new(4);
        let mut rx = events.subscribe();
        events.emit(SessionEvent::Refreshed);
        assert_eq!(rx.recv().await?, SessionEvent::Refreshed);
        Ok(())
    }
}
