// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::*;

fn cred(access: &str, refresh: Option<&str>) -> anyhow::Result<Credential> {
    Credential::new(access, refresh.map(str::to_owned))
        .ok_or_else(|| anyhow::anyhow!("empty access token"))
}

fn signed_in() -> anyhow::Result<CredentialStore> {
    let store = CredentialStore::in_memory();
    store.set(&cred("T1", Some("R1"))?);
    Ok(store)
}

fn lead(ticket: Ticket) -> anyhow::Result<(String, Waiter)> {
    match ticket {
        Ticket::Lead { refresh_token, waiter } => Ok((refresh_token, waiter)),
        other => anyhow::bail!("expected Lead, got {other:?}"),
    }
}

fn follow(ticket: Ticket) -> anyhow::Result<Waiter> {
    match ticket {
        Ticket::Follow(waiter) => Ok(waiter),
        other => anyhow::bail!("expected Follow, got {other:?}"),
    }
}

#[test]
fn first_failure_leads_the_rest_follow() -> anyhow::Result<()> {
    let store = signed_in()?;
    let coordinator = RefreshCoordinator::new();

    let (refresh_token, _w0) = lead(coordinator.join(&store, Some("T1")))?;
    assert_eq!(refresh_token, "R1");
    let _w1 = follow(coordinator.join(&store, Some("T1")))?;
    let _w2 = follow(coordinator.join(&store, Some("T1")))?;

    assert!(coordinator.is_refreshing());
    assert_eq!(coordinator.waiters(), 3);
    assert_eq!(coordinator.refreshes_started(), 1);
    Ok(())
}

#[tokio::test]
async fn success_releases_every_waiter_with_the_same_credential() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let mut rx = events.subscribe();
    let coordinator = RefreshCoordinator::new();

    let (_, w0) = lead(coordinator.join(&store, Some("T1")))?;
    let w1 = follow(coordinator.join(&store, Some("T1")))?;
    let w2 = follow(coordinator.join(&store, Some("T1")))?;

    let renewed = cred("T2", Some("R1"))?;
    let released = coordinator.settle(&store, &events, RefreshOutcome::Renewed(renewed.clone()));
    assert_eq!(released, 3);

    for w in [w0, w1, w2] {
        assert_eq!(w.outcome().await, RefreshOutcome::Renewed(renewed.clone()));
    }
    assert_eq!(store.get(), Some(renewed));
    assert!(!coordinator.is_refreshing());
    assert_eq!(rx.recv().await?, SessionEvent::Refreshed);
    Ok(())
}

#[tokio::test]
async fn failure_clears_store_and_ends_session_once() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let mut rx = events.subscribe();
    let coordinator = RefreshCoordinator::new();

    let (_, w0) = lead(coordinator.join(&store, Some("T1")))?;
    let waiters: Vec<Waiter> =
        (0..4).map(|_| follow(coordinator.join(&store, Some("T1")))).collect::<Result<_, _>>()?;

    let error = RefreshError::Rejected { status: 401, body: String::new() };
    coordinator.settle(&store, &events, RefreshOutcome::Failed(error.clone()));

    assert_eq!(w0.outcome().await, RefreshOutcome::Failed(error.clone()));
    for w in waiters {
        assert_eq!(w.outcome().await, RefreshOutcome::Failed(error.clone()));
    }
    assert!(store.get().is_none());

    let ended = rx.recv().await?;
    assert!(matches!(ended, SessionEvent::Ended { reason: EndReason::RefreshFailed { .. } }));
    assert!(rx.try_recv().is_err(), "terminator must fire once per failed refresh");
    Ok(())
}

#[test]
fn coordinator_is_reusable_after_settling() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let coordinator = RefreshCoordinator::new();

    let _ = lead(coordinator.join(&store, Some("T1")))?;
    coordinator.settle(&store, &events, RefreshOutcome::Renewed(cred("T2", Some("R2"))?));

    let (refresh_token, _) = lead(coordinator.join(&store, Some("T2")))?;
    assert_eq!(refresh_token, "R2");
    assert_eq!(coordinator.refreshes_started(), 2);
    Ok(())
}

#[test]
fn superseded_token_replays_without_refresh() -> anyhow::Result<()> {
    let store = signed_in()?;
    let coordinator = RefreshCoordinator::new();

    match coordinator.join(&store, Some("T0")) {
        Ticket::Ready(current) => assert_eq!(current.access_token(), "T1"),
        other => anyhow::bail!("expected Ready, got {other:?}"),
    }
    assert!(!coordinator.is_refreshing());
    assert_eq!(coordinator.refreshes_started(), 0);
    Ok(())
}

#[test]
fn missing_refresh_token_is_no_session() -> anyhow::Result<()> {
    let store = CredentialStore::in_memory();
    store.set(&cred("T1", None)?);
    let coordinator = RefreshCoordinator::new();

    assert!(matches!(coordinator.join(&store, Some("T1")), Ticket::NoSession));
    assert!(!coordinator.is_refreshing());
    Ok(())
}

#[tokio::test]
async fn dropped_waiter_does_not_block_release() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let coordinator = RefreshCoordinator::new();

    let (_, w0) = lead(coordinator.join(&store, Some("T1")))?;
    let abandoned = follow(coordinator.join(&store, Some("T1")))?;
    drop(abandoned);

    let renewed = cred("T2", Some("R1"))?;
    assert_eq!(coordinator.settle(&store, &events, RefreshOutcome::Renewed(renewed.clone())), 2);
    assert_eq!(w0.outcome().await, RefreshOutcome::Renewed(renewed));
    Ok(())
}

#[test]
fn settle_without_flight_is_ignored() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let coordinator = RefreshCoordinator::new();

    let released = coordinator.settle(
        &store,
        &events,
        RefreshOutcome::Failed(RefreshError::Interrupted),
    );
    assert_eq!(released, 0);
    assert!(store.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn waiters_are_released_in_join_order() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let coordinator = RefreshCoordinator::new();

    let (_, w0) = lead(coordinator.join(&store, Some("T1")))?;
    let mut waiters = vec![w0];
    for _ in 0..4 {
        waiters.push(follow(coordinator.join(&store, Some("T1")))?);
    }

    // Spawned in reverse, so run order alone would record 4, 3, 2, 1, 0.
    let order = Arc::new(Mutex::new(Vec::new()));
    let parked = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for (i, waiter) in waiters.into_iter().enumerate().rev() {
        let order = Arc::clone(&order);
        let parked = Arc::clone(&parked);
        handles.push(tokio::spawn(async move {
            parked.fetch_add(1, Ordering::SeqCst);
            waiter.outcome().await;
            order.lock().push(i);
        }));
    }
    while parked.load(Ordering::SeqCst) < 5 {
        tokio::task::yield_now().await;
    }

    coordinator.settle(&store, &events, RefreshOutcome::Renewed(cred("T2", Some("R1"))?));
    for h in handles {
        h.await?;
    }
    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn renewal_after_logout_leaves_store_empty() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let mut rx = events.subscribe();
    let coordinator = RefreshCoordinator::new();

    let (_, w0) = lead(coordinator.join(&store, Some("T1")))?;
    coordinator.replace_session(|| end_session(&store, &events, EndReason::Logout));

    let released =
        coordinator.settle(&store, &events, RefreshOutcome::Renewed(cred("T2", Some("R2"))?));
    assert_eq!(released, 1);
    assert_eq!(w0.outcome().await, RefreshOutcome::Failed(RefreshError::Superseded));
    assert!(store.get().is_none());
    assert!(!coordinator.is_refreshing());

    assert_eq!(rx.recv().await?, SessionEvent::Ended { reason: EndReason::Logout });
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn failure_after_new_login_keeps_new_session() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let mut rx = events.subscribe();
    let coordinator = RefreshCoordinator::new();

    let (_, w0) = lead(coordinator.join(&store, Some("T1")))?;
    let fresh = cred("T9", Some("R9"))?;
    coordinator.replace_session(|| store.set(&fresh));

    let error = RefreshError::Rejected { status: 401, body: String::new() };
    coordinator.settle(&store, &events, RefreshOutcome::Failed(error));
    assert_eq!(w0.outcome().await, RefreshOutcome::Failed(RefreshError::Superseded));
    assert_eq!(store.get(), Some(fresh));
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[test]
fn refresh_after_session_replaced_is_current() -> anyhow::Result<()> {
    let store = signed_in()?;
    let events = SessionEvents::new(8);
    let coordinator = RefreshCoordinator::new();

    let fresh = cred("T5", Some("R5"))?;
    coordinator.replace_session(|| store.set(&fresh));
    let _ = lead(coordinator.join(&store, Some("T5")))?;
    coordinator.settle(&store, &events, RefreshOutcome::Renewed(cred("T6", Some("R5"))?));
    assert_eq!(store.get().map(|c| c.access_token().to_owned()).as_deref(), Some("T6"));
    Ok(())
}
