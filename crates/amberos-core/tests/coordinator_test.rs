// Timing tests for the poll coordinators, run on a paused clock.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use amberos_api::{Capability, CastCommand};
use amberos_core::entity::CastPlayer;
use amberos_core::{CastCoordinator, CoreError, PollCoordinator};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use common::FakeDevice;

// ── Helpers ─────────────────────────────────────────────────────────

fn counting(interval: Duration) -> (PollCoordinator, Arc<AtomicU32>) {
    let counter = Arc::new(AtomicU32::new(0));
    let calls = Arc::clone(&counter);
    let coordinator = PollCoordinator::new("test", interval, move || {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (coordinator, counter)
}

fn count(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::SeqCst)
}

// ── Interval ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_polls_on_the_interval_not_at_start() {
    let (coordinator, counter) = counting(Duration::from_secs(60));
    let cancel = CancellationToken::new();
    let task = coordinator.spawn(cancel.clone()).await.unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&counter), 0);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(count(&counter), 1);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(count(&counter), 2);

    cancel.cancel();
    task.await.unwrap();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(count(&counter), 2);
}

// ── Debounce ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_refresh_requests_coalesce_within_cooldown() {
    let (coordinator, counter) = counting(Duration::from_secs(3600));
    let cancel = CancellationToken::new();
    let task = coordinator.spawn(cancel.clone()).await.unwrap();

    for _ in 0..5 {
        coordinator.request_refresh();
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(count(&counter), 0, "still inside the cooldown");

    sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&counter), 1);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(count(&counter), 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_debounced_refresh_restarts_the_interval() {
    let (coordinator, counter) = counting(Duration::from_secs(10));
    let cancel = CancellationToken::new();
    let task = coordinator.spawn(cancel.clone()).await.unwrap();

    sleep(Duration::from_secs(5)).await;
    coordinator.request_refresh();

    // Refresh lands at t=6; the next tick moves out to t=16.
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(count(&counter), 1);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(count(&counter), 1);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&counter), 2);

    cancel.cancel();
    task.await.unwrap();
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_tracks_failure_and_recovery() {
    let failing = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let flag = Arc::clone(&failing);
    let coordinator = PollCoordinator::new("flaky", Duration::from_secs(60), move || {
        let fail = flag.load(Ordering::SeqCst);
        async move {
            if fail {
                Err(CoreError::ConnectionFailed {
                    host: "nas".into(),
                    reason: "refused".into(),
                })
            } else {
                Ok(())
            }
        }
    });

    assert!(coordinator.refresh().await.is_err());
    assert!(coordinator.refresh().await.is_err());
    let status = coordinator.status().borrow().clone();
    assert!(!status.last_update_success);
    assert!(status.last_success.is_none());
    assert_eq!(status.refresh_count, 2);

    failing.store(false, Ordering::SeqCst);
    coordinator.refresh().await.unwrap();
    let status = coordinator.status().borrow().clone();
    assert!(status.last_update_success);
    assert!(status.last_error.is_none());
    assert!(status.last_success.is_some());
}

// ── Cast lock ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cast_commands_never_overlap_the_cast_poll() {
    let device = FakeDevice::new("AMB001", "amber-home");
    device.set_cast_delay(Duration::from_millis(5));
    let (session, _rx) = device.session();
    session.setup().await.unwrap();

    let cast = {
        let session = Arc::clone(&session);
        let lock = session.cast_lock();
        CastCoordinator::new("AMB001_cast", Duration::from_secs(5), lock, move || {
            let session = Arc::clone(&session);
            async move { session.cast_update().await }
        })
    };
    let player = Arc::new(CastPlayer::new(Arc::clone(&session), cast.clone(), "AMB001"));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let cast = cast.clone();
        tasks.push(tokio::spawn(async move {
            cast.poll().refresh().await.unwrap();
        }));
        let player = Arc::clone(&player);
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                player.media_pause().await;
            } else {
                player.select_source("USB DAC").await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(!device.cast_overlapped());
    assert_eq!(device.fetches(Capability::Cast), 9);
    let pauses = device
        .commands()
        .into_iter()
        .filter(|c| *c == common::Recorded::Cast(CastCommand::Pause))
        .count();
    assert_eq!(pauses, 4);
    assert_eq!(player.audio_output().as_deref(), Some("USB DAC"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_central_cast_fetch_waits_for_a_cast_command() {
    let device = FakeDevice::new("AMB001", "amber-home");
    let (session, _rx) = device.session();
    session.setup().await.unwrap();

    // Release cast, then want it back so the central pass fetches it.
    let _util = session.subscribe(Capability::Utilization, "u");
    session.update().await.unwrap();
    let _player_sub = session.subscribe(Capability::Cast, "player");

    let cast = {
        let session = Arc::clone(&session);
        let lock = session.cast_lock();
        CastCoordinator::new("AMB001_cast", Duration::from_secs(5), lock, move || {
            let session = Arc::clone(&session);
            async move { session.cast_update().await }
        })
    };
    let player = Arc::new(CastPlayer::new(Arc::clone(&session), cast, "AMB001"));

    device.set_cast_delay(Duration::from_millis(200));
    let command = {
        let player = Arc::clone(&player);
        tokio::spawn(async move { player.media_pause().await })
    };
    sleep(Duration::from_millis(20)).await;
    session.update().await.unwrap();
    command.await.unwrap();

    assert!(!device.cast_overlapped());
    assert_eq!(device.fetches(Capability::Cast), 2);
    assert!(session.handles().cast.is_some());
    assert_eq!(device.commands(), vec![common::Recorded::Cast(CastCommand::Pause)]);
}
