// Hub registry and service-call routing.

#![allow(clippy::unwrap_used)]

mod common;

use amberos_api::CastCommand;
use amberos_core::{CoreError, EntryState, Hub, ServiceCall};
use pretty_assertions::assert_eq;

use common::{FakeDevice, Fault, Recorded};

// ── Helpers ─────────────────────────────────────────────────────────

async fn hub_with(devices: &[&FakeDevice]) -> Hub {
    let hub = Hub::new();
    for device in devices {
        hub.load(device.config(), device.factory()).await.unwrap();
    }
    hub
}

fn play(path: &str) -> Recorded {
    Recorded::Cast(CastCommand::PlayMedia {
        session_id: "0".into(),
        media_type: String::new(),
        media_id: path.into(),
        from_player: false,
    })
}

// ── Registry ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_entries_are_keyed_by_serial() {
    let a = FakeDevice::new("AMB002", "amber-office");
    let b = FakeDevice::new("AMB001", "amber-home");
    let hub = hub_with(&[&a, &b]).await;

    assert_eq!(hub.len(), 2);
    assert_eq!(hub.serials(), vec!["AMB001", "AMB002"]);
    assert!(hub.get("AMB002").unwrap().is_loaded());

    hub.unload("AMB002").await.unwrap();
    assert_eq!(hub.serials(), vec!["AMB001"]);
    assert_eq!(a.logouts(), 1);
    assert!(matches!(
        hub.unload("AMB002").await,
        Err(CoreError::EntryNotFound { .. })
    ));

    hub.unload("AMB001").await.unwrap();
    assert!(hub.is_empty());
}

#[tokio::test]
async fn test_failed_reload_is_listed_until_retried() {
    let a = FakeDevice::new("AMB001", "amber-home");
    let b = FakeDevice::new("AMB002", "amber-office");
    let hub = hub_with(&[&a, &b]).await;
    assert!(hub.failed().is_empty());

    let entry = hub.get("AMB002").unwrap();
    let mut state = entry.state();
    b.expire_sessions();
    b.reject_login(true);
    entry.runtime().unwrap().central().refresh().await.unwrap();
    state
        .wait_for(|s| matches!(s, EntryState::Failed { .. }))
        .await
        .unwrap();

    assert_eq!(hub.failed(), vec!["AMB002"]);
    assert_eq!(hub.serials(), vec!["AMB001", "AMB002"]);
    let err = hub
        .call(ServiceCall::Reboot {
            serial: Some("AMB002".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotLoaded));

    b.reject_login(false);
    hub.get("AMB002").unwrap().setup().await.unwrap();
    assert!(hub.failed().is_empty());
}

// ── Routing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_entry_needs_no_serial() {
    let device = FakeDevice::new("AMB001", "amber-home");
    let hub = hub_with(&[&device]).await;

    hub.call(ServiceCall::Reboot { serial: None }).await.unwrap();
    hub.call(ServiceCall::Shutdown {
        serial: None,
        reason: Some("power work".into()),
    })
    .await
    .unwrap();

    assert_eq!(
        device.commands(),
        vec![Recorded::Reboot, Recorded::Shutdown(Some("power work".into()))]
    );
}

#[tokio::test]
async fn test_several_entries_need_a_serial() {
    let a = FakeDevice::new("AMB001", "amber-home");
    let b = FakeDevice::new("AMB002", "amber-office");
    let hub = hub_with(&[&a, &b]).await;

    let err = hub.call(ServiceCall::Reboot { serial: None }).await.unwrap_err();
    match err {
        CoreError::AmbiguousEntry { serials } => assert_eq!(serials, vec!["AMB001", "AMB002"]),
        other => panic!("expected AmbiguousEntry, got {other:?}"),
    }

    hub.call(ServiceCall::Reboot {
        serial: Some("AMB002".into()),
    })
    .await
    .unwrap();
    assert!(a.commands().is_empty());
    assert_eq!(b.commands(), vec![Recorded::Reboot]);
}

#[tokio::test]
async fn test_unknown_serial_is_rejected() {
    let device = FakeDevice::new("AMB001", "amber-home");
    let hub = hub_with(&[&device]).await;

    let err = hub
        .call(ServiceCall::Reboot {
            serial: Some("AMB999".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { serial } if serial == "AMB999"));
    assert!(device.commands().is_empty());
}

// ── Cast play ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_cast_play_with_serial_passes_the_path_through() {
    let device = FakeDevice::new("AMB001", "amber-home");
    let hub = hub_with(&[&device]).await;

    hub.call(ServiceCall::CastPlay {
        serial: Some("AMB001".into()),
        filename: Some("/share/music/song.flac".into()),
        entity_ids: vec![],
    })
    .await
    .unwrap();

    assert_eq!(device.commands(), vec![play("/share/music/song.flac")]);
}

#[tokio::test]
async fn test_cast_play_needs_a_filename() {
    let device = FakeDevice::new("AMB001", "amber-home");
    let hub = hub_with(&[&device]).await;

    for filename in [None, Some(String::new())] {
        let err = hub
            .call(ServiceCall::CastPlay {
                serial: None,
                filename,
                entity_ids: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }
    assert!(device.commands().is_empty());
}

#[tokio::test]
async fn test_cast_play_picks_entry_by_entity_hostname() {
    let a = FakeDevice::new("AMB001", "amber-home");
    let b = FakeDevice::new("AMB002", "amber-office");
    let hub = hub_with(&[&a, &b]).await;

    hub.call(ServiceCall::CastPlay {
        serial: None,
        filename: Some("movies/trailer.mp4".into()),
        entity_ids: vec!["media_player.amber_office_cast".into()],
    })
    .await
    .unwrap();

    assert!(a.commands().is_empty());
    assert_eq!(b.commands(), vec![play("/share/movies/trailer.mp4")]);

    let err = hub
        .call(ServiceCall::CastPlay {
            serial: None,
            filename: Some("x.mp4".into()),
            entity_ids: vec!["media_player.living_room".into()],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
}

#[tokio::test]
async fn test_cast_play_of_unindexed_file_is_not_an_error() {
    let device = FakeDevice::new("AMB001", "amber-home");
    let hub = hub_with(&[&device]).await;
    device.fail_commands(Some(Fault::FileIndexNotFound));

    hub.call(ServiceCall::CastPlay {
        serial: None,
        filename: Some("/share/missing.mp4".into()),
        entity_ids: vec![],
    })
    .await
    .unwrap();
    assert!(device.commands().is_empty());
}
