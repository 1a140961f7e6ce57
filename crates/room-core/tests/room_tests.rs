use room_core::{Manager, RoomConfig, RoomError, RoomFilter, RoomStatus};
use std::time::Duration;
use systems_common::PlayerId;

fn fast_config() -> RoomConfig {
    RoomConfig {
        empty_grace: Duration::from_millis(50),
        ttl: Duration::from_secs(3600),
        finished_grace: Duration::from_millis(50),
        reaper_interval: Duration::from_millis(10),
        reattach_window: Duration::from_millis(50),
        ..RoomConfig::default()
    }
}

#[test]
fn create_join_and_list_rooms() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Friday Night".into(), 4, "standard".into(), None)
        .unwrap();
    assert_eq!(snap.status, RoomStatus::Waiting);
    assert_eq!(snap.players.len(), 1);

    let guest = PlayerId::new();
    let joined = manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();
    assert_eq!(joined.players.len(), 2);

    let listed = manager.list_rooms(Default::default(), Default::default());
    assert_eq!(listed.len(), 1);
}

#[test]
fn room_full_rejects_extra_player() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Duo".into(), 2, "standard".into(), None)
        .unwrap();
    manager.join(snap.room_id, PlayerId::new(), "P2".into(), None).unwrap();
    let err = manager.join(snap.room_id, PlayerId::new(), "P3".into(), None).unwrap_err();
    assert!(matches!(err, RoomError::RoomFull));
}

#[test]
fn private_room_is_hidden_unless_join_code_given() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Private".into(), 4, "standard".into(), Some("secret".into()))
        .unwrap();

    let listed = manager.list_rooms(Default::default(), Default::default());
    assert!(listed.is_empty());

    let with_code = manager.list_rooms(
        RoomFilter { join_code: Some(snap.join_code.clone()), ..Default::default() },
        Default::default(),
    );
    assert_eq!(with_code.len(), 1);
    assert_eq!(with_code[0].room_id, snap.room_id);
}

#[test]
fn wrong_password_is_rejected() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Private".into(), 4, "standard".into(), Some("secret".into()))
        .unwrap();
    let err = manager
        .join(snap.room_id, PlayerId::new(), "Guest".into(), Some("wrong"))
        .unwrap_err();
    assert!(matches!(err, RoomError::WrongPassword));
    manager
        .join(snap.room_id, PlayerId::new(), "Guest".into(), Some("secret"))
        .unwrap();
}

#[test]
fn one_room_per_player_is_enforced() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    manager
        .create_room(host, "Host".into(), "Room A".into(), 4, "standard".into(), None)
        .unwrap();
    let err = manager
        .create_room(host, "Host".into(), "Room B".into(), 4, "standard".into(), None)
        .unwrap_err();
    assert!(matches!(err, RoomError::AlreadyInRoom(_)));
}

/// spec §8 scenario 4: host leaves, next-earliest-joined player becomes host.
#[test]
fn host_transfer_on_leave_picks_earliest_joined() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Transfer".into(), 4, "standard".into(), None)
        .unwrap();
    let second = PlayerId::new();
    let third = PlayerId::new();
    manager.join(snap.room_id, second, "Second".into(), None).unwrap();
    manager.join(snap.room_id, third, "Third".into(), None).unwrap();

    let after_leave = manager.leave(snap.room_id, host).unwrap();
    assert_eq!(after_leave.host_player_id, second);
    assert_eq!(after_leave.players.len(), 2);
}

#[test]
fn select_song_and_ready_up_reaches_ready_status() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Ready Test".into(), 2, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();
    let room = manager.get_room(snap.room_id).unwrap();

    room.select_song(host, "song-1".into()).unwrap();
    room.set_ready(host, true).unwrap();
    let after = room.set_ready(guest, true).unwrap();
    assert_eq!(after.status, RoomStatus::Ready);

    let started = room.start(host).unwrap();
    assert_eq!(started.status, RoomStatus::Playing);
}

#[test]
fn ready_up_before_song_select_also_reaches_ready_status() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Ready Test Reversed".into(), 2, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();
    let room = manager.get_room(snap.room_id).unwrap();

    room.set_ready(host, true).unwrap();
    room.set_ready(guest, true).unwrap();
    let after = room.select_song(host, "song-1".into()).unwrap();
    assert_eq!(after.status, RoomStatus::Ready);
}

#[test]
fn room_auto_advances_to_preparing_when_full() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Full House".into(), 2, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    let joined = manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();
    assert_eq!(joined.status, RoomStatus::Preparing);
}

#[test]
fn only_host_can_start_or_select_song() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Solo Host".into(), 4, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();
    let room = manager.get_room(snap.room_id).unwrap();

    let err = room.select_song(guest, "song-1".into()).unwrap_err();
    assert!(matches!(err, RoomError::NotHost));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_room_is_reaped_after_grace_period() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Soon Empty".into(), 4, "standard".into(), None)
        .unwrap();
    manager.leave(snap.room_id, host).unwrap();
    assert_eq!(manager.room_count(), 1);

    tokio::time::advance(Duration::from_millis(100)).await;
    manager.reap_once();
    assert_eq!(manager.room_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn finished_room_is_reaped_after_grace_period() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Game Over".into(), 2, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();
    let room = manager.get_room(snap.room_id).unwrap();

    room.set_ready(host, true).unwrap();
    room.select_song(host, "song-1".into()).unwrap();
    room.set_ready(guest, true).unwrap();
    room.start(host).unwrap();
    room.end_game(host).unwrap();
    assert_eq!(room.status(), RoomStatus::Finished);

    tokio::time::advance(Duration::from_millis(100)).await;
    manager.reap_once();
    assert_eq!(manager.room_count(), 0);
}

#[test]
fn closed_room_rejects_further_joins() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Closing".into(), 4, "standard".into(), None)
        .unwrap();
    let room = manager.get_room(snap.room_id).unwrap();
    room.close(room_core::CloseReason::HostLeft);

    let err = manager.join(snap.room_id, PlayerId::new(), "Late".into(), None).unwrap_err();
    assert!(matches!(err, RoomError::RoomClosed));
}

#[test]
fn subscriber_receives_player_joined_event() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Events".into(), 4, "standard".into(), None)
        .unwrap();
    let room = manager.get_room(snap.room_id).unwrap();
    let mut rx = room.subscribe(host).unwrap();

    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();

    let event = rx.try_recv().expect("expected a broadcast event");
    match event {
        room_core::RoomEvent::PlayerJoined { player_id, .. } => assert_eq!(player_id, guest),
        other => panic!("unexpected event: {other:?}"),
    }
}

/// spec §4.2 "Failure": a reattach within the window restores the
/// player's standing without treating the disconnect as a `Leave`.
#[test]
fn reattach_within_window_keeps_player_in_room() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Reattach".into(), 4, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();

    manager.handle_disconnect(guest);
    let room = manager.reattach(guest).unwrap();
    assert_eq!(room.id, snap.room_id);
    assert!(room.snapshot().contains(guest));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn disconnect_past_window_is_swept_into_a_leave() {
    let manager = Manager::new(fast_config());
    let host = PlayerId::new();
    let snap = manager
        .create_room(host, "Host".into(), "Reattach Expiry".into(), 4, "standard".into(), None)
        .unwrap();
    let guest = PlayerId::new();
    manager.join(snap.room_id, guest, "Guest".into(), None).unwrap();

    manager.handle_disconnect(guest);
    tokio::time::advance(Duration::from_millis(100)).await;
    manager.sweep_disconnects();

    let room = manager.get_room(snap.room_id).unwrap();
    assert!(!room.snapshot().contains(guest));
    assert!(manager.reattach(guest).is_err());
}
