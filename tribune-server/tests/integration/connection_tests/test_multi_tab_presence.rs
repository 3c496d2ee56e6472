use tribune_core::{ClientEvent, DebateFormat, DebateMode, RoomId, ServerEvent, SystemNotice, UserId};

use crate::integration::{create_test_manager, init_tracing, sync_room};
use crate::utils::{TestClient, debate};

fn user_left(event: &ServerEvent, who: &str) -> bool {
    matches!(
        event,
        ServerEvent::System {
            notice: SystemNotice::UserLeft { user_id },
            ..
        } if user_id == &UserId::from(who)
    )
}

#[tokio::test]
async fn test_count_tracks_joins_and_leaves() {
    init_tracing();

    let users = ["u1", "u2", "u3", "u4", "u5"];
    let (manager, _directory) =
        create_test_manager([debate("d1", DebateFormat::Text, DebateMode::Free, &users)]);

    let mut clients = Vec::new();
    for id in users {
        let mut client = TestClient::connect(&manager, id, id);
        client.join("d1").await.expect("Join failed");
        clients.push(client);
    }

    let mut leaving = clients.split_off(3).into_iter();
    let mut explicit = leaving.next().unwrap();
    explicit
        .send(ClientEvent::LeaveRoom {
            room_id: RoomId::from("d1"),
        })
        .await;
    leaving.next().unwrap().close().await;
    explicit.close().await;

    let snapshot = sync_room(&manager, "d1").await.expect("Room should be live");
    assert_eq!(snapshot.present.len(), 3);

    let last_update = clients[0]
        .drain_now()
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::ParticipantsUpdate(update) => Some(update),
            _ => None,
        })
        .last()
        .expect("Roster updates should have been broadcast");
    assert_eq!(last_update.count, 3);
    assert_eq!(last_update.participants.len(), 3);

    for client in clients {
        client.close().await;
    }
}

#[tokio::test]
async fn test_second_tab_keeps_participant_present() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);

    let mut tab1 = TestClient::connect(&manager, "alice", "Alice");
    let mut tab2 = TestClient::connect(&manager, "alice", "Alice");
    let mut bob = TestClient::connect(&manager, "bob", "Bob");
    tab1.join("d1").await.unwrap();
    tab2.join("d1").await.unwrap();
    bob.join("d1").await.unwrap();
    bob.drain_now();

    // Both tabs see room traffic.
    bob.say("d1", "hi alice").await.unwrap();
    for tab in [&mut tab1, &mut tab2] {
        tab.expect_event(|e| matches!(e, ServerEvent::Message { .. }))
            .await
            .expect("Every tab should get the message");
    }

    tab1.close().await;
    let snapshot = sync_room(&manager, "d1").await.unwrap();
    assert_eq!(snapshot.present.len(), 2);
    assert!(
        !bob.drain_now().iter().any(|e| user_left(e, "alice")),
        "Closing one tab must not announce a departure"
    );

    tab2.close().await;
    sync_room(&manager, "d1").await.unwrap();
    assert!(bob.drain_now().iter().any(|e| user_left(e, "alice")));

    bob.close().await;
}

#[tokio::test]
async fn test_dropped_connection_is_swept() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let mut bob = TestClient::connect(&manager, "bob", "Bob");
    alice.join("d1").await.unwrap();
    bob.join("d1").await.unwrap();
    bob.drain_now();

    // Vanishes without a disconnect reaching the room.
    drop(alice);

    bob.say("d1", "anyone?").await.unwrap();
    let snapshot = sync_room(&manager, "d1").await.unwrap();
    assert_eq!(snapshot.present.len(), 1);
    assert!(bob.drain_now().iter().any(|e| user_left(e, "alice")));

    bob.close().await;
}
