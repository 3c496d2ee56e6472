use tribune_core::{DebateFormat, DebateMode, Role, RoomId, ServerEvent, UserId};

use crate::integration::{create_test_manager, init_tracing, sync_room};
use crate::utils::{TestClient, debate};

#[tokio::test]
async fn test_single_participant_joins_room() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let ack = alice.join("d1").await.expect("Join failed");

    assert!(ack.history.is_empty(), "Fresh room should have no history");
    assert_eq!(ack.room.id, RoomId::from("d1"));
    assert_eq!(ack.room.present.len(), 1);
    assert_eq!(ack.room.present[0].user_id, UserId::from("alice"));
    assert_eq!(ack.room.present[0].role, Role::Member);
    assert!(ack.room.turn.is_none(), "Free rooms carry no turn state");

    // The joiner sees its own arrival in the roster, not a system notice.
    let events = alice.drain_now();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::ParticipantsUpdate(update) if update.count == 1
    )));
    assert!(!events.iter().any(|e| matches!(e, ServerEvent::System { .. })));

    let snapshot = sync_room(&manager, "d1").await.expect("Room should be live");
    assert_eq!(snapshot.present.len(), 1);
    assert_eq!(manager.room_count(), 1);

    alice.close().await;
}

#[tokio::test]
async fn test_second_join_is_announced_to_first() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let mut bob = TestClient::connect(&manager, "bob", "Bob");
    alice.join("d1").await.expect("Alice join failed");
    alice.drain_now();

    let ack = bob.join("d1").await.expect("Bob join failed");
    assert_eq!(ack.room.present.len(), 2);

    let joined = alice
        .expect_event(|e| matches!(e, ServerEvent::System { .. }))
        .await
        .expect("Alice should hear about Bob");
    match joined {
        ServerEvent::System { notice, .. } => assert_eq!(
            notice,
            tribune_core::SystemNotice::UserJoined {
                user_id: UserId::from("bob"),
                display_name: "Bob".to_string(),
            }
        ),
        other => panic!("unexpected event {other:?}"),
    }

    let update = alice
        .expect_event(|e| matches!(e, ServerEvent::ParticipantsUpdate(_)))
        .await
        .expect("Alice should get the roster");
    assert!(matches!(update, ServerEvent::ParticipantsUpdate(u) if u.count == 2));

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_rejoin_same_connection_is_idempotent() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let mut bob = TestClient::connect(&manager, "bob", "Bob");
    alice.join("d1").await.expect("Join failed");
    bob.join("d1").await.expect("Join failed");
    bob.drain_now();

    let ack = alice.join("d1").await.expect("Second join failed");
    assert_eq!(ack.room.present.len(), 2);

    sync_room(&manager, "d1").await.expect("Room should be live");
    assert!(
        bob.drain_now().is_empty(),
        "A repeated join must not be announced again"
    );

    alice.close().await;
    bob.close().await;
}
