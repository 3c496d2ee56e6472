use std::sync::Arc;

use tribune_core::{
    ClientEvent, DebateFormat, DebateMode, DebateStatus, ErrorKind, RoomId, ServerEvent,
};
use tribune_server::{Closure, RoomManager};

use crate::integration::{create_test_manager, init_tracing, test_config, test_ice_servers};
use crate::utils::{MockDirectory, TestClient, debate};

#[tokio::test]
async fn test_closed_debate_evicts_room() {
    init_tracing();

    let (manager, directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let mut bob = TestClient::connect(&manager, "bob", "Bob");
    alice.join("d1").await.unwrap();
    bob.join("d1").await.unwrap();

    directory.set_status(&RoomId::from("d1"), DebateStatus::Closed);
    assert!(manager.close_room(&RoomId::from("d1"), Closure::Closed).await);

    for client in [&mut alice, &mut bob] {
        client
            .expect_event(|e| matches!(e, ServerEvent::DebateClosed { .. }))
            .await
            .expect("Everyone should hear the debate closed");
    }

    // The room is gone and cannot be rejoined while the debate is closed.
    let ack = alice.say("d1", "hello?").await.unwrap();
    assert_eq!(ack.error.map(|e| e.kind), Some(ErrorKind::Unauthorized));
    assert!(!manager.has_room(&RoomId::from("d1")));

    let kind = bob
        .expect_err(ClientEvent::JoinRoom {
            room_id: RoomId::from("d1"),
        })
        .await
        .unwrap();
    assert_eq!(kind, ErrorKind::InvalidState);

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_deleted_debate_evicts_room() {
    init_tracing();

    let (manager, directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    alice.join("d1").await.unwrap();

    directory.remove(&RoomId::from("d1"));
    assert!(manager.close_room(&RoomId::from("d1"), Closure::Deleted).await);
    alice
        .expect_event(|e| matches!(e, ServerEvent::DebateDeleted { .. }))
        .await
        .unwrap();

    let kind = alice
        .expect_err(ClientEvent::JoinRoom {
            room_id: RoomId::from("d1"),
        })
        .await
        .unwrap();
    assert_eq!(kind, ErrorKind::NotFound);

    // Nothing live to close any more.
    assert!(!manager.close_room(&RoomId::from("d1"), Closure::Deleted).await);

    alice.close().await;
}

#[tokio::test]
async fn test_join_authorized_before_close_is_refused() {
    init_tracing();

    let directory = MockDirectory::new([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice", "bob"],
    )]);
    let manager = RoomManager::new(Arc::new(directory.clone()), test_config(), test_ice_servers());
    let room_id = RoomId::from("d1");

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    alice.join("d1").await.unwrap();

    // Bob's membership check is in flight while the debate closes.
    directory.hold_checks();
    let mut bob = TestClient::connect(&manager, "bob", "Bob");
    let bob_join = tokio::spawn(async move {
        let result = bob
            .expect_err(ClientEvent::JoinRoom {
                room_id: RoomId::from("d1"),
            })
            .await;
        (bob, result)
    });
    directory.check_held().await;

    directory.set_status("d1", DebateStatus::Closed);
    assert!(manager.close_room(&room_id, Closure::Closed).await);
    alice
        .expect_event(|e| matches!(e, ServerEvent::DebateClosed { .. }))
        .await
        .unwrap();

    directory.release_checks();
    let (mut bob, result) = bob_join.await.unwrap();
    assert_eq!(result.unwrap(), ErrorKind::InvalidState);
    assert!(!manager.has_room(&room_id), "No room may come back for a closed debate");

    // Reopened upstream: joins work again.
    directory.set_status("d1", DebateStatus::Open);
    assert!(manager.reopen(&room_id));
    let ack = bob.join("d1").await.expect("Join after reopen failed");
    assert_eq!(ack.room.status, DebateStatus::Open);
    assert!(manager.has_room(&room_id));

    alice.close().await;
    bob.close().await;
}
