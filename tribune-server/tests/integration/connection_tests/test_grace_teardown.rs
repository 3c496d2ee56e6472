use std::time::Duration;

use tribune_core::{DebateFormat, DebateMode, RoomId};
use tribune_server::RoomManager;

use crate::integration::{TEST_GRACE, create_test_manager, init_tracing, sync_room};
use crate::utils::{TestClient, debate};

/// Give the room task a few scheduler turns after its timer fired.
async fn wait_until_gone(manager: &RoomManager, room: &str) -> bool {
    for _ in 0..20 {
        if !manager.has_room(&RoomId::from(room)) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_is_discarded_after_grace() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    alice.join("d1").await.unwrap();
    assert!(alice.say("d1", "before").await.unwrap().ok);
    let first = sync_room(&manager, "d1").await.unwrap().generation;
    alice.close().await;

    sync_room(&manager, "d1").await.expect("Room lingers during grace");

    tokio::time::sleep(TEST_GRACE + Duration::from_millis(100)).await;
    assert!(wait_until_gone(&manager, "d1").await, "Room should be torn down");
    assert_eq!(manager.room_count(), 0);

    // A later join starts over with nothing carried across.
    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let ack = alice.join("d1").await.unwrap();
    assert!(ack.history.is_empty(), "No stale history after teardown");

    let second = sync_room(&manager, "d1").await.unwrap().generation;
    assert_ne!(first, second);

    alice.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_within_grace_keeps_room() {
    init_tracing();

    let (manager, _directory) = create_test_manager([debate(
        "d1",
        DebateFormat::Text,
        DebateMode::Free,
        &["alice"],
    )]);

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    alice.join("d1").await.unwrap();
    alice.say("d1", "still here").await.unwrap();
    let first = sync_room(&manager, "d1").await.unwrap().generation;
    alice.close().await;
    sync_room(&manager, "d1").await.unwrap();

    tokio::time::sleep(TEST_GRACE / 2).await;

    let mut alice = TestClient::connect(&manager, "alice", "Alice");
    let ack = alice.join("d1").await.unwrap();
    assert_eq!(ack.history.len(), 1);
    assert_eq!(ack.history[0].content, "still here");

    // The cancelled grace timer must not take the room down later.
    tokio::time::sleep(TEST_GRACE * 2).await;
    let snapshot = sync_room(&manager, "d1").await.expect("Room still live");
    assert_eq!(snapshot.generation, first);
    assert_eq!(snapshot.present.len(), 1);

    alice.close().await;
}
