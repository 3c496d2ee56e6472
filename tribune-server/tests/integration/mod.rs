
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

use tribune_core::{DebateRecord, IceServerConfig, RoomId};
use tribune_server::{InMemoryDebateDirectory, RoomConfig, RoomManager, RoomSnapshot};

pub const TEST_GRACE: Duration = Duration::from_secs(2);
pub const TEST_TURN: Duration = Duration::from_secs(60);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> RoomConfig {
    RoomConfig {
        history_capacity: 50,
        turn_duration: TEST_TURN,
        grace_period: TEST_GRACE,
        max_message_len: 500,
    }
}

pub fn test_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig {
        urls: vec!["stun:stun.test:3478".to_string()],
        username: None,
        credential: None,
    }]
}

pub fn create_test_manager(
    debates: impl IntoIterator<Item = DebateRecord>,
) -> (RoomManager, Arc<InMemoryDebateDirectory>) {
    create_manager_with(debates, test_config())
}

pub fn create_manager_with(
    debates: impl IntoIterator<Item = DebateRecord>,
    config: RoomConfig,
) -> (RoomManager, Arc<InMemoryDebateDirectory>) {
    let directory = Arc::new(InMemoryDebateDirectory::with_debates(debates));
    let manager = RoomManager::new(directory.clone(), config, test_ice_servers());
    (manager, directory)
}

/// Round-trips through the room queue, so every command sent before it has
/// been applied and its broadcasts delivered.
pub async fn sync_room(manager: &RoomManager, room: &str) -> Option<RoomSnapshot> {
    manager.inspect(&RoomId::from(room)).await
}
