use crate::model::peer::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat line. Immutable once appended to a room's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub seq: u64,
    pub user_id: UserId,
    pub display_name: String,
    pub content: String,
    pub ts: DateTime<Utc>,
}
