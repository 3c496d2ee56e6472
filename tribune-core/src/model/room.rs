use crate::model::peer::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Room key. Always equal to the debate id it coordinates.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DebateFormat {
    Text,
    Voice,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DebateMode {
    Free,
    TurnBased,
    Moderated,
}

impl DebateMode {
    /// Whether a turn arbiter governs the floor.
    pub fn is_arbitrated(self) -> bool {
        !matches!(self, DebateMode::Free)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    Open,
    InProgress,
    Closed,
}

/// Which kind of room a connection is trying to enter.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelKind {
    pub fn matches(self, format: DebateFormat) -> bool {
        matches!(
            (self, format),
            (ChannelKind::Text, DebateFormat::Text) | (ChannelKind::Voice, DebateFormat::Voice)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Moderator,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct DebateParticipant {
    pub user_id: UserId,
    pub username: String,
}

/// The debate record as served by the external debate service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DebateRecord {
    pub id: RoomId,
    pub title: String,
    pub format: DebateFormat,
    pub mode: DebateMode,
    pub status: DebateStatus,
    /// May be missing while the author record is still being populated.
    #[serde(default)]
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub participants: Vec<DebateParticipant>,
}

impl DebateRecord {
    pub fn participant(&self, user_id: &UserId) -> Option<&DebateParticipant> {
        self.participants.iter().find(|p| &p.user_id == user_id)
    }
}
