use crate::model::peer::UserId;
use crate::model::room::DebateMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full floor state, broadcast after every turn transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnSnapshot {
    pub mode: DebateMode,
    pub speaker: Option<UserId>,
    pub deadline: Option<DateTime<Utc>>,
    pub queue: Vec<UserId>,
    pub moderator: Option<UserId>,
}
