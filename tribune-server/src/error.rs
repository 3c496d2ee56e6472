use tribune_core::{ErrorBody, ErrorKind, UserId};

/// Every way a room operation can be refused. Reported only to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("debate not found")]
    NotFound,
    #[error("debate is closed")]
    Closed,
    #[error("channel does not match the debate format")]
    FormatMismatch,
    #[error("not a participant of this debate")]
    NotAParticipant,
    #[error("not present in this room")]
    NotPresent,
    #[error("only the moderator can do that")]
    NotModerator,
    #[error("message is empty")]
    EmptyMessage,
    #[error("message exceeds {0} characters")]
    MessageTooLong(usize),
    #[error("not your turn")]
    NotYourTurn,
    #[error("this room has no turn arbitration")]
    NotArbitrated,
    #[error("this room is not moderated")]
    NotModerated,
    #[error("already queued to speak")]
    AlreadyQueued,
    #[error("already holding the floor")]
    AlreadySpeaking,
    #[error("you do not hold the floor")]
    NotSpeaking,
    #[error("{0} is not present in this room")]
    TargetNotPresent(UserId),
    #[error("moderator for this debate is not resolved yet")]
    ModeratorUnresolved,
    #[error("{0} is not reachable")]
    PeerUnreachable(UserId),
    #[error("room unavailable, retry")]
    RoomUnavailable,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::NotFound => ErrorKind::NotFound,
            RoomError::NotAParticipant | RoomError::NotPresent | RoomError::NotModerator => {
                ErrorKind::Unauthorized
            }
            RoomError::Closed
            | RoomError::FormatMismatch
            | RoomError::EmptyMessage
            | RoomError::MessageTooLong(_)
            | RoomError::NotArbitrated
            | RoomError::NotModerated
            | RoomError::AlreadyQueued
            | RoomError::AlreadySpeaking
            | RoomError::TargetNotPresent(_)
            | RoomError::ModeratorUnresolved => ErrorKind::InvalidState,
            RoomError::NotYourTurn | RoomError::NotSpeaking => ErrorKind::TurnViolation,
            RoomError::PeerUnreachable(_) => ErrorKind::PeerUnreachable,
            RoomError::RoomUnavailable | RoomError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            reason: self.to_string(),
        }
    }
}

pub type RoomResult<T> = Result<T, RoomError>;
