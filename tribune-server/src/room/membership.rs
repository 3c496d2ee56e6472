use crate::directory::DebateDirectory;
use crate::error::{RoomError, RoomResult};
use std::sync::Arc;
use tracing::{debug, error};
use tribune_core::{
    ChannelKind, DebateMode, DebateRecord, DebateStatus, Identity, Role, RoomId, UserId,
};

/// Result of a successful authorization, applied to the room in one step.
#[derive(Debug, Clone)]
pub struct Admission {
    pub identity: Identity,
    pub role: Role,
    pub channel: ChannelKind,
    pub moderator: Option<UserId>,
    pub debate: DebateRecord,
}

/// Checks a connecting identity against the debate record.
#[derive(Clone)]
pub struct MembershipGuard {
    directory: Arc<dyn DebateDirectory>,
}

impl MembershipGuard {
    pub fn new(directory: Arc<dyn DebateDirectory>) -> Self {
        Self { directory }
    }

    pub async fn authorize(
        &self,
        room_id: &RoomId,
        identity: &Identity,
        channel: ChannelKind,
    ) -> RoomResult<Admission> {
        let debate = self
            .directory
            .get_debate(room_id)
            .await
            .map_err(|e| collaborator_failure(room_id, e))?
            .ok_or(RoomError::NotFound)?;

        if debate.status == DebateStatus::Closed {
            return Err(RoomError::Closed);
        }
        if !channel.matches(debate.format) {
            return Err(RoomError::FormatMismatch);
        }

        let is_participant = self
            .directory
            .is_participant(room_id, &identity.user_id)
            .await
            .map_err(|e| collaborator_failure(room_id, e))?;
        if !is_participant {
            debug!("{} is not a participant of {}", identity.user_id, room_id);
            return Err(RoomError::NotAParticipant);
        }

        let moderator = match debate.mode {
            DebateMode::Moderated => Some(
                debate
                    .author_id
                    .clone()
                    .ok_or(RoomError::ModeratorUnresolved)?,
            ),
            _ => None,
        };

        let role = if moderator.as_ref() == Some(&identity.user_id) {
            Role::Moderator
        } else {
            Role::Member
        };

        let display_name = debate
            .participant(&identity.user_id)
            .map(|p| p.username.clone())
            .unwrap_or_else(|| identity.display_name.clone());

        Ok(Admission {
            identity: Identity {
                user_id: identity.user_id.clone(),
                display_name,
            },
            role,
            channel,
            moderator,
            debate,
        })
    }
}

fn collaborator_failure(room_id: &RoomId, err: anyhow::Error) -> RoomError {
    error!("Debate directory failed for {}: {:#}", room_id, err);
    RoomError::Internal(err)
}
