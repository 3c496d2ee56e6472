use crate::error::{RoomError, RoomResult};
use crate::room::presence::PresenceRegistry;
use crate::room::turn::TurnArbiter;
use chrono::Utc;
use std::collections::VecDeque;
use tribune_core::{ChatMessage, UserId};

/// Chat relay for one room: validation, sequencing and a bounded history.
#[derive(Debug)]
pub struct MessageRelay {
    history: VecDeque<ChatMessage>,
    capacity: usize,
    max_len: usize,
    next_seq: u64,
}

impl MessageRelay {
    pub fn new(capacity: usize, max_len: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            max_len,
            next_seq: 1,
        }
    }

    pub fn append(
        &mut self,
        presence: &PresenceRegistry,
        turn: &TurnArbiter,
        user_id: &UserId,
        content: &str,
    ) -> RoomResult<ChatMessage> {
        let Some(participant) = presence.get(user_id) else {
            return Err(RoomError::NotPresent);
        };

        let content = content.trim();
        if content.is_empty() {
            return Err(RoomError::EmptyMessage);
        }
        if content.chars().count() > self.max_len {
            return Err(RoomError::MessageTooLong(self.max_len));
        }
        if !turn.may_write(user_id) {
            return Err(RoomError::NotYourTurn);
        }

        let message = ChatMessage {
            seq: self.next_seq,
            user_id: user_id.clone(),
            display_name: participant.identity.display_name.clone(),
            content: content.to_owned(),
            ts: Utc::now(),
        };
        self.next_seq += 1;

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(message.clone());

        Ok(message)
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
