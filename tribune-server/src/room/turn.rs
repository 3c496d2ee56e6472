use crate::error::{RoomError, RoomResult};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tribune_core::{DebateMode, TurnSnapshot, UserId};

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    wall: DateTime<Utc>,
}

impl Deadline {
    /// None when `duration` runs past either clock; the turn is then unbounded.
    fn after(duration: Duration) -> Option<Self> {
        let at = Instant::now().checked_add(duration)?;
        let wall = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))?;
        Some(Deadline { at, wall })
    }
}

/// What a turn operation changed. The room decides what to broadcast from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub speaker_changed: bool,
    pub queue_changed: bool,
}

impl Transition {
    pub fn changed(self) -> bool {
        self.speaker_changed || self.queue_changed
    }

    fn merge(self, other: Transition) -> Transition {
        Transition {
            speaker_changed: self.speaker_changed || other.speaker_changed,
            queue_changed: self.queue_changed || other.queue_changed,
        }
    }
}

/// Floor control for one room.
///
/// `Free` rooms never leave the idle state. `TurnBased` rooms hand the floor
/// to the queue head automatically and bound every turn with a deadline.
/// `Moderated` rooms only move the floor on moderator action, an explicit
/// release, or the speaker leaving.
///
/// Every time the speaker slot changes the epoch is bumped, so a deadline
/// timer armed for an older turn can recognise itself as stale.
#[derive(Debug)]
pub struct TurnArbiter {
    mode: DebateMode,
    speaker: Option<UserId>,
    deadline: Option<Deadline>,
    queue: VecDeque<UserId>,
    moderator: Option<UserId>,
    turn_duration: Duration,
    epoch: u64,
}

impl TurnArbiter {
    pub fn new(mode: DebateMode, moderator: Option<UserId>, turn_duration: Duration) -> Self {
        let moderator = match mode {
            DebateMode::Moderated => moderator,
            _ => None,
        };
        Self {
            mode,
            speaker: None,
            deadline: None,
            queue: VecDeque::new(),
            moderator,
            turn_duration,
            epoch: 0,
        }
    }

    pub fn moderator(&self) -> Option<&UserId> {
        self.moderator.as_ref()
    }

    pub fn speaker(&self) -> Option<&UserId> {
        self.speaker.as_ref()
    }

    pub fn queue(&self) -> Vec<UserId> {
        self.queue.iter().cloned().collect()
    }

    /// Deadline the room should arm a timer for, tagged with the current epoch.
    pub fn pending_deadline(&self) -> Option<(u64, Instant)> {
        self.deadline.map(|d| (self.epoch, d.at))
    }

    pub fn may_write(&self, user_id: &UserId) -> bool {
        match self.mode {
            DebateMode::Free => true,
            _ => self.speaker.as_ref() == Some(user_id),
        }
    }

    pub fn snapshot(&self) -> Option<TurnSnapshot> {
        if !self.mode.is_arbitrated() {
            return None;
        }
        Some(TurnSnapshot {
            mode: self.mode,
            speaker: self.speaker.clone(),
            deadline: self.deadline.map(|d| d.wall),
            queue: self.queue(),
            moderator: self.moderator.clone(),
        })
    }

    pub fn request_speak(&mut self, user_id: &UserId) -> RoomResult<Transition> {
        self.ensure_arbitrated()?;
        if self.speaker.as_ref() == Some(user_id) {
            return Err(RoomError::AlreadySpeaking);
        }
        if self.queue.contains(user_id) {
            return Err(RoomError::AlreadyQueued);
        }

        self.queue.push_back(user_id.clone());
        let queued = Transition {
            speaker_changed: false,
            queue_changed: true,
        };
        Ok(queued.merge(self.auto_advance()))
    }

    pub fn cancel_request(&mut self, user_id: &UserId) -> RoomResult<Transition> {
        self.ensure_arbitrated()?;
        Ok(Transition {
            speaker_changed: false,
            queue_changed: self.dequeue(user_id),
        })
    }

    /// The speaker hands the floor back before the deadline.
    pub fn release(&mut self, user_id: &UserId) -> RoomResult<Transition> {
        self.ensure_arbitrated()?;
        if self.speaker.as_ref() != Some(user_id) {
            return Err(RoomError::NotSpeaking);
        }
        self.clear_speaker();
        Ok(Transition {
            speaker_changed: true,
            queue_changed: false,
        }
        .merge(self.auto_advance()))
    }

    pub fn grant(
        &mut self,
        caller: &UserId,
        target: &UserId,
        target_present: bool,
    ) -> RoomResult<Transition> {
        self.ensure_moderator(caller)?;
        if !target_present {
            return Err(RoomError::TargetNotPresent(target.clone()));
        }
        if self.speaker.as_ref() == Some(target) {
            return Ok(Transition::default());
        }

        let queue_changed = self.dequeue(target);
        self.seat(target.clone());
        Ok(Transition {
            speaker_changed: true,
            queue_changed,
        })
    }

    pub fn revoke(&mut self, caller: &UserId) -> RoomResult<Transition> {
        self.ensure_moderator(caller)?;
        if self.speaker.is_none() {
            return Ok(Transition::default());
        }
        self.clear_speaker();
        Ok(Transition {
            speaker_changed: true,
            queue_changed: false,
        }
        .merge(self.auto_advance()))
    }

    /// Revoke, then hand the floor to the queue head if anyone is waiting.
    pub fn next(&mut self, caller: &UserId) -> RoomResult<Transition> {
        self.ensure_moderator(caller)?;
        let had_speaker = self.speaker.is_some();
        self.clear_speaker();
        let advanced = self.advance();
        Ok(Transition {
            speaker_changed: had_speaker || advanced.speaker_changed,
            queue_changed: advanced.queue_changed,
        })
    }

    /// A participant left the room: drop them from the queue and, if they
    /// held the floor, pass it on.
    pub fn leave(&mut self, user_id: &UserId) -> Transition {
        if !self.mode.is_arbitrated() {
            return Transition::default();
        }
        let queue_changed = self.dequeue(user_id);
        if self.speaker.as_ref() != Some(user_id) {
            return Transition {
                speaker_changed: false,
                queue_changed,
            };
        }

        self.clear_speaker();
        let advanced = self.advance();
        Transition {
            speaker_changed: true,
            queue_changed: queue_changed || advanced.queue_changed,
        }
    }

    pub fn deadline_elapsed(&mut self, epoch: u64) -> Transition {
        if epoch != self.epoch || self.deadline.is_none() || self.speaker.is_none() {
            return Transition::default();
        }
        self.clear_speaker();
        Transition {
            speaker_changed: true,
            queue_changed: false,
        }
        .merge(self.advance())
    }

    fn ensure_arbitrated(&self) -> RoomResult<()> {
        if !self.mode.is_arbitrated() {
            return Err(RoomError::NotArbitrated);
        }
        Ok(())
    }

    fn ensure_moderator(&self, caller: &UserId) -> RoomResult<()> {
        self.ensure_arbitrated()?;
        if self.mode != DebateMode::Moderated {
            return Err(RoomError::NotModerated);
        }
        if self.moderator.as_ref() != Some(caller) {
            return Err(RoomError::NotModerator);
        }
        Ok(())
    }

    fn auto_advance(&mut self) -> Transition {
        if self.mode != DebateMode::TurnBased {
            return Transition::default();
        }
        self.advance()
    }

    fn advance(&mut self) -> Transition {
        if self.speaker.is_some() {
            return Transition::default();
        }
        let Some(next) = self.queue.pop_front() else {
            return Transition::default();
        };
        self.seat(next);
        Transition {
            speaker_changed: true,
            queue_changed: true,
        }
    }

    fn seat(&mut self, user_id: UserId) {
        self.epoch += 1;
        self.speaker = Some(user_id);
        self.deadline = match self.mode {
            DebateMode::TurnBased => Deadline::after(self.turn_duration),
            _ => None,
        };
    }

    fn clear_speaker(&mut self) {
        self.epoch += 1;
        self.speaker = None;
        self.deadline = None;
    }

    fn dequeue(&mut self, user_id: &UserId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| queued != user_id);
        before != self.queue.len()
    }
}
