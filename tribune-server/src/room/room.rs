use crate::config::RoomConfig;
use crate::error::{RoomError, RoomResult};
use crate::room::history::MessageRelay;
use crate::room::membership::Admission;
use crate::room::presence::PresenceRegistry;
use crate::room::room_command::{Closure, JoinOutcome, RoomCommand, RoomSnapshot, TurnAction};
use crate::room::room_manager::RoomHandle;
use crate::room::turn::{Transition, TurnArbiter};
use crate::signaling::SignalingRelay;
use crate::transport::ConnectionHandle;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tribune_core::{
    ChannelKind, ChatMessage, ConnectionId, DebateFormat, DebateRecord, Identity, ParticipantsUpdate,
    PeerInfo, RoomId, RoomSummary, ServerEvent, SystemNotice, UserId,
};

/// The single authority for one room's state.
///
/// A room runs as its own task and owns presence, chat history and the turn
/// arbiter outright; nothing else holds a reference to them. All mutation
/// arrives as [`RoomCommand`]s on one queue, including the room's own timers.
pub struct Room {
    id: RoomId,
    generation: u64,
    debate: DebateRecord,
    presence: PresenceRegistry,
    messages: MessageRelay,
    turns: TurnArbiter,
    signaling: SignalingRelay,
    config: RoomConfig,
    command_rx: mpsc::Receiver<RoomCommand>,
    command_tx: mpsc::WeakSender<RoomCommand>,
    registry: Arc<DashMap<RoomId, RoomHandle>>,
    deadline_timer: Option<JoinHandle<()>>,
    grace_timer: Option<JoinHandle<()>>,
    grace_token: u64,
}

impl Room {
    pub(crate) fn new(
        admission: &Admission,
        generation: u64,
        config: RoomConfig,
        command_rx: mpsc::Receiver<RoomCommand>,
        command_tx: mpsc::WeakSender<RoomCommand>,
        registry: Arc<DashMap<RoomId, RoomHandle>>,
    ) -> Self {
        let debate = admission.debate.clone();

        Self {
            id: debate.id.clone(),
            generation,
            presence: PresenceRegistry::new(),
            messages: MessageRelay::new(config.history_capacity, config.max_message_len),
            turns: TurnArbiter::new(debate.mode, admission.moderator.clone(), config.turn_duration),
            signaling: SignalingRelay::new(),
            debate,
            config,
            command_rx,
            command_tx,
            registry,
            deadline_timer: None,
            grace_timer: None,
            grace_token: 0,
        }
    }

    pub async fn run(mut self) {
        info!(
            "Room {} started ({:?}, {:?})",
            self.id, self.debate.format, self.debate.mode
        );

        while let Some(cmd) = self.command_rx.recv().await {
            let keep_running = self.handle_command(cmd);
            if !keep_running {
                break;
            }
            self.settle();
        }

        self.shutdown().await;
        info!(
            "Room {} finished ({} signals relayed, {} dropped)",
            self.id,
            self.signaling.delivered(),
            self.signaling.dropped()
        );
    }

    /// Returns false once the room has torn itself down.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                admission,
                connection,
                reply,
            } => {
                let outcome = self.handle_join(admission, connection);
                let _ = reply.send(Ok(outcome));
            }

            RoomCommand::Leave {
                user_id,
                connection,
            } => {
                debug!("{} leaves room {} explicitly", user_id, self.id);
                self.remove_connection(&user_id, connection);
            }

            RoomCommand::Disconnect {
                user_id,
                connection,
            } => {
                debug!("{} disconnected from room {}", user_id, self.id);
                self.remove_connection(&user_id, connection);
            }

            RoomCommand::Typing { user_id, typing } => {
                if self.presence.contains(&user_id) {
                    let event = ServerEvent::Typing {
                        room_id: self.id.clone(),
                        user_id: user_id.clone(),
                        typing,
                    };
                    self.presence.broadcast_except(Some(&user_id), &event);
                }
            }

            RoomCommand::SendMessage {
                user_id,
                content,
                reply,
            } => {
                let result = self.handle_message(&user_id, &content);
                let _ = reply.send(result);
            }

            RoomCommand::Turn {
                user_id,
                action,
                reply,
            } => {
                let result = self.handle_turn(&user_id, action);
                let _ = reply.send(result);
            }

            RoomCommand::Signal {
                from,
                to,
                kind,
                payload,
                reply,
            } => {
                let result = self.signaling.relay(
                    &self.id,
                    self.debate.format,
                    &self.presence,
                    &from,
                    &to,
                    kind,
                    payload,
                );
                let _ = reply.send(result);
            }

            RoomCommand::TurnDeadline { epoch } => {
                let transition = self.turns.deadline_elapsed(epoch);
                if transition.changed() {
                    info!("Turn deadline elapsed in room {}", self.id);
                }
                self.publish_turn(transition);
            }

            RoomCommand::GraceExpired { token } => {
                if token == self.grace_token && self.presence.is_empty() {
                    info!("Room {} empty after grace period, discarding", self.id);
                    self.detach();
                    return false;
                }
            }

            RoomCommand::Close { closure } => {
                let room_id = self.id.clone();
                let event = match closure {
                    Closure::Closed => ServerEvent::DebateClosed { room_id },
                    Closure::Deleted => ServerEvent::DebateDeleted { room_id },
                };
                info!("Room {} closing upstream: {:?}", self.id, closure);
                self.presence.broadcast(&event);
                self.detach();
                return false;
            }

            RoomCommand::Inspect { reply } => {
                let _ = reply.send(RoomSnapshot {
                    generation: self.generation,
                    present: self.presence.snapshot(),
                    turn: self.turns.snapshot(),
                    history_len: self.messages.len(),
                });
            }
        }

        true
    }

    fn handle_join(&mut self, admission: Admission, connection: ConnectionHandle) -> JoinOutcome {
        self.cancel_grace();

        // Title, status and roster may have moved on since the room was created.
        self.debate = admission.debate;
        let identity = admission.identity;
        let user_id = identity.user_id.clone();

        let is_new = self
            .presence
            .register(identity.clone(), admission.role, connection);

        if is_new {
            info!("{} joined room {}", user_id, self.id);
            self.announce_arrival(&identity, admission.channel);
            self.broadcast_participants();
        }

        let history = match admission.channel {
            ChannelKind::Text => self.messages.history(),
            ChannelKind::Voice => Vec::new(),
        };

        JoinOutcome {
            history,
            peers: self.presence.peer_infos(Some(&user_id)),
            room: self.summary(),
        }
    }

    fn handle_message(&mut self, user_id: &UserId, content: &str) -> RoomResult<ChatMessage> {
        let message = self
            .messages
            .append(&self.presence, &self.turns, user_id, content)?;

        self.presence.broadcast(&ServerEvent::Message {
            room_id: self.id.clone(),
            message: message.clone(),
        });
        Ok(message)
    }

    fn handle_turn(&mut self, user_id: &UserId, action: TurnAction) -> RoomResult<()> {
        if !self.presence.contains(user_id) {
            return Err(RoomError::NotPresent);
        }

        let transition = match action {
            TurnAction::RequestSpeak => self.turns.request_speak(user_id)?,
            TurnAction::CancelRequest => self.turns.cancel_request(user_id)?,
            TurnAction::Release => self.turns.release(user_id)?,
            TurnAction::Grant(target) => {
                let present = self.presence.contains(&target);
                self.turns.grant(user_id, &target, present)?
            }
            TurnAction::Revoke => self.turns.revoke(user_id)?,
            TurnAction::Next => self.turns.next(user_id)?,
        };

        self.publish_turn(transition);
        Ok(())
    }

    fn remove_connection(&mut self, user_id: &UserId, connection: ConnectionId) {
        let Some(identity) = self.presence.get(user_id).map(|p| p.identity.clone()) else {
            return;
        };

        let out = self.presence.unregister(user_id, connection);
        if out.participant_removed {
            self.handle_departure(&identity);
        }
    }

    /// A participant lost its last connection.
    fn handle_departure(&mut self, identity: &Identity) {
        let user_id = &identity.user_id;
        info!("{} left room {}", user_id, self.id);

        self.presence.broadcast(&ServerEvent::System {
            room_id: self.id.clone(),
            notice: SystemNotice::UserLeft {
                user_id: user_id.clone(),
            },
        });
        if self.debate.format == DebateFormat::Voice {
            self.presence.broadcast(&ServerEvent::PeerLeft {
                room_id: self.id.clone(),
                user_id: user_id.clone(),
            });
        }
        self.broadcast_participants();

        let transition = self.turns.leave(user_id);
        self.publish_turn(transition);
    }

    fn announce_arrival(&self, identity: &Identity, channel: ChannelKind) {
        let user_id = &identity.user_id;

        self.presence.broadcast_except(
            Some(user_id),
            &ServerEvent::System {
                room_id: self.id.clone(),
                notice: SystemNotice::UserJoined {
                    user_id: user_id.clone(),
                    display_name: identity.display_name.clone(),
                },
            },
        );

        if channel == ChannelKind::Voice {
            self.presence.broadcast_except(
                Some(user_id),
                &ServerEvent::PeerJoined {
                    room_id: self.id.clone(),
                    peer: PeerInfo {
                        user_id: user_id.clone(),
                        display_name: identity.display_name.clone(),
                    },
                },
            );
        }
    }

    fn broadcast_participants(&self) {
        let participants = self.presence.snapshot();
        self.presence
            .broadcast(&ServerEvent::ParticipantsUpdate(ParticipantsUpdate {
                room_id: self.id.clone(),
                count: participants.len(),
                participants,
            }));
    }

    fn publish_turn(&mut self, transition: Transition) {
        if !transition.changed() {
            return;
        }

        if let Some(state) = self.turns.snapshot() {
            if transition.queue_changed {
                self.presence.broadcast(&ServerEvent::QueueUpdated {
                    room_id: self.id.clone(),
                    queue: state.queue.clone(),
                });
            }
            self.presence.broadcast(&ServerEvent::TurnState {
                room_id: self.id.clone(),
                state,
            });
        }

        if transition.speaker_changed {
            self.arm_deadline();
        }
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            title: self.debate.title.clone(),
            format: self.debate.format,
            mode: self.debate.mode,
            status: self.debate.status,
            debate_participants: self.debate.participants.clone(),
            present: self.presence.snapshot(),
            turn: self.turns.snapshot(),
        }
    }

    /// Post-command bookkeeping: sweep connections that closed without a
    /// `Disconnect` yet, then start the grace timer if the room emptied.
    fn settle(&mut self) {
        for identity in self.presence.prune_closed() {
            self.handle_departure(&identity);
        }

        if self.presence.is_empty() && self.grace_timer.is_none() {
            self.arm_grace();
        }
    }

    fn arm_deadline(&mut self) {
        if let Some(timer) = self.deadline_timer.take() {
            timer.abort();
        }

        let Some((epoch, at)) = self.turns.pending_deadline() else {
            return;
        };
        let tx = self.command_tx.clone();

        self.deadline_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(RoomCommand::TurnDeadline { epoch }).await;
            }
        }));
    }

    fn arm_grace(&mut self) {
        self.grace_token += 1;
        let token = self.grace_token;
        let grace = self.config.grace_period;
        let tx = self.command_tx.clone();

        debug!("Room {} is empty, grace period {:?}", self.id, grace);
        self.grace_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(RoomCommand::GraceExpired { token }).await;
            }
        }));
    }

    fn cancel_grace(&mut self) {
        if let Some(timer) = self.grace_timer.take() {
            timer.abort();
            self.grace_token += 1;
        }
    }

    /// Unhook from the registry so new joins create a fresh room.
    fn detach(&self) {
        let generation = self.generation;
        self.registry
            .remove_if(&self.id, |_, handle| handle.generation == generation);
    }

    async fn shutdown(&mut self) {
        for timer in [self.deadline_timer.take(), self.grace_timer.take()]
            .into_iter()
            .flatten()
        {
            timer.abort();
        }

        // Anything that slipped in before the queue closed gets a retryable error.
        self.command_rx.close();
        while let Some(cmd) = self.command_rx.recv().await {
            warn!("Room {} rejecting command queued during teardown", self.id);
            cmd.reject(|| RoomError::RoomUnavailable);
        }

        self.detach();
        self.presence.clear();
    }
}
