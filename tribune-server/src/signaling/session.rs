use crate::error::{RoomError, RoomResult};
use crate::room::{JoinOutcome, RoomManager, TurnAction};
use crate::transport::ConnectionHandle;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tribune_core::{
    AckPayload, ChannelKind, ClientEvent, ClientFrame, ConnectionId, Identity, RoomId,
    ServerEvent, SignalKind, TextJoinAck, VoiceJoinAck,
};

/// One authenticated connection and the rooms it has joined.
///
/// Transport-agnostic: the WebSocket handler feeds it frames and drains the
/// receiver returned by [`Session::new`]; tests drive it directly.
pub struct Session {
    identity: Identity,
    connection: ConnectionHandle,
    manager: RoomManager,
    joined: HashSet<RoomId>,
}

impl Session {
    pub fn new(
        identity: Identity,
        manager: RoomManager,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (connection, rx) = ConnectionHandle::channel();
        let session = Self {
            identity,
            connection,
            manager,
            joined: HashSet::new(),
        };
        (session, rx)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub async fn handle_frame(&mut self, frame: ClientFrame) {
        let result = self.handle_event(frame.event).await;

        match (frame.ack, result) {
            (Some(ack), Ok(data)) => {
                self.connection
                    .send(ServerEvent::Ack(AckPayload::success(ack, data)));
            }
            (Some(ack), Err(err)) => {
                self.connection
                    .send(ServerEvent::Ack(AckPayload::failure(ack, err.to_body())));
            }
            (None, Err(err)) => {
                debug!("Unacknowledged request from {} failed: {}", self.identity.user_id, err);
            }
            (None, Ok(_)) => {}
        }
    }

    async fn handle_event(&mut self, event: ClientEvent) -> RoomResult<Option<Value>> {
        let user_id = self.identity.user_id.clone();

        match event {
            ClientEvent::JoinRoom { room_id } => {
                let outcome = self.join(&room_id, ChannelKind::Text).await?;
                to_data(&TextJoinAck {
                    history: outcome.history,
                    room: outcome.room,
                })
            }

            ClientEvent::JoinVoiceRoom { room_id } => {
                let outcome = self.join(&room_id, ChannelKind::Voice).await?;
                to_data(&VoiceJoinAck {
                    peers: outcome.peers,
                    ice_servers: self.manager.ice_servers(),
                    room: outcome.room,
                })
            }

            ClientEvent::LeaveRoom { room_id } | ClientEvent::LeaveVoiceRoom { room_id } => {
                if self.joined.remove(&room_id) {
                    self.manager
                        .leave(&room_id, &user_id, self.connection.id())
                        .await;
                }
                Ok(None)
            }

            ClientEvent::Typing { room_id, typing } => {
                self.manager.typing(&room_id, &user_id, typing).await;
                Ok(None)
            }

            ClientEvent::SendMessage { room_id, content } => {
                let message = self
                    .manager
                    .send_message(&room_id, &user_id, content)
                    .await?;
                to_data(&message)
            }

            ClientEvent::RequestSpeak { room_id } => {
                self.turn(&room_id, TurnAction::RequestSpeak).await
            }
            ClientEvent::CancelRequest { room_id } => {
                self.turn(&room_id, TurnAction::CancelRequest).await
            }
            ClientEvent::ReleaseTurn { room_id } => self.turn(&room_id, TurnAction::Release).await,
            ClientEvent::ModeratorGrant { room_id, target } => {
                self.turn(&room_id, TurnAction::Grant(target)).await
            }
            ClientEvent::ModeratorRevoke { room_id } => {
                self.turn(&room_id, TurnAction::Revoke).await
            }
            ClientEvent::ModeratorNext { room_id } => self.turn(&room_id, TurnAction::Next).await,

            ClientEvent::SendOffer {
                room_id,
                target,
                description,
            } => {
                self.manager
                    .signal(&room_id, &user_id, &target, SignalKind::Offer, description)
                    .await?;
                Ok(None)
            }
            ClientEvent::SendAnswer {
                room_id,
                target,
                description,
            } => {
                self.manager
                    .signal(&room_id, &user_id, &target, SignalKind::Answer, description)
                    .await?;
                Ok(None)
            }
            ClientEvent::SendIce {
                room_id,
                target,
                candidate,
            } => {
                self.manager
                    .signal(&room_id, &user_id, &target, SignalKind::Ice, candidate)
                    .await?;
                Ok(None)
            }
        }
    }

    async fn join(&mut self, room_id: &RoomId, channel: ChannelKind) -> RoomResult<JoinOutcome> {
        let outcome = self
            .manager
            .join(room_id, &self.identity, channel, self.connection.clone())
            .await?;
        self.joined.insert(room_id.clone());
        Ok(outcome)
    }

    async fn turn(&self, room_id: &RoomId, action: TurnAction) -> RoomResult<Option<Value>> {
        self.manager
            .turn(room_id, &self.identity.user_id, action)
            .await?;
        Ok(None)
    }

    /// The socket is gone: an implicit leave from every joined room.
    pub async fn close(self) {
        info!(
            "Connection {} of {} closing ({} rooms)",
            self.connection.id(),
            self.identity.user_id,
            self.joined.len()
        );
        for room_id in &self.joined {
            self.manager
                .disconnect(room_id, &self.identity.user_id, self.connection.id())
                .await;
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> RoomResult<Option<Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| RoomError::Internal(e.into()))
}
