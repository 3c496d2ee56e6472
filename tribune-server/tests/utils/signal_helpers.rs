use anyhow::{Result, bail};
use serde_json::{Value, json};

use tribune_core::{ClientEvent, RoomId, ServerEvent, UserId};

use super::test_client::TestClient;

/// Opaque session description, shaped like what a browser produces.
pub fn sdp(kind: &str, tag: &str) -> Value {
    json!({
        "type": kind,
        "sdp": format!("v=0\r\no=- {tag} 2 IN IP4 127.0.0.1\r\ns=-\r\n"),
    })
}

pub fn ice_candidate(n: u32) -> Value {
    json!({
        "candidate": format!("candidate:{n} 1 udp 2122260223 192.168.1.{n} 5000{n} typ host"),
        "sdpMid": "0",
        "sdpMLineIndex": 0,
    })
}

pub fn offer_to(room: &str, target: &UserId, description: Value) -> ClientEvent {
    ClientEvent::SendOffer {
        room_id: RoomId::from(room),
        target: target.clone(),
        description,
    }
}

pub fn answer_to(room: &str, target: &UserId, description: Value) -> ClientEvent {
    ClientEvent::SendAnswer {
        room_id: RoomId::from(room),
        target: target.clone(),
        description,
    }
}

pub fn ice_to(room: &str, target: &UserId, candidate: Value) -> ClientEvent {
    ClientEvent::SendIce {
        room_id: RoomId::from(room),
        target: target.clone(),
        candidate,
    }
}

/// Offer from `offerer` to `answerer` and the answer back, checking each
/// side receives exactly what the other sent.
pub async fn perform_signaling(
    room: &str,
    offerer: &mut TestClient,
    answerer: &mut TestClient,
) -> Result<()> {
    let offer = sdp("offer", &offerer.user_id.to_string());
    let ack = offerer
        .request(offer_to(room, &answerer.user_id, offer.clone()))
        .await?;
    if !ack.ok {
        bail!("offer rejected: {:?}", ack.error);
    }
    tracing::debug!("[SignalHelper] offer sent {} -> {}", offerer.user_id, answerer.user_id);

    let from = offerer.user_id.clone();
    let received = answerer
        .expect_event(|e| matches!(e, ServerEvent::Offer { .. }))
        .await?;
    match received {
        ServerEvent::Offer {
            from: sender,
            description,
            ..
        } if sender == from && description == offer => {}
        other => bail!("unexpected offer delivery: {:?}", other),
    }

    let answer = sdp("answer", &answerer.user_id.to_string());
    let ack = answerer
        .request(answer_to(room, &offerer.user_id, answer.clone()))
        .await?;
    if !ack.ok {
        bail!("answer rejected: {:?}", ack.error);
    }

    let from = answerer.user_id.clone();
    let received = offerer
        .expect_event(|e| matches!(e, ServerEvent::Answer { .. }))
        .await?;
    match received {
        ServerEvent::Answer {
            from: sender,
            description,
            ..
        } if sender == from && description == answer => Ok(()),
        other => bail!("unexpected answer delivery: {:?}", other),
    }
}
