//! One task per client: handshake, then route envelopes.
//!
//! After the handshake a client can ask the allocator for a session,
//! join it, and stream position inputs. Session broadcasts for the
//! player arrive on an unbounded channel and are written out between
//! reads. A client that sends nothing for `idle_timeout` is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use terrabound_matchmaker::{AccountStore, SessionRegistry};
use terrabound_protocol::{
    Channel, Codec, Envelope, MatchData, Payload, PlayerId, ProtocolError, SessionId,
    SystemMessage,
};
use terrabound_session::{ClientInput, Outbound, SessionError};
use terrabound_transport::{Connection, Delivery, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::{Authenticator, TerraboundError};

/// Removes the player from the session this connection joined when the
/// handler exits. A connection that joined nothing removes nothing.
///
/// `Drop` is synchronous, so the async leave runs in a spawned task.
struct PresenceGuard<Au, R, A>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    player_id: PlayerId,
    joined: Option<SessionId>,
    state: Arc<ServerState<Au, R, A>>,
}

impl<Au, R, A> Drop for PresenceGuard<Au, R, A>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    fn drop(&mut self) {
        let Some(session_id) = self.joined.take() else {
            return;
        };
        let player_id = self.player_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut sessions = state.sessions.lock().await;
            if sessions.leave_session(&player_id, &session_id).await.is_ok() {
                tracing::info!(%player_id, %session_id, "removed disconnected player");
            }
        });
    }
}

/// Per-connection bookkeeping for outgoing envelopes.
struct Outgoing {
    seq: u64,
    start: Instant,
}

impl Outgoing {
    fn new() -> Self {
        Self {
            seq: 1,
            start: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn envelope(&mut self, channel: Channel, payload: Payload) -> Envelope {
        let seq = self.seq;
        self.seq += 1;
        Envelope {
            seq,
            timestamp: self.elapsed_ms(),
            channel,
            payload,
        }
    }

    fn system(&mut self, msg: SystemMessage) -> Envelope {
        self.envelope(Channel::ReliableOrdered, Payload::System(msg))
    }
}

/// Drives one connection until it closes, times out or fails.
pub(crate) async fn handle_connection<Au, R, A>(
    conn: WebSocketConnection,
    state: Arc<ServerState<Au, R, A>>,
) -> Result<(), TerraboundError>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let mut out = Outgoing::new();
    let player_id = perform_handshake(&conn, &state, &mut out).await?;
    tracing::info!(%conn_id, %player_id, "player authenticated");

    let mut presence = PresenceGuard {
        player_id: player_id.clone(),
        joined: None,
        state: Arc::clone(&state),
    };
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<Outbound>();

    let idle_timeout = state.config.idle_timeout;
    let mut deadline = tokio::time::Instant::now() + idle_timeout;

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };
                deadline = tokio::time::Instant::now() + idle_timeout;

                let envelope: Envelope = match state.codec.decode(&data) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                        continue;
                    }
                };

                match envelope.payload {
                    Payload::System(msg) => {
                        let close = handle_system_message(
                            &conn,
                            &state,
                            &player_id,
                            msg,
                            &frames_tx,
                            &mut presence.joined,
                            &mut out,
                        )
                        .await?;
                        if close {
                            break;
                        }
                    }
                    Payload::Match(frame) => {
                        let joined = presence.joined.as_ref();
                        handle_match_data(&conn, &state, &player_id, joined, frame, &mut out).await?;
                    }
                }
            }
            Some(outbound) = frames_rx.recv() => {
                let envelope = out.envelope(outbound.channel, Payload::Match(outbound.frame));
                let bytes = state.codec.encode(&envelope)?;
                conn.send_with(&bytes, delivery_for(envelope.channel)).await?;
            }
            () = tokio::time::sleep_until(deadline) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%player_id, error = %e, "close failed");
    }
    // `presence` drops here and leaves the joined session.
    Ok(())
}

/// Receives the Handshake, validates it, authenticates, sends the Ack.
async fn perform_handshake<Au, R, A>(
    conn: &WebSocketConnection,
    state: &ServerState<Au, R, A>,
    out: &mut Outgoing,
) -> Result<PlayerId, TerraboundError>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            let reason = "connection closed before handshake".to_owned();
            return Err(ProtocolError::InvalidMessage(reason).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into()),
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let (version, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => (version, token),
        _ => {
            send_error(conn, state, out, 400, "expected Handshake").await?;
            let reason = "first message must be Handshake".to_owned();
            return Err(ProtocolError::InvalidMessage(reason).into());
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        send_error(conn, state, out, 400, &message).await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let player_id = match state.auth.authenticate(token.as_deref().unwrap_or("")).await {
        Ok(player_id) => player_id,
        Err(e) => {
            send_error(conn, state, out, 401, "unauthorized").await?;
            return Err(e.into());
        }
    };

    let server_time = out.elapsed_ms();
    let ack = out.system(SystemMessage::HandshakeAck {
        player_id: player_id.clone(),
        server_time,
    });
    conn.send(&state.codec.encode(&ack)?).await?;

    Ok(player_id)
}

/// Returns `true` when the client asked to disconnect.
async fn handle_system_message<Au, R, A>(
    conn: &WebSocketConnection,
    state: &ServerState<Au, R, A>,
    player_id: &PlayerId,
    msg: SystemMessage,
    frames_tx: &mpsc::UnboundedSender<Outbound>,
    joined: &mut Option<SessionId>,
    out: &mut Outgoing,
) -> Result<bool, TerraboundError>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            let server_time = out.elapsed_ms();
            let ack = out.system(SystemMessage::HeartbeatAck {
                client_time,
                server_time,
            });
            conn.send(&state.codec.encode(&ack)?).await?;
        }

        SystemMessage::RequestSession => {
            match state.allocator.request_session(Some(player_id)).await {
                Ok(assignment) => {
                    let resp = out.system(SystemMessage::SessionAssigned(assignment));
                    conn.send(&state.codec.encode(&resp)?).await?;
                }
                Err(e) => {
                    tracing::warn!(%player_id, error = %e, "session request failed");
                    send_error(conn, state, out, e.status_code(), &e.to_string()).await?;
                }
            }
        }

        SystemMessage::JoinSession { session_id } => {
            let result = state
                .sessions
                .lock()
                .await
                .join(player_id.clone(), &session_id, frames_tx.clone(), HashMap::new())
                .await;

            match result {
                Ok(()) => {
                    *joined = Some(session_id.clone());
                    let resp = out.system(SystemMessage::SessionJoined { session_id });
                    conn.send(&state.codec.encode(&resp)?).await?;
                }
                Err(e) => {
                    send_error(conn, state, out, session_error_code(&e), &e.to_string()).await?;
                }
            }
        }

        SystemMessage::LeaveSession => match joined.take() {
            Some(session_id) => {
                let result = state
                    .sessions
                    .lock()
                    .await
                    .leave_session(player_id, &session_id)
                    .await;
                if let Err(e) = result {
                    tracing::debug!(%player_id, error = %e, "leave session failed");
                }
            }
            None => tracing::debug!(%player_id, "leave without a joined session"),
        },

        SystemMessage::Disconnect { reason } => {
            tracing::info!(%player_id, %reason, "client disconnected");
            return Ok(true);
        }

        _ => {
            tracing::debug!(%player_id, "ignoring unexpected system message");
        }
    }

    Ok(false)
}

/// Queues a match input on the player's session.
async fn handle_match_data<Au, R, A>(
    conn: &WebSocketConnection,
    state: &ServerState<Au, R, A>,
    player_id: &PlayerId,
    joined: Option<&SessionId>,
    frame: MatchData,
    out: &mut Outgoing,
) -> Result<(), TerraboundError>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    let result = match joined {
        Some(_) => {
            // Only the lookup holds the manager lock. A full session
            // channel then blocks this connection alone.
            let handle = state.sessions.lock().await.input_handle(player_id);
            match handle {
                Ok(handle) => {
                    handle
                        .send_input(ClientInput {
                            sender: player_id.clone(),
                            op_code: frame.op_code,
                            data: frame.data,
                        })
                        .await
                }
                Err(e) => Err(e),
            }
        }
        None => Err(SessionError::NotInSession(player_id.clone())),
    };

    if let Err(e) = result {
        send_error(conn, state, out, session_error_code(&e), &e.to_string()).await?;
    }
    Ok(())
}

fn delivery_for(channel: Channel) -> Delivery {
    match channel {
        Channel::ReliableOrdered => Delivery::Reliable,
        Channel::Unreliable => Delivery::BestEffort,
    }
}

fn session_error_code(e: &SessionError) -> u16 {
    match e {
        SessionError::NotFound(_) => 404,
        SessionError::Unavailable(_) => 410,
        SessionError::JoinRejected { .. } => 403,
        SessionError::AlreadyInSession(..) => 409,
        SessionError::NotInSession(_) => 400,
    }
}

/// Sends a `SystemMessage::Error` envelope to the client.
async fn send_error<Au, R, A>(
    conn: &WebSocketConnection,
    state: &ServerState<Au, R, A>,
    out: &mut Outgoing,
    code: u16,
    message: &str,
) -> Result<(), TerraboundError> {
    let envelope = out.system(SystemMessage::Error {
        code,
        message: message.to_owned(),
    });
    conn.send(&state.codec.encode(&envelope)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_sequence_increments() {
        let mut out = Outgoing::new();
        let a = out.system(SystemMessage::LeaveSession);
        let b = out.system(SystemMessage::LeaveSession);
        assert_eq!((a.seq, b.seq), (1, 2));
    }

    #[test]
    fn test_session_error_codes() {
        let sid = SessionId::from("s");
        assert_eq!(session_error_code(&SessionError::NotFound(sid.clone())), 404);
        assert_eq!(
            session_error_code(&SessionError::AlreadyInSession(PlayerId::from("p"), sid)),
            409
        );
    }
}
