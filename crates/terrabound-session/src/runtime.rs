//! Session actor: one Tokio task per running session.
//!
//! The actor owns the session state and the tick scheduler. Commands
//! arrive over a bounded mpsc channel and are interleaved with ticks in a
//! single `select!` loop, so the state is only ever touched by one event
//! at a time.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;

use terrabound_protocol::{Channel, MatchData, PlayerId, SessionId};
use terrabound_tick::{TickConfig, TickScheduler};
use tokio::sync::{mpsc, oneshot};

use crate::logic::{ClientInput, Initialized, SessionLogic};
use crate::{RuntimeState, SessionConfig, SessionError};

/// A frame the runtime delivers to one player's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub channel: Channel,
    pub frame: MatchData,
}

/// Channel sender for delivering outbound frames to a player.
pub type PlayerSender = mpsc::UnboundedSender<Outbound>;

pub(crate) enum SessionCommand {
    Join {
        player_id: PlayerId,
        sender: PlayerSender,
        metadata: HashMap<String, String>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Leave {
        players: Vec<PlayerId>,
        reply: oneshot::Sender<()>,
    },
    /// Queued until the next tick.
    Input(ClientInput),
    Signal {
        data: String,
        reply: oneshot::Sender<String>,
    },
    Terminate {
        grace: Duration,
        reply: oneshot::Sender<()>,
    },
    GetInfo {
        reply: oneshot::Sender<SessionInfo>,
    },
}

/// Metadata about a running session (not the game state itself).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub label: String,
    pub state: RuntimeState,
    /// Players with a live outbound channel.
    pub player_count: usize,
    /// Ticks executed so far.
    pub tick: u64,
}

/// Handle to a running session actor.
///
/// Cheap to clone. Every method fails with [`SessionError::Unavailable`]
/// once the actor has terminated.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    fn unavailable(&self) -> SessionError {
        SessionError::Unavailable(self.session_id.clone())
    }

    /// Asks the session to admit a player. Outbound frames for that
    /// player go to `sender` from the next tick on.
    pub async fn join(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
        metadata: HashMap<String, String>,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Join {
                player_id,
                sender,
                metadata,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes players. Players who aren't in the session are ignored.
    pub async fn leave(&self, players: Vec<PlayerId>) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Leave {
                players,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Queues a raw input for the next tick (fire-and-forget).
    pub async fn send_input(&self, input: ClientInput) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Input(input))
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn signal(&self, data: impl Into<String>) -> Result<String, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Signal {
                data: data.into(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Runs the terminate hook and stops the actor. Resolves once the
    /// hook has run.
    pub async fn terminate(&self, grace: Duration) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Terminate {
                grace,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn info(&self) -> Result<SessionInfo, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }
}

struct SessionActor<L: SessionLogic> {
    session_id: SessionId,
    label: String,
    lifecycle: RuntimeState,
    state: L::State,
    members: HashMap<PlayerId, PlayerSender>,
    pending: Vec<ClientInput>,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<SessionCommand>,
    _logic: PhantomData<fn() -> L>,
}

impl<L: SessionLogic> SessionActor<L> {
    async fn run(mut self) {
        self.lifecycle = RuntimeState::Running;
        tracing::info!(
            session_id = %self.session_id,
            label = %self.label,
            tick_rate = self.scheduler.tick_rate_hz(),
            "session started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::info!(session_id = %self.session_id, "all handles dropped");
                        break;
                    };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                tick = self.scheduler.wait_for_tick() => {
                    self.run_tick(tick.number);
                    self.scheduler.record_tick_end();
                }
            }
        }

        self.lifecycle = RuntimeState::Terminated;
        tracing::info!(
            session_id = %self.session_id,
            ticks = self.scheduler.tick_count(),
            "session stopped"
        );
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Join {
                player_id,
                sender,
                metadata,
                reply,
            } => {
                let result = self.handle_join(player_id, sender, &metadata);
                let _ = reply.send(result);
            }
            SessionCommand::Leave { players, reply } => {
                self.handle_leave(&players);
                let _ = reply.send(());
            }
            SessionCommand::Input(input) => self.pending.push(input),
            SessionCommand::Signal { data, reply } => {
                let _ = reply.send(L::signal(&mut self.state, &data));
            }
            SessionCommand::Terminate { grace, reply } => {
                tracing::info!(session_id = %self.session_id, ?grace, "session terminating");
                L::terminate(&mut self.state, grace);
                self.members.clear();
                self.receiver.close();
                let _ = reply.send(());
                return false;
            }
            SessionCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        sender: PlayerSender,
        metadata: &HashMap<String, String>,
    ) -> Result<(), SessionError> {
        let decision = L::join_attempt(&self.state, &player_id, metadata);
        if !decision.accepted {
            let reason = decision.reason.unwrap_or_default();
            tracing::debug!(session_id = %self.session_id, %player_id, %reason, "join rejected");
            return Err(SessionError::JoinRejected {
                session_id: self.session_id.clone(),
                reason,
            });
        }

        L::join(&mut self.state, std::slice::from_ref(&player_id));
        self.members.insert(player_id.clone(), sender);
        tracing::info!(
            session_id = %self.session_id,
            %player_id,
            players = self.members.len(),
            "player joined"
        );
        Ok(())
    }

    fn handle_leave(&mut self, players: &[PlayerId]) {
        L::leave(&mut self.state, players);
        for player_id in players {
            if self.members.remove(player_id).is_some() {
                tracing::info!(
                    session_id = %self.session_id,
                    %player_id,
                    players = self.members.len(),
                    "player left"
                );
            }
        }
    }

    fn run_tick(&mut self, tick: u64) {
        let inputs = std::mem::take(&mut self.pending);
        let broadcasts = L::tick(&mut self.state, tick, inputs);

        for broadcast in broadcasts {
            let outbound = Outbound {
                channel: broadcast.channel,
                frame: MatchData {
                    op_code: broadcast.op_code,
                    data: broadcast.data,
                },
            };
            // A closed receiver means the connection is gone; its leave
            // is on the way.
            for sender in self.members.values() {
                let _ = sender.send(outbound.clone());
            }
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            label: self.label.clone(),
            state: self.lifecycle,
            player_count: self.members.len(),
            tick: self.scheduler.tick_count(),
        }
    }
}

/// Initializes the logic and spawns its actor task.
pub(crate) fn spawn_session<L: SessionLogic>(
    session_id: SessionId,
    params: &L::Params,
    config: &SessionConfig,
) -> SessionHandle {
    let Initialized {
        state,
        tick_rate,
        label,
    } = L::init(params);

    let scheduler = TickScheduler::new(TickConfig {
        tick_rate_hz: tick_rate,
        policy: config.tick_policy,
        initial_jitter_us: config.initial_jitter_us,
        ..TickConfig::default()
    });

    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let actor = SessionActor::<L> {
        session_id: session_id.clone(),
        label,
        lifecycle: RuntimeState::Created,
        state,
        members: HashMap::new(),
        pending: Vec::new(),
        scheduler,
        receiver: rx,
        _logic: PhantomData,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        session_id,
        sender: tx,
    }
}
