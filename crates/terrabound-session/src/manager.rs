//! Session manager: creates runtimes and tracks which player is where.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;

use terrabound_protocol::{MatchData, PlayerId, SessionId};
use uuid::Uuid;

use crate::logic::{ClientInput, SessionLogic};
use crate::runtime::spawn_session;
use crate::{PlayerSender, SessionConfig, SessionError, SessionHandle, SessionInfo};

/// Owns every running session of one game mode.
///
/// A player is in at most one session at a time.
pub struct SessionManager<L: SessionLogic> {
    config: SessionConfig,
    sessions: HashMap<SessionId, SessionHandle>,
    player_sessions: HashMap<PlayerId, SessionId>,
    _logic: PhantomData<fn() -> L>,
}

impl<L: SessionLogic> SessionManager<L> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            player_sessions: HashMap::new(),
            _logic: PhantomData,
        }
    }

    /// Spawns a new runtime and returns its freshly generated id.
    pub fn create_session(&mut self, params: L::Params) -> SessionId {
        let session_id = SessionId(Uuid::new_v4().to_string());
        let handle = spawn_session::<L>(session_id.clone(), &params, &self.config);
        self.sessions.insert(session_id.clone(), handle);
        tracing::info!(%session_id, "session created");
        session_id
    }

    /// Returns a clone of a session's handle, for calls that shouldn't
    /// hold the manager.
    pub fn handle(&self, session_id: &SessionId) -> Option<SessionHandle> {
        self.sessions.get(session_id).cloned()
    }

    /// Adds a player to a session.
    pub async fn join(
        &mut self,
        player_id: PlayerId,
        session_id: &SessionId,
        sender: PlayerSender,
        metadata: HashMap<String, String>,
    ) -> Result<(), SessionError> {
        if let Some(current) = self.player_sessions.get(&player_id) {
            return Err(SessionError::AlreadyInSession(player_id, current.clone()));
        }

        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        handle.join(player_id.clone(), sender, metadata).await?;
        self.player_sessions.insert(player_id, session_id.clone());
        Ok(())
    }

    /// Removes a player from their current session and returns its id.
    pub async fn leave(&mut self, player_id: &PlayerId) -> Result<SessionId, SessionError> {
        let session_id = self
            .player_sessions
            .remove(player_id)
            .ok_or_else(|| SessionError::NotInSession(player_id.clone()))?;

        if let Some(handle) = self.sessions.get(&session_id) {
            // The mapping is gone either way; a terminated runtime has no
            // presence left to remove.
            if let Err(e) = handle.leave(vec![player_id.clone()]).await {
                tracing::debug!(%session_id, %player_id, error = %e, "leave on stopped session");
            }
        }
        Ok(session_id)
    }

    /// Removes a player only if they are mapped to `session_id`.
    ///
    /// A connection that joined one session uses this so it never
    /// removes the same identity from a session joined elsewhere.
    pub async fn leave_session(
        &mut self,
        player_id: &PlayerId,
        session_id: &SessionId,
    ) -> Result<(), SessionError> {
        if self.player_sessions.get(player_id) != Some(session_id) {
            return Err(SessionError::NotInSession(player_id.clone()));
        }
        self.leave(player_id).await.map(|_| ())
    }

    /// The handle of the player's current session. Callers clone it out
    /// and send without holding the manager.
    pub fn input_handle(&self, player_id: &PlayerId) -> Result<SessionHandle, SessionError> {
        let session_id = self
            .player_sessions
            .get(player_id)
            .ok_or_else(|| SessionError::NotInSession(player_id.clone()))?;
        self.handle(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))
    }

    /// Queues a player's input on their current session.
    pub async fn route_input(
        &self,
        player_id: &PlayerId,
        frame: MatchData,
    ) -> Result<(), SessionError> {
        let handle = self.input_handle(player_id)?;
        handle
            .send_input(ClientInput {
                sender: player_id.clone(),
                op_code: frame.op_code,
                data: frame.data,
            })
            .await
    }

    /// Terminates a session and forgets every player mapped to it.
    pub async fn terminate(
        &mut self,
        session_id: &SessionId,
        grace: Duration,
    ) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        self.player_sessions.retain(|_, sid| sid != session_id);

        if let Err(e) = handle.terminate(grace).await {
            tracing::warn!(%session_id, error = %e, "session already stopped");
        }
        tracing::info!(%session_id, "session terminated");
        Ok(())
    }

    /// Drops a session that was never joined. Used when registering it
    /// elsewhere failed.
    pub async fn discard(&mut self, session_id: &SessionId) {
        if let Err(e) = self.terminate(session_id, Duration::ZERO).await {
            tracing::debug!(%session_id, error = %e, "discard of unknown session");
        }
    }

    pub async fn session_info(&self, session_id: &SessionId) -> Result<SessionInfo, SessionError> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        handle.info().await
    }

    pub fn player_session(&self, player_id: &PlayerId) -> Option<&SessionId> {
        self.player_sessions.get(player_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }
}

impl<L: SessionLogic> Default for SessionManager<L> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
