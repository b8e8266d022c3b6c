use std::sync::Arc;

use terrabound_matchmaker::{SessionSpawner, SpawnError};
use terrabound_protocol::{SessionId, SkillBand};
use terrabound_session::{MovementLogic, MovementParams, SessionManager};
use tokio::sync::Mutex;

/// Spawns movement sessions in this process.
#[derive(Clone)]
pub struct LocalSessionSpawner {
    sessions: Arc<Mutex<SessionManager<MovementLogic>>>,
}

impl LocalSessionSpawner {
    pub fn new(sessions: Arc<Mutex<SessionManager<MovementLogic>>>) -> Self {
        Self { sessions }
    }
}

impl SessionSpawner for LocalSessionSpawner {
    async fn spawn(&self, band: SkillBand) -> Result<SessionId, SpawnError> {
        Ok(self
            .sessions
            .lock()
            .await
            .create_session(MovementParams::from(band)))
    }

    async fn discard(&self, session_id: &SessionId) {
        self.sessions.lock().await.discard(session_id).await;
    }
}

#[cfg(test)]
mod tests {
    use terrabound_session::SessionConfig;

    use super::*;

    #[tokio::test]
    async fn test_spawn_and_discard_track_manager() {
        let sessions = Arc::new(Mutex::new(SessionManager::new(SessionConfig::default())));
        let spawner = LocalSessionSpawner::new(Arc::clone(&sessions));

        let id = spawner.spawn(SkillBand::around(1000, 200)).await.unwrap();
        assert_eq!(sessions.lock().await.session_ids(), vec![id.clone()]);

        spawner.discard(&id).await;
        assert_eq!(sessions.lock().await.session_count(), 0);
    }
}
