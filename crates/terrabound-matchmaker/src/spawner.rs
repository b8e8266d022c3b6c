use std::future::Future;

use terrabound_protocol::{SessionId, SkillBand};

use crate::SpawnError;

/// Starts session runtimes on behalf of the allocator.
pub trait SessionSpawner: Send + Sync {
    /// Starts a runtime for `band` and returns its id.
    fn spawn(&self, band: SkillBand) -> impl Future<Output = Result<SessionId, SpawnError>> + Send;

    /// Stops a runtime that was spawned but never handed out.
    fn discard(&self, session_id: &SessionId) -> impl Future<Output = ()> + Send;
}
