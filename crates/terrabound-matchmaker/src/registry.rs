//! The shared registry of open sessions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terrabound_protocol::{SessionAssignment, SessionId, SkillBand};

use crate::RegistryError;

/// One registry record: a session's skill band and occupancy.
///
/// Stored as JSON under the session id:
/// `{matchId, minElo, maxElo, currentPlayers, maxPlayers, createdAt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    #[serde(rename = "matchId")]
    pub session_id: SessionId,
    #[serde(rename = "minElo")]
    pub min_skill: i32,
    #[serde(rename = "maxElo")]
    pub max_skill: i32,
    pub current_players: i32,
    pub max_players: i32,
    /// Unix seconds.
    pub created_at: i64,
}

impl RegistryEntry {
    pub fn band(&self) -> SkillBand {
        SkillBand {
            min: self.min_skill,
            max: self.max_skill,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players
    }

    pub fn to_assignment(&self, server_time: i64) -> SessionAssignment {
        SessionAssignment {
            session_id: self.session_id.clone(),
            min_skill: self.min_skill,
            max_skill: self.max_skill,
            current_players: self.current_players,
            max_players: self.max_players,
            server_time,
        }
    }
}

/// Opaque version token of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(pub String);

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

/// Versioned key/value storage for [`RegistryEntry`] records.
///
/// Writes with a version are compare-and-swap: they succeed only if the
/// stored record still carries that version, and fail with
/// [`RegistryError::VersionConflict`] otherwise. Writes without one are
/// unconditional.
pub trait SessionRegistry: Send + Sync {
    /// Returns up to `limit` records. Records that don't decode are
    /// skipped.
    fn list(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Versioned<RegistryEntry>>, RegistryError>> + Send;

    fn read(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Versioned<RegistryEntry>>, RegistryError>> + Send;

    /// Stores `entry` under its session id and returns the new version.
    fn write(
        &self,
        entry: &RegistryEntry,
        expected: Option<&Version>,
    ) -> impl Future<Output = Result<Version, RegistryError>> + Send;
}

impl<T: SessionRegistry> SessionRegistry for Arc<T> {
    fn list(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Versioned<RegistryEntry>>, RegistryError>> + Send {
        (**self).list(limit)
    }

    fn read(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Versioned<RegistryEntry>>, RegistryError>> + Send {
        (**self).read(session_id)
    }

    fn write(
        &self,
        entry: &RegistryEntry,
        expected: Option<&Version>,
    ) -> impl Future<Output = Result<Version, RegistryError>> + Send {
        (**self).write(entry, expected)
    }
}
