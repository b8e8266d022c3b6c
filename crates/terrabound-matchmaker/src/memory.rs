//! In-memory adapters for the registry and the account store.
//!
//! Used by the demo server and by tests. The registry keeps records as
//! JSON text, the way a document store would, so decode failures and
//! version checks behave like they would against a real backend.

use std::collections::{BTreeMap, HashMap};

use terrabound_protocol::{PlayerId, SessionId};
use tokio::sync::{Mutex, RwLock};

use crate::account::parse_skill_rating;
use crate::{
    AccountError, AccountStore, RegistryEntry, RegistryError, SessionRegistry, Version, Versioned,
};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct StoredRecord {
    value: String,
    version: u64,
}

#[derive(Default)]
struct RegistryInner {
    records: BTreeMap<String, StoredRecord>,
    next_version: u64,
}

impl RegistryInner {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

fn version_token(version: u64) -> Version {
    Version(format!("{version:016x}"))
}

fn decode(key: &str, record: &StoredRecord) -> Result<Versioned<RegistryEntry>, RegistryError> {
    let value = serde_json::from_str(&record.value).map_err(|source| RegistryError::Decode {
        key: key.to_owned(),
        source,
    })?;
    Ok(Versioned {
        value,
        version: version_token(record.version),
    })
}

/// A [`SessionRegistry`] held in process memory.
///
/// Every operation takes the lock for its own duration only, so a read
/// followed by a conditional write can interleave with other callers
/// exactly like it would against a remote store.
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: Mutex<RegistryInner>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text under `key`, bypassing encoding. Returns its
    /// version.
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) -> Version {
        let mut inner = self.inner.lock().await;
        let version = inner.bump();
        inner.records.insert(
            key.into(),
            StoredRecord {
                value: value.into(),
                version,
            },
        );
        version_token(version)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionRegistry for InMemoryRegistry {
    async fn list(&self, limit: usize) -> Result<Vec<Versioned<RegistryEntry>>, RegistryError> {
        let inner = self.inner.lock().await;
        let mut entries = Vec::new();
        for (key, record) in inner.records.iter().take(limit) {
            match decode(key, record) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(%key, error = %e, "skipping undecodable registry record"),
            }
        }
        Ok(entries)
    }

    async fn read(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Versioned<RegistryEntry>>, RegistryError> {
        let inner = self.inner.lock().await;
        inner
            .records
            .get(session_id.as_str())
            .map(|record| decode(session_id.as_str(), record))
            .transpose()
    }

    async fn write(
        &self,
        entry: &RegistryEntry,
        expected: Option<&Version>,
    ) -> Result<Version, RegistryError> {
        let value = serde_json::to_string(entry).map_err(RegistryError::Encode)?;
        let key = entry.session_id.as_str();

        let mut inner = self.inner.lock().await;
        if let Some(expected) = expected {
            let current = inner.records.get(key).map(|r| version_token(r.version));
            if current.as_ref() != Some(expected) {
                return Err(RegistryError::VersionConflict {
                    key: key.to_owned(),
                });
            }
        }

        let version = inner.bump();
        inner
            .records
            .insert(key.to_owned(), StoredRecord { value, version });
        Ok(version_token(version))
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// An [`AccountStore`] over per-player metadata JSON.
#[derive(Default)]
pub struct InMemoryAccountStore {
    metadata: RwLock<HashMap<PlayerId, String>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a player's metadata document.
    pub async fn set_metadata(&self, player_id: PlayerId, metadata: impl Into<String>) {
        self.metadata.write().await.insert(player_id, metadata.into());
    }
}

impl AccountStore for InMemoryAccountStore {
    async fn skill_rating(&self, player_id: &PlayerId) -> Result<Option<i32>, AccountError> {
        let metadata = self.metadata.read().await;
        let doc = metadata
            .get(player_id)
            .ok_or_else(|| AccountError::NotFound(player_id.clone()))?;
        Ok(parse_skill_rating(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, players: i32) -> RegistryEntry {
        RegistryEntry {
            session_id: SessionId::from(id),
            min_skill: 800,
            max_skill: 1200,
            current_players: players,
            max_players: 8,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_fresh_read_version_is_accepted() {
        let registry = InMemoryRegistry::new();
        registry.write(&entry("a", 1), None).await.unwrap();

        let read = registry.read(&SessionId::from("a")).await.unwrap().unwrap();
        let mut updated = read.value.clone();
        updated.current_players = 2;

        let v2 = registry.write(&updated, Some(&read.version)).await.unwrap();
        assert_ne!(v2, read.version);
        let again = registry.read(&SessionId::from("a")).await.unwrap().unwrap();
        assert_eq!(again.value.current_players, 2);
        assert_eq!(again.version, v2);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let registry = InMemoryRegistry::new();
        let v1 = registry.write(&entry("a", 1), None).await.unwrap();
        registry.write(&entry("a", 2), Some(&v1)).await.unwrap();

        let err = registry.write(&entry("a", 3), Some(&v1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::VersionConflict { ref key } if key == "a"));

        let stored = registry.read(&SessionId::from("a")).await.unwrap().unwrap();
        assert_eq!(stored.value.current_players, 2);
    }

    #[tokio::test]
    async fn test_versioned_write_to_missing_key_conflicts() {
        let registry = InMemoryRegistry::new();
        let err = registry
            .write(&entry("ghost", 1), Some(&Version("0000000000000001".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionConflict { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_skips_undecodable_records() {
        let registry = InMemoryRegistry::new();
        registry.write(&entry("a", 1), None).await.unwrap();
        registry.insert_raw("b", "{ broken").await;
        registry.write(&entry("c", 2), None).await.unwrap();

        let listed = registry.list(128).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|v| v.value.session_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let registry = InMemoryRegistry::new();
        for i in 0..5 {
            registry.write(&entry(&format!("s{i}"), 1), None).await.unwrap();
        }
        assert_eq!(registry.list(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_read_of_malformed_record_is_decode_error() {
        let registry = InMemoryRegistry::new();
        registry.insert_raw("bad", "[]").await;
        let err = registry.read(&SessionId::from("bad")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_account_store_distinguishes_absent_and_missing() {
        let store = InMemoryAccountStore::new();
        store.set_metadata(PlayerId::from("rated"), r#"{"elo": 1300}"#).await;
        store.set_metadata(PlayerId::from("unrated"), "{}").await;

        assert_eq!(store.skill_rating(&PlayerId::from("rated")).await.unwrap(), Some(1300));
        assert_eq!(store.skill_rating(&PlayerId::from("unrated")).await.unwrap(), None);
        assert!(matches!(
            store.skill_rating(&PlayerId::from("nobody")).await,
            Err(AccountError::NotFound(_))
        ));
    }
}
