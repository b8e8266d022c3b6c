//! Skill-banded session allocation.

use terrabound_protocol::{PlayerId, SessionAssignment, SkillBand};

use crate::{
    AccountStore, Clock, MatchmakerError, RegistryEntry, RegistryError, SessionRegistry,
    SessionSpawner, Versioned,
};

/// Tunables of the allocator.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Seats per session.
    pub max_players: i32,
    /// Half-width of the skill band of a new session.
    pub skill_range: i32,
    /// Registry records examined per scan.
    pub scan_limit: usize,
    /// Rating used when an account has none.
    pub default_skill: i32,
    /// Re-scans allowed after losing a version race.
    pub max_conflict_retries: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            skill_range: 200,
            scan_limit: 128,
            default_skill: 1000,
            max_conflict_retries: 3,
        }
    }
}

/// Where a resolved rating came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSource {
    /// The account's own rating.
    Account,
    /// The account has no usable rating.
    Default,
    /// The lookup failed; the default stands in.
    Fallback,
}

/// Picks the open entry whose band midpoint is closest to `rating`.
///
/// Full entries are never chosen. On an exact tie the entry scanned
/// first wins.
pub fn select_candidate(
    entries: &[Versioned<RegistryEntry>],
    rating: i32,
) -> Option<&Versioned<RegistryEntry>> {
    let mut best: Option<(&Versioned<RegistryEntry>, f64)> = None;
    for candidate in entries.iter().filter(|e| !e.value.is_full()) {
        let distance = candidate.value.band().distance_to(rating);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(entry, _)| entry)
}

/// Assigns players to sessions.
pub struct Allocator<R, A, S, C> {
    registry: R,
    accounts: A,
    spawner: S,
    clock: C,
    config: AllocatorConfig,
}

impl<R, A, S, C> Allocator<R, A, S, C>
where
    R: SessionRegistry,
    A: AccountStore,
    S: SessionSpawner,
    C: Clock,
{
    pub fn new(registry: R, accounts: A, spawner: S, clock: C, config: AllocatorConfig) -> Self {
        Self {
            registry,
            accounts,
            spawner,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Resolves the caller's rating, falling back to the configured
    /// default when the account has none or can't be read.
    pub async fn resolve_rating(&self, player_id: &PlayerId) -> (i32, RatingSource) {
        match self.accounts.skill_rating(player_id).await {
            Ok(Some(rating)) => (rating, RatingSource::Account),
            Ok(None) => (self.config.default_skill, RatingSource::Default),
            Err(e) => {
                tracing::warn!(%player_id, error = %e, "skill rating lookup failed, using default");
                (self.config.default_skill, RatingSource::Fallback)
            }
        }
    }

    /// Finds or creates a session for `caller` and claims a seat in it.
    ///
    /// # Errors
    /// - [`MatchmakerError::Unauthenticated`] without a caller identity.
    /// - [`MatchmakerError::Registry`] when the scan or a write fails.
    /// - [`MatchmakerError::SessionCreate`] when no runtime could be spawned.
    /// - [`MatchmakerError::Contention`] when every claim lost a version race.
    pub async fn request_session(
        &self,
        caller: Option<&PlayerId>,
    ) -> Result<SessionAssignment, MatchmakerError> {
        let player_id = match caller {
            Some(id) if !id.is_empty() => id,
            _ => return Err(MatchmakerError::Unauthenticated),
        };

        let (rating, source) = self.resolve_rating(player_id).await;
        tracing::debug!(%player_id, rating, ?source, "allocating session");

        let max_attempts = self.config.max_conflict_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let entries = self.registry.list(self.config.scan_limit).await?;

            let Some(candidate) = select_candidate(&entries, rating) else {
                return self.create_session(rating).await;
            };

            let mut claimed = candidate.value.clone();
            claimed.current_players = claimed
                .current_players
                .saturating_add(1)
                .min(claimed.max_players);

            match self.registry.write(&claimed, Some(&candidate.version)).await {
                Ok(_) => {
                    tracing::info!(
                        %player_id,
                        session_id = %claimed.session_id,
                        players = claimed.current_players,
                        "joined existing session"
                    );
                    return Ok(claimed.to_assignment(self.clock.now_unix()));
                }
                Err(RegistryError::VersionConflict { .. }) if attempt < max_attempts => {
                    tracing::debug!(
                        session_id = %claimed.session_id,
                        attempt,
                        "lost version race, rescanning"
                    );
                }
                Err(RegistryError::VersionConflict { .. }) => {
                    tracing::warn!(session_id = %claimed.session_id, attempt, "giving up on contended session");
                    return Err(MatchmakerError::Contention {
                        session_id: claimed.session_id,
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn create_session(&self, rating: i32) -> Result<SessionAssignment, MatchmakerError> {
        let band = SkillBand::around(rating, self.config.skill_range);
        let session_id = self
            .spawner
            .spawn(band)
            .await
            .map_err(|e| MatchmakerError::SessionCreate(e.to_string()))?;

        let now = self.clock.now_unix();
        let entry = RegistryEntry {
            session_id,
            min_skill: band.min,
            max_skill: band.max,
            current_players: 1,
            max_players: self.config.max_players,
            created_at: now,
        };

        if let Err(e) = self.registry.write(&entry, None).await {
            tracing::error!(session_id = %entry.session_id, error = %e, "failed to register new session");
            self.spawner.discard(&entry.session_id).await;
            return Err(e.into());
        }

        tracing::info!(
            session_id = %entry.session_id,
            min_skill = band.min,
            max_skill = band.max,
            "created session"
        );
        Ok(entry.to_assignment(now))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use terrabound_protocol::SessionId;

    use super::*;
    use crate::Version;

    fn entry(id: &str, min: i32, max: i32, players: i32) -> Versioned<RegistryEntry> {
        Versioned {
            value: RegistryEntry {
                session_id: SessionId::from(id),
                min_skill: min,
                max_skill: max,
                current_players: players,
                max_players: 8,
                created_at: 0,
            },
            version: Version(format!("v-{id}")),
        }
    }

    fn picked(entries: &[Versioned<RegistryEntry>], rating: i32) -> Option<&str> {
        select_candidate(entries, rating).map(|e| e.value.session_id.as_str())
    }

    #[test]
    fn test_picks_closest_midpoint() {
        // Midpoints 900 and 1300.
        let entries = vec![entry("high", 1100, 1500, 1), entry("low", 700, 1100, 1)];
        assert_eq!(picked(&entries, 1000), Some("low"));
    }

    #[test]
    fn test_skips_full_entries() {
        let entries = vec![entry("full", 800, 1200, 8), entry("far", 2000, 2400, 1)];
        assert_eq!(picked(&entries, 1000), Some("far"));
    }

    #[test]
    fn test_nothing_open_yields_none() {
        let entries = vec![entry("a", 800, 1200, 8), entry("b", 900, 1100, 9)];
        assert_eq!(picked(&entries, 1000), None);
        assert_eq!(picked(&[], 1000), None);
    }

    #[test]
    fn test_tie_keeps_first_scanned() {
        let entries = vec![entry("first", 900, 1100, 1), entry("second", 900, 1100, 1)];
        assert_eq!(picked(&entries, 1000), Some("first"));
    }

    #[test]
    fn test_extreme_bands_do_not_overflow() {
        let entries = vec![entry("wide", i32::MIN, i32::MAX, 0)];
        assert_eq!(picked(&entries, i32::MAX), Some("wide"));
    }

    #[test]
    fn test_default_config() {
        let c = AllocatorConfig::default();
        assert_eq!(c.max_players, 8);
        assert_eq!(c.skill_range, 200);
        assert_eq!(c.scan_limit, 128);
        assert_eq!(c.default_skill, 1000);
        assert_eq!(c.max_conflict_retries, 3);
    }

    fn arb_entry() -> impl Strategy<Value = (i32, i32, i32)> {
        (-5_000i32..5_000, 0i32..1_000, 0i32..10)
    }

    proptest! {
        #[test]
        fn prop_selection_is_open_and_nearest(
            specs in prop::collection::vec(arb_entry(), 0..24),
            rating in -6_000i32..6_000,
        ) {
            let entries: Vec<_> = specs
                .iter()
                .enumerate()
                .map(|(i, (min, width, players))| entry(&format!("s{i}"), *min, min + width, *players))
                .collect();

            match select_candidate(&entries, rating) {
                Some(chosen) => {
                    prop_assert!(!chosen.value.is_full());
                    let d = chosen.value.band().distance_to(rating);
                    for other in entries.iter().filter(|e| !e.value.is_full()) {
                        prop_assert!(d <= other.value.band().distance_to(rating));
                    }
                }
                None => prop_assert!(entries.iter().all(|e| e.value.is_full())),
            }
        }
    }
}
