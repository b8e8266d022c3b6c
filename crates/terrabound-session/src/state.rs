//! The authoritative per-player snapshot a session runtime owns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use terrabound_protocol::PlayerId;

/// Last known state of one player.
///
/// Wire shape: `{"playerId": "...", "x": 1.5, "y": -2.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    #[serde(rename = "x")]
    pub position_x: f32,
    #[serde(rename = "y")]
    pub position_y: f32,
}

impl PlayerSnapshot {
    /// A snapshot at the origin.
    pub fn at_origin(player_id: PlayerId) -> Self {
        Self {
            player_id,
            position_x: 0.0,
            position_y: 0.0,
        }
    }
}

/// Client input: an absolute position. No sequence number; the last
/// update received before a tick wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub x: f32,
    pub y: f32,
}

/// Every player currently in the session, keyed by id.
///
/// Serializes transparently as the `playerId → snapshot` object that
/// goes out in each broadcast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    players: HashMap<PlayerId, PlayerSnapshot>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player at the origin. A player already present keeps
    /// their snapshot; returns `false` in that case.
    pub fn add_player(&mut self, player_id: &PlayerId) -> bool {
        if self.players.contains_key(player_id) {
            return false;
        }
        self.players.insert(
            player_id.clone(),
            PlayerSnapshot::at_origin(player_id.clone()),
        );
        true
    }

    /// Removes a player. Removing someone who isn't there is a no-op.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> Option<PlayerSnapshot> {
        self.players.remove(player_id)
    }

    /// Overwrites a present player's position. Updates for players who
    /// aren't in the session are dropped; returns whether it applied.
    pub fn apply_position(&mut self, player_id: &PlayerId, update: PositionUpdate) -> bool {
        match self.players.get_mut(player_id) {
            Some(snapshot) => {
                snapshot.position_x = update.x;
                snapshot.position_y = update.y;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&PlayerSnapshot> {
        self.players.get(player_id)
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterates over the ids of every present player.
    pub fn player_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    #[test]
    fn test_add_player_starts_at_origin() {
        let mut state = SessionState::new();
        assert!(state.add_player(&pid("alice")));

        let snap = state.get(&pid("alice")).unwrap();
        assert_eq!(snap.position_x, 0.0);
        assert_eq!(snap.position_y, 0.0);
        assert_eq!(snap.player_id, pid("alice"));
    }

    #[test]
    fn test_add_player_twice_keeps_existing_position() {
        let mut state = SessionState::new();
        state.add_player(&pid("alice"));
        state.apply_position(&pid("alice"), PositionUpdate { x: 4.0, y: 2.0 });

        assert!(!state.add_player(&pid("alice")));
        assert_eq!(state.get(&pid("alice")).unwrap().position_x, 4.0);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_remove_absent_player_is_noop() {
        let mut state = SessionState::new();
        state.add_player(&pid("alice"));
        assert!(state.remove_player(&pid("bob")).is_none());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_apply_position_for_absent_player_is_dropped() {
        let mut state = SessionState::new();
        assert!(!state.apply_position(&pid("ghost"), PositionUpdate { x: 1.0, y: 1.0 }));
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_serializes_as_player_map() {
        let mut state = SessionState::new();
        state.add_player(&pid("alice"));
        state.apply_position(&pid("alice"), PositionUpdate { x: 1.5, y: -2.0 });

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "alice": { "playerId": "alice", "x": 1.5, "y": -2.0 }
            })
        );
    }

    #[test]
    fn test_state_json_round_trip() {
        let mut state = SessionState::new();
        state.add_player(&pid("a"));
        state.add_player(&pid("b"));
        state.apply_position(&pid("b"), PositionUpdate { x: 3.25, y: 0.5 });

        let bytes = serde_json::to_vec(&state).unwrap();
        let back: SessionState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_position_update_parses_plain_object() {
        let update: PositionUpdate = serde_json::from_str(r#"{"x": 10.0, "y": 20.5}"#).unwrap();
        assert_eq!(update, PositionUpdate { x: 10.0, y: 20.5 });
    }
}
