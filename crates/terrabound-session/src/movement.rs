//! Position replication: the game mode every Terrabound session runs.
//!
//! Clients send their absolute position; once per tick the session
//! applies the latest positions and broadcasts every player's snapshot.

use std::time::Duration;

use terrabound_protocol::{Codec, JsonCodec, OpCode, PlayerId, SkillBand};

use crate::logic::{Broadcast, ClientInput, Initialized, SessionLogic};
use crate::state::{PositionUpdate, SessionState};

/// Label of every movement session.
pub const MOVEMENT_LABEL: &str = "movement_match";

/// Movement sessions tick at 10 Hz.
pub const MOVEMENT_TICK_RATE: u32 = 10;

/// Skill band the session was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementParams {
    pub skill_band: SkillBand,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            skill_band: SkillBand::around(1000, 200),
        }
    }
}

impl From<SkillBand> for MovementParams {
    fn from(skill_band: SkillBand) -> Self {
        Self { skill_band }
    }
}

/// [`SessionLogic`] for position replication.
pub struct MovementLogic;

impl SessionLogic for MovementLogic {
    type Params = MovementParams;
    type State = SessionState;

    fn init(params: &MovementParams) -> Initialized<SessionState> {
        tracing::debug!(
            min_skill = params.skill_band.min,
            max_skill = params.skill_band.max,
            "movement session initialized"
        );
        Initialized {
            state: SessionState::new(),
            tick_rate: MOVEMENT_TICK_RATE,
            label: MOVEMENT_LABEL.to_owned(),
        }
    }

    fn join(state: &mut SessionState, players: &[PlayerId]) {
        for player in players {
            state.add_player(player);
        }
    }

    fn leave(state: &mut SessionState, players: &[PlayerId]) {
        for player in players {
            state.remove_player(player);
        }
    }

    fn tick(state: &mut SessionState, tick: u64, inputs: Vec<ClientInput>) -> Vec<Broadcast> {
        let codec = JsonCodec;

        for input in inputs {
            let update: PositionUpdate = match codec.decode(&input.data) {
                Ok(update) => update,
                Err(e) => {
                    tracing::warn!(
                        tick,
                        player_id = %input.sender,
                        op_code = %input.op_code,
                        error = %e,
                        "dropping malformed position update"
                    );
                    continue;
                }
            };
            if !state.apply_position(&input.sender, update) {
                tracing::trace!(tick, player_id = %input.sender, "update from absent player ignored");
            }
        }

        match codec.encode(state) {
            Ok(data) => vec![Broadcast::reliable(OpCode::STATE_SNAPSHOT, data)],
            Err(e) => {
                tracing::error!(tick, error = %e, "failed to encode session state, skipping broadcast");
                Vec::new()
            }
        }
    }

    fn signal(_state: &mut SessionState, data: &str) -> String {
        tracing::debug!(data, "signal received");
        String::new()
    }

    fn terminate(state: &mut SessionState, grace: Duration) {
        tracing::info!(
            players = state.len(),
            grace_secs = grace.as_secs(),
            "movement session terminating"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use proptest::prelude::*;

    use super::*;

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn input(sender: &str, json: &str) -> ClientInput {
        ClientInput {
            sender: pid(sender),
            op_code: OpCode(2),
            data: json.as_bytes().to_vec(),
        }
    }

    fn decode(broadcasts: &[Broadcast]) -> serde_json::Value {
        assert_eq!(broadcasts.len(), 1);
        serde_json::from_slice(&broadcasts[0].data).unwrap()
    }

    #[test]
    fn test_init_uses_movement_rate_and_label() {
        let init = MovementLogic::init(&MovementParams::default());
        assert_eq!(init.tick_rate, 10);
        assert_eq!(init.label, "movement_match");
        assert!(init.state.is_empty());
    }

    #[test]
    fn test_join_attempt_accepts_everyone() {
        let state = SessionState::new();
        let decision = MovementLogic::join_attempt(&state, &pid("a"), &HashMap::new());
        assert!(decision.accepted);
        assert!(decision.reason.is_none());
    }

    #[test]
    fn test_tick_applies_inputs_and_broadcasts_snapshot() {
        let mut state = SessionState::new();
        MovementLogic::join(&mut state, &[pid("a"), pid("b")]);

        let out = MovementLogic::tick(&mut state, 1, vec![input("a", r#"{"x":1.0,"y":2.0}"#)]);

        assert_eq!(out[0].op_code, OpCode::STATE_SNAPSHOT);
        let json = decode(&out);
        assert_eq!(json["a"]["x"], 1.0);
        assert_eq!(json["a"]["y"], 2.0);
        assert_eq!(json["b"]["x"], 0.0);
    }

    #[test]
    fn test_tick_broadcasts_even_without_inputs() {
        let mut state = SessionState::new();
        MovementLogic::join(&mut state, &[pid("a")]);
        let out = MovementLogic::tick(&mut state, 7, Vec::new());
        assert_eq!(decode(&out)["a"]["playerId"], "a");
    }

    #[test]
    fn test_malformed_input_does_not_block_others() {
        let mut state = SessionState::new();
        MovementLogic::join(&mut state, &[pid("a"), pid("b")]);

        let out = MovementLogic::tick(
            &mut state,
            1,
            vec![input("a", "not json"), input("b", r#"{"x":5.0,"y":6.0}"#)],
        );

        let json = decode(&out);
        assert_eq!(json["a"]["x"], 0.0);
        assert_eq!(json["b"]["x"], 5.0);
    }

    #[test]
    fn test_last_update_in_a_tick_wins() {
        let mut state = SessionState::new();
        MovementLogic::join(&mut state, &[pid("a")]);

        MovementLogic::tick(
            &mut state,
            1,
            vec![input("a", r#"{"x":1.0,"y":1.0}"#), input("a", r#"{"x":9.0,"y":8.0}"#)],
        );

        let snap = state.get(&pid("a")).unwrap();
        assert_eq!((snap.position_x, snap.position_y), (9.0, 8.0));
    }

    #[test]
    fn test_input_from_absent_player_is_ignored() {
        let mut state = SessionState::new();
        MovementLogic::join(&mut state, &[pid("a")]);

        MovementLogic::tick(&mut state, 1, vec![input("ghost", r#"{"x":1.0,"y":1.0}"#)]);

        assert!(!state.contains(&pid("ghost")));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_rejoin_keeps_position() {
        let mut state = SessionState::new();
        MovementLogic::join(&mut state, &[pid("a")]);
        MovementLogic::tick(&mut state, 1, vec![input("a", r#"{"x":3.0,"y":3.0}"#)]);

        MovementLogic::join(&mut state, &[pid("a")]);

        assert_eq!(state.get(&pid("a")).unwrap().position_x, 3.0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(u8),
        Leave(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(0u8..6).prop_map(Op::Join), (0u8..6).prop_map(Op::Leave)]
    }

    proptest! {
        #[test]
        fn prop_membership_matches_join_leave_history(ops in prop::collection::vec(op(), 0..64)) {
            let mut state = SessionState::new();
            let mut model: HashSet<u8> = HashSet::new();

            for op in ops {
                match op {
                    Op::Join(n) => {
                        MovementLogic::join(&mut state, &[pid(&format!("p{n}"))]);
                        model.insert(n);
                    }
                    Op::Leave(n) => {
                        MovementLogic::leave(&mut state, &[pid(&format!("p{n}"))]);
                        model.remove(&n);
                    }
                }
            }

            let present: HashSet<PlayerId> = state.player_ids().cloned().collect();
            let expected: HashSet<PlayerId> = model.iter().map(|n| pid(&format!("p{n}"))).collect();
            prop_assert_eq!(present, expected);
        }
    }
}
