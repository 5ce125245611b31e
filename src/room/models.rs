use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::shared::MAX_NAME_LEN;

/// Stage of the game protocol a room is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Lobby,
    Reveal,
    Turns,
    Voting,
    Results,
}

/// Who won the game once all votes are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Crew,
    Impostor,
}

/// One player's persistent identity and per-game state within a room.
///
/// The id is an opaque token stable per device, so a reconnecting client maps
/// back onto the same entry instead of joining twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub is_leader: bool,
    pub is_ready: bool,
    pub vote_target: Option<String>,
    pub score: i32,
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: &str, is_leader: bool) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.chars().take(MAX_NAME_LEN).collect(),
            is_leader,
            is_ready: false,
            vote_target: None,
            score: 0,
        }
    }
}

/// The authoritative shared document for one game room.
///
/// Participant order is fixed at game start and doubles as the turn order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub code: String,
    pub phase: Phase,
    pub participants: Vec<Participant>,
    pub rounds_total: u32,
    pub current_round: u32,
    pub turns_taken: u32,
    pub category: String,
    pub secret_word: String,
    /// Empty until roles are assigned at game start.
    pub impostor_id: String,
    /// Empty outside the describing stage.
    pub current_turn_participant_id: String,
    /// Epoch milliseconds; 0 while no turn timer is running.
    pub turn_deadline: i64,
    pub outcome: Option<Outcome>,
}

impl Room {
    /// Fresh lobby containing only its creator, who stays leader for the
    /// room's whole lifetime.
    pub fn new(code: impl Into<String>, leader: Participant) -> Self {
        Self {
            code: code.into(),
            phase: Phase::Lobby,
            participants: vec![leader],
            rounds_total: 1,
            current_round: 1,
            turns_taken: 0,
            category: String::new(),
            secret_word: String::new(),
            impostor_id: String::new(),
            current_turn_participant_id: String::new(),
            turn_deadline: 0,
            outcome: None,
        }
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.participant(id).is_some()
    }

    pub fn leader(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_leader)
    }

    pub fn all_ready(&self) -> bool {
        self.participants.iter().all(|p| p.is_ready)
    }

    /// True once every participant has cast a non-empty vote.
    pub fn all_voted(&self) -> bool {
        self.participants
            .iter()
            .all(|p| matches!(&p.vote_target, Some(t) if !t.is_empty()))
    }

    /// Total number of turns in a game: one per participant per round.
    pub fn max_turns(&self) -> u32 {
        self.participants.len() as u32 * self.rounds_total
    }

    /// Seat index of the current speaker, when it resolves to a member.
    pub fn turn_index(&self) -> Option<usize> {
        if self.current_turn_participant_id.is_empty() {
            return None;
        }
        self.participants
            .iter()
            .position(|p| p.id == self.current_turn_participant_id)
    }
}
