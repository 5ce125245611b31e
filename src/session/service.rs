use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, info, instrument};

use super::transitions;
use crate::room::{code::generate_code, Participant, Phase, Room};
use crate::shared::{AppError, MIN_PARTICIPANTS};
use crate::store::RoomStore;
use crate::words::WordBank;

/// Session tunables. Turn length is 30 seconds in real games; tests and the
/// demo shorten it.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub turn_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { turn_seconds: 30 }
    }
}

/// How many fresh codes to try before declaring the store unusable.
const CODE_ATTEMPTS: usize = 32;

/// The mutation entry points for a room.
///
/// Every action is one transactional update against the shared document:
/// read the latest value, decide purely from it whether the effect is still
/// needed, write only if so. Random draws and clock reads happen here, before
/// the update, because the closure may be re-applied on a write conflict.
pub struct SessionService {
    store: Arc<dyn RoomStore>,
    words: WordBank,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(store: Arc<dyn RoomStore>, words: WordBank) -> Self {
        Self::with_config(store, words, SessionConfig::default())
    }

    pub fn with_config(store: Arc<dyn RoomStore>, words: WordBank, config: SessionConfig) -> Self {
        Self {
            store,
            words,
            config,
        }
    }

    fn deadline_from_now(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.config.turn_seconds as i64 * 1000
    }

    async fn fetch(&self, code: &str) -> Result<Room, AppError> {
        self.store
            .get(code)
            .await?
            .ok_or_else(|| AppError::NotFound(code.to_string()))
    }

    /// Creates a room in LOBBY with the caller as its permanent leader.
    #[instrument(skip(self))]
    pub async fn create_room(
        &self,
        display_name: &str,
        participant_id: &str,
    ) -> Result<String, AppError> {
        let leader = Participant::new(participant_id, display_name, true);
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_code(&mut rand::rng());
            let room = Room::new(&code, leader.clone());
            if self.store.create(&room).await? {
                info!(room_code = %code, participant_id = %participant_id, "Room created");
                return Ok(code);
            }
            debug!(room_code = %code, "Room code collision, regenerating");
        }
        Err(AppError::TransportError(
            "could not allocate an unused room code".to_string(),
        ))
    }

    /// Joins a lobby, or silently reconnects a known member of a running
    /// game. A duplicate concurrent join for the same id lands exactly once.
    #[instrument(skip(self))]
    pub async fn join_room(
        &self,
        code: &str,
        display_name: &str,
        participant_id: &str,
    ) -> Result<Room, AppError> {
        let snapshot = self.fetch(code).await?;
        if snapshot.phase != Phase::Lobby {
            if snapshot.is_member(participant_id) {
                debug!(room_code = %code, participant_id = %participant_id, "Known member reconnected mid-game");
                return Ok(snapshot);
            }
            return Err(AppError::GameInProgress(code.to_string()));
        }

        let participant = Participant::new(participant_id, display_name, false);
        let committed = self
            .store
            .update(
                code,
                Box::new(move |room| transitions::join_lobby(room, &participant)),
            )
            .await?;

        if !committed.is_member(participant_id) {
            // The lobby closed between our read and the commit.
            return Err(AppError::GameInProgress(code.to_string()));
        }
        info!(
            room_code = %code,
            participant_id = %participant_id,
            participant_count = committed.participants.len(),
            "Participant joined"
        );
        Ok(committed)
    }

    /// Assigns roles and moves the lobby into REVEAL.
    ///
    /// The impostor is drawn uniformly, avoiding the previous game's impostor
    /// (retained on the document across a replay) while another candidate
    /// exists. Keyed on the lobby phase, so a stale double-start is absorbed.
    #[instrument(skip(self))]
    pub async fn start_game(&self, code: &str, rounds_total: u32) -> Result<Room, AppError> {
        let snapshot = self.fetch(code).await?;
        if snapshot.phase != Phase::Lobby {
            return Err(AppError::InvalidState(format!(
                "cannot start a game from {}",
                snapshot.phase
            )));
        }
        if snapshot.participants.len() < MIN_PARTICIPANTS {
            return Err(AppError::InsufficientPlayers(snapshot.participants.len()));
        }

        // Drawn before the update and outside the closure: the closure must
        // stay pure, and the thread-local rng must not live across an await.
        let (impostor_id, assignment) = {
            let mut rng = rand::rng();
            (
                pick_impostor(&snapshot.participants, &snapshot.impostor_id, &mut rng),
                self.words.assign(&mut rng),
            )
        };
        let (category, secret_word) = assignment
            .ok_or_else(|| AppError::InvalidState("the word bank has no categories".to_string()))?;

        let committed = self
            .store
            .update(
                code,
                Box::new(move |room| {
                    transitions::start_assignment(
                        room,
                        rounds_total,
                        &impostor_id,
                        &category,
                        &secret_word,
                    )
                }),
            )
            .await?;

        info!(
            room_code = %code,
            rounds_total = committed.rounds_total,
            category = %committed.category,
            "Game started"
        );
        Ok(committed)
    }

    /// Flags a participant ready. The transaction that completes the set also
    /// flips the room into TURNS and seats a random start participant, so the
    /// last ready-up and the phase change are atomic.
    #[instrument(skip(self))]
    pub async fn mark_ready(&self, code: &str, participant_id: &str) -> Result<Room, AppError> {
        let snapshot = self.fetch(code).await?;
        if snapshot.phase != Phase::Reveal {
            return Err(AppError::InvalidState(format!(
                "cannot ready up from {}",
                snapshot.phase
            )));
        }
        if !snapshot.is_member(participant_id) {
            return Err(AppError::InvalidState(format!(
                "{participant_id} is not a member of room {code}"
            )));
        }

        let start_index = rand::rng().random_range(0..snapshot.participants.len());
        let deadline = self.deadline_from_now();
        let pid = participant_id.to_string();
        let committed = self
            .store
            .update(
                code,
                Box::new(move |room| transitions::ready_up(room, &pid, start_index, deadline)),
            )
            .await?;

        if committed.phase == Phase::Turns {
            info!(
                room_code = %code,
                first_speaker = %committed.current_turn_participant_id,
                "All ready, describing begins"
            );
        }
        Ok(committed)
    }

    /// Advances to the next speaker, or into VOTING after the final turn.
    ///
    /// Safe to call redundantly: timer expiry is fired independently by the
    /// active participant's client and by the leader's as a fallback, and the
    /// `expected_turns_taken` guard absorbs every fire but the first.
    #[instrument(skip(self))]
    pub async fn next_turn(
        &self,
        code: &str,
        expected_turns_taken: u32,
    ) -> Result<Room, AppError> {
        let snapshot = self.fetch(code).await?;
        if snapshot.phase != Phase::Turns {
            if snapshot.turns_taken > expected_turns_taken {
                // The raced final advance already moved the room on.
                debug!(room_code = %code, "Late turn fire absorbed");
                return Ok(snapshot);
            }
            return Err(AppError::InvalidState(format!(
                "no turn to advance from {}",
                snapshot.phase
            )));
        }
        if snapshot.turn_index().is_none() {
            return Err(AppError::InvalidState(
                "current speaker is not a member of the room".to_string(),
            ));
        }

        let deadline = self.deadline_from_now();
        let committed = self
            .store
            .update(
                code,
                Box::new(move |room| {
                    transitions::advance_turn(room, expected_turns_taken, deadline)
                }),
            )
            .await?;

        if committed.phase == Phase::Voting {
            info!(room_code = %code, "Describing finished, voting begins");
        } else if committed.turns_taken == expected_turns_taken + 1 {
            debug!(
                room_code = %code,
                turns_taken = committed.turns_taken,
                speaker = %committed.current_turn_participant_id,
                "Turn advanced"
            );
        } else {
            debug!(room_code = %code, "Duplicate turn fire absorbed");
        }
        Ok(committed)
    }

    /// Records a first-and-final vote. The transaction that completes the set
    /// tallies against the just-written snapshot and publishes the outcome.
    #[instrument(skip(self))]
    pub async fn cast_vote(
        &self,
        code: &str,
        participant_id: &str,
        target_id: &str,
    ) -> Result<Room, AppError> {
        let snapshot = self.fetch(code).await?;
        if snapshot.phase != Phase::Voting {
            return Err(AppError::InvalidState(format!(
                "cannot vote from {}",
                snapshot.phase
            )));
        }
        if !snapshot.is_member(participant_id) || !snapshot.is_member(target_id) {
            return Err(AppError::InvalidState(
                "votes must be cast by and for room members".to_string(),
            ));
        }

        let pid = participant_id.to_string();
        let target = target_id.to_string();
        let committed = self
            .store
            .update(
                code,
                Box::new(move |room| transitions::record_vote(room, &pid, &target)),
            )
            .await?;

        if let Some(outcome) = committed.outcome {
            info!(room_code = %code, outcome = %outcome, "All votes in");
        }
        Ok(committed)
    }

    /// Returns a finished room to the lobby for a rematch, keeping membership
    /// and scores. Leader-only by convention; the facade enforces that.
    #[instrument(skip(self))]
    pub async fn play_again(&self, code: &str) -> Result<Room, AppError> {
        let snapshot = self.fetch(code).await?;
        if snapshot.phase != Phase::Results {
            return Err(AppError::InvalidState(format!(
                "cannot reset a room from {}",
                snapshot.phase
            )));
        }

        let committed = self
            .store
            .update(code, Box::new(transitions::reset_for_replay))
            .await?;
        info!(room_code = %code, "Room reset for a rematch");
        Ok(committed)
    }
}

/// Uniform draw over participants, skipping the previous impostor while more
/// than one candidate remains.
fn pick_impostor(
    participants: &[Participant],
    previous_impostor_id: &str,
    rng: &mut impl Rng,
) -> String {
    let eligible: Vec<&Participant> = participants
        .iter()
        .filter(|p| p.id != previous_impostor_id)
        .collect();
    let chosen = if eligible.is_empty() {
        participants.choose(rng)
    } else {
        eligible.choose(rng).copied()
    };
    chosen.map(|p| p.id.clone()).unwrap_or_default()
}
