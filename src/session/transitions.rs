//! Pure decision logic for the room session state machine.
//!
//! Every function here is a total `Room -> Room` transformation meant to run
//! inside [`crate::store::RoomStore::update`]. The store may re-run a closure
//! when a commit races another writer, so nothing in this module reads the
//! clock or draws randomness; callers pass both in as plain values.

use std::collections::HashMap;

use crate::room::{Outcome, Participant, Phase, Room};

/// Appends `participant` to a lobby unless an entry with the same id is
/// already present. The membership check is what turns a raced duplicate
/// join into a no-op instead of a double entry.
pub fn join_lobby(mut room: Room, participant: &Participant) -> Room {
    if room.phase != Phase::Lobby || room.is_member(&participant.id) {
        return room;
    }
    room.participants.push(participant.clone());
    room
}

/// Applies the game-start assignment. Keyed on the lobby phase, so a stale
/// double-start re-runs against the already-started document and changes
/// nothing.
pub fn start_assignment(
    mut room: Room,
    rounds_total: u32,
    impostor_id: &str,
    category: &str,
    secret_word: &str,
) -> Room {
    if room.phase != Phase::Lobby {
        return room;
    }
    for p in &mut room.participants {
        p.is_ready = false;
        p.vote_target = None;
    }
    room.phase = Phase::Reveal;
    room.rounds_total = rounds_total.max(1);
    room.current_round = 1;
    room.turns_taken = 0;
    room.category = category.to_string();
    room.secret_word = secret_word.to_string();
    room.impostor_id = impostor_id.to_string();
    room.outcome = None;
    room
}

/// Marks `participant_id` ready. When that write completes the set, the same
/// transformation flips the room into TURNS, seats the start participant
/// (`start_index` reduced modulo the participant count) and stamps the first
/// turn deadline, so no reader can observe an all-ready REVEAL room.
pub fn ready_up(mut room: Room, participant_id: &str, start_index: usize, deadline: i64) -> Room {
    if room.phase != Phase::Reveal {
        return room;
    }
    match room.participant_mut(participant_id) {
        Some(p) => p.is_ready = true,
        None => return room,
    }
    if room.all_ready() {
        let seat = start_index % room.participants.len();
        room.current_turn_participant_id = room.participants[seat].id.clone();
        room.phase = Phase::Turns;
        room.turn_deadline = deadline;
    }
    room
}

/// Advances to the next speaker, or into VOTING after the final turn.
///
/// The `expected_turns_taken` guard collapses duplicate fires (the active
/// client and the leader fallback may both trigger on the same tick) into a
/// single effective advance.
pub fn advance_turn(mut room: Room, expected_turns_taken: u32, deadline: i64) -> Room {
    if room.phase != Phase::Turns {
        return room;
    }
    if room.turns_taken > expected_turns_taken {
        // Another caller already advanced this turn.
        return room;
    }

    let new_turns_taken = room.turns_taken + 1;
    if new_turns_taken >= room.max_turns() {
        room.phase = Phase::Voting;
        room.turn_deadline = 0;
        room.turns_taken = new_turns_taken;
        return room;
    }

    let Some(seat) = room.turn_index() else {
        // Unresolvable speaker; leave the document untouched.
        return room;
    };
    let next = (seat + 1) % room.participants.len();
    room.current_turn_participant_id = room.participants[next].id.clone();
    room.current_round = new_turns_taken / room.participants.len() as u32 + 1;
    room.turns_taken = new_turns_taken;
    room.turn_deadline = deadline;
    room
}

/// Records a vote (the first vote is final) and, when the set completes,
/// tallies inside the same transformation so the count always includes the
/// vote just written.
pub fn record_vote(mut room: Room, participant_id: &str, target_id: &str) -> Room {
    if room.phase != Phase::Voting || !room.is_member(target_id) {
        return room;
    }
    match room.participant_mut(participant_id) {
        Some(p) if p.vote_target.is_none() => p.vote_target = Some(target_id.to_string()),
        _ => return room,
    }

    if room.all_voted() {
        let (top, tie) = tally(&room);
        let caught = !tie && top == room.impostor_id;
        room.outcome = Some(if caught { Outcome::Crew } else { Outcome::Impostor });
        room.phase = Phase::Results;
    }
    room
}

/// Returns the plurality target and whether two or more targets shared the
/// maximum count. A tie means the crew failed to agree, which the outcome
/// rule resolves in the impostor's favor.
fn tally(room: &Room) -> (String, bool) {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for p in &room.participants {
        if let Some(target) = &p.vote_target {
            *counts.entry(target.as_str()).or_insert(0) += 1;
        }
    }
    let max = counts.values().copied().max().unwrap_or(0);
    let mut at_max = counts.iter().filter(|(_, count)| **count == max);
    let top = at_max
        .next()
        .map(|(target, _)| target.to_string())
        .unwrap_or_default();
    (top, at_max.next().is_some())
}

/// Resets a finished room back to the lobby for a rematch. Membership,
/// scores and the code survive; `impostor_id` is kept until the next start
/// overwrites it, so the next draw can avoid an immediate repeat.
pub fn reset_for_replay(mut room: Room) -> Room {
    if room.phase != Phase::Results {
        return room;
    }
    for p in &mut room.participants {
        p.is_ready = false;
        p.vote_target = None;
    }
    room.phase = Phase::Lobby;
    room.outcome = None;
    room.category.clear();
    room.secret_word.clear();
    room.turns_taken = 0;
    room.current_round = 1;
    room.current_turn_participant_id.clear();
    room.turn_deadline = 0;
    room
}
