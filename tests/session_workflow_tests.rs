//! End-to-end scenarios through the public API, with every mutation flowing
//! through the shared document store the way independent clients would issue
//! them.

mod utils;

use std::sync::Arc;

use impostor::{AppError, Outcome, Phase, RoomStore};
use utils::TestSetupBuilder;

#[tokio::test]
async fn three_players_one_round_take_exactly_three_turns() {
    let setup = TestSetupBuilder::new().with_three_players().build().await;
    setup.start(1).await;
    let room = setup.ready_all().await;

    assert_eq!(room.phase, Phase::Turns);
    assert_eq!(room.turns_taken, 0);
    assert!(room.turn_deadline > 0);

    let room = setup.service.next_turn(&setup.code, 0).await.unwrap();
    assert_eq!((room.phase, room.turns_taken), (Phase::Turns, 1));

    let room = setup.service.next_turn(&setup.code, 1).await.unwrap();
    assert_eq!((room.phase, room.turns_taken), (Phase::Turns, 2));
    let last_speaker = room.current_turn_participant_id.clone();

    // The third advance closes describing without moving the speaker on.
    let room = setup.service.next_turn(&setup.code, 2).await.unwrap();
    assert_eq!((room.phase, room.turns_taken), (Phase::Voting, 3));
    assert_eq!(room.current_turn_participant_id, last_speaker);
    assert_eq!(room.turn_deadline, 0);
}

#[tokio::test]
async fn crew_catches_the_impostor_and_replays() {
    let setup = TestSetupBuilder::new().with_three_players().build().await;
    setup.start(1).await;
    setup.ready_all().await;
    let room = setup.run_turns_to_voting().await;

    let impostor = room.impostor_id.clone();
    let crew: Vec<String> = setup
        .ids
        .iter()
        .filter(|id| **id != impostor)
        .cloned()
        .collect();

    let room = setup
        .cast_votes(&[
            (&crew[0], &impostor),
            (&crew[1], &impostor),
            (&impostor, &crew[0]),
        ])
        .await;

    assert_eq!(room.phase, Phase::Results);
    assert_eq!(room.outcome, Some(Outcome::Crew));

    let room = setup.service.play_again(&setup.code).await.unwrap();
    assert_eq!(room.phase, Phase::Lobby);
    assert_eq!(room.participants.len(), 3);
    assert_eq!(room.code, setup.code);
    assert!(room.outcome.is_none());
    assert!(room.secret_word.is_empty());
    assert!(room.category.is_empty());
    assert_eq!(room.turns_taken, 0);

    // The next game never hands the same player the impostor role again
    // while others are available.
    let room = setup.start(1).await;
    assert_ne!(room.impostor_id, impostor);
}

#[tokio::test]
async fn an_all_round_tie_lets_the_impostor_walk() {
    let setup = TestSetupBuilder::new().with_four_players().build().await;
    setup.start(1).await;
    setup.ready_all().await;
    setup.run_turns_to_voting().await;

    let ids = &setup.ids;
    let room = setup
        .cast_votes(&[
            (&ids[0], &ids[2]),
            (&ids[1], &ids[3]),
            (&ids[2], &ids[0]),
            (&ids[3], &ids[1]),
        ])
        .await;

    assert_eq!(room.phase, Phase::Results);
    assert_eq!(room.outcome, Some(Outcome::Impostor));
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_joins_from_a_flaky_client_land_once() {
    let setup = TestSetupBuilder::new().with_three_players().build().await;

    let handles = (0..6)
        .map(|_| {
            let service = Arc::clone(&setup.service);
            let code = setup.code.clone();
            tokio::spawn(async move { service.join_room(&code, "dave", "uid-dave").await })
        })
        .collect::<Vec<_>>();
    for handle in futures::future::join_all(handles).await {
        handle.unwrap().unwrap();
    }

    let room = setup.room().await;
    assert_eq!(room.participants.len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn speaker_and_leader_firing_the_same_timeout_advance_once() {
    let setup = TestSetupBuilder::new().with_three_players().build().await;
    setup.start(2).await;
    setup.ready_all().await;

    // Both duty holders see the deadline pass on the same tick.
    let fires = (0..2).map(|_| {
        let service = Arc::clone(&setup.service);
        let code = setup.code.clone();
        tokio::spawn(async move { service.next_turn(&code, 0).await })
    });
    for handle in futures::future::join_all(fires).await {
        handle.unwrap().unwrap();
    }

    let room = setup.room().await;
    assert_eq!(room.turns_taken, 1);
    assert_eq!(room.phase, Phase::Turns);
}

#[tokio::test]
async fn subscription_carries_a_remote_writers_commit() {
    let setup = TestSetupBuilder::new().with_three_players().build().await;
    let mut watch = setup.store.subscribe(&setup.code).await.unwrap();
    assert_eq!(watch.current().participants.len(), 3);

    let service = Arc::clone(&setup.service);
    let code = setup.code.clone();
    tokio::spawn(async move { service.join_room(&code, "dave", "uid-dave").await });

    let mut room = watch.current();
    while room.participants.len() < 4 {
        room = watch.changed().await.unwrap();
    }
    assert!(room.is_member("uid-dave"));
}

#[tokio::test]
async fn a_stranger_cannot_join_mid_game_but_a_member_can_return() {
    let setup = TestSetupBuilder::new().with_three_players().build().await;
    setup.start(1).await;

    let rejected = setup
        .service
        .join_room(&setup.code, "eve", "uid-eve")
        .await;
    assert_eq!(rejected, Err(AppError::GameInProgress(setup.code.clone())));

    let rejoined = setup
        .service
        .join_room(&setup.code, "bob", "uid-bob")
        .await
        .unwrap();
    assert_eq!(rejoined.participants.len(), 3);

    let room = setup.room().await;
    assert!(!room.is_member("uid-eve"));
}

#[tokio::test]
async fn turns_taken_is_monotonic_and_bounded_across_a_game() {
    let setup = TestSetupBuilder::new().with_four_players().build().await;
    setup.start(2).await;
    setup.ready_all().await;

    let mut seen = 0;
    let mut room = setup.room().await;
    while room.phase == Phase::Turns {
        room = setup
            .service
            .next_turn(&setup.code, room.turns_taken)
            .await
            .unwrap();
        assert!(room.turns_taken >= seen);
        assert!(room.turns_taken <= room.max_turns());
        seen = room.turns_taken;
    }
    assert_eq!(room.turns_taken, 8);
}
