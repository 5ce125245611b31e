//! Shared setup for integration tests
#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;

use impostor::{
    MemoryRoomStore, Phase, Room, RoomStore, SessionConfig, SessionService, WordBank,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: Arc<MemoryRoomStore>,
    pub service: Arc<SessionService>,
    pub code: String,
    /// Participant ids in join order; the first one is the leader.
    pub ids: Vec<String>,
}

pub struct TestSetupBuilder {
    names: Vec<&'static str>,
    turn_seconds: u64,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            names: vec![],
            turn_seconds: 30,
        }
    }

    pub fn with_players(mut self, names: Vec<&'static str>) -> Self {
        self.names = names;
        self
    }

    pub fn with_three_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "cara"])
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "cara", "dave"])
    }

    pub fn with_turn_seconds(mut self, turn_seconds: u64) -> Self {
        self.turn_seconds = turn_seconds;
        self
    }

    pub async fn build(self) -> TestSetup {
        let store = Arc::new(MemoryRoomStore::new());
        let service = Arc::new(SessionService::with_config(
            store.clone() as Arc<dyn RoomStore>,
            WordBank::default(),
            SessionConfig {
                turn_seconds: self.turn_seconds,
            },
        ));

        let ids: Vec<String> = self.names.iter().map(|n| format!("uid-{n}")).collect();
        let code = service
            .create_room(self.names[0], &ids[0])
            .await
            .expect("create room");
        for (name, id) in self.names.iter().zip(&ids).skip(1) {
            service.join_room(&code, name, id).await.expect("join room");
        }

        TestSetup {
            store,
            service,
            code,
            ids,
        }
    }
}

// ============================================================================
// Convenience Action Methods
// ============================================================================

impl TestSetup {
    pub async fn room(&self) -> Room {
        self.store
            .get(&self.code)
            .await
            .unwrap()
            .expect("room exists")
    }

    pub async fn start(&self, rounds_total: u32) -> Room {
        self.service
            .start_game(&self.code, rounds_total)
            .await
            .expect("start game")
    }

    pub async fn ready_all(&self) -> Room {
        let mut last = self.room().await;
        for id in &self.ids {
            last = self
                .service
                .mark_ready(&self.code, id)
                .await
                .expect("mark ready");
        }
        last
    }

    /// Advances every remaining turn until the room flips into VOTING.
    pub async fn run_turns_to_voting(&self) -> Room {
        let mut room = self.room().await;
        while room.phase == Phase::Turns {
            room = self
                .service
                .next_turn(&self.code, room.turns_taken)
                .await
                .expect("advance turn");
        }
        room
    }

    /// Casts `(voter, target)` pairs in order and returns the final snapshot.
    pub async fn cast_votes(&self, votes: &[(&str, &str)]) -> Room {
        let mut last = self.room().await;
        for (voter, target) in votes {
            last = self
                .service
                .cast_vote(&self.code, voter, target)
                .await
                .expect("cast vote");
        }
        last
    }
}
