use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use impostor::{
    AppError, DeviceIdentity, MemoryRoomStore, Phase, Room, RoomObserver, RoomStore,
    SessionClient, SessionConfig, SessionService, WordBank,
};

/// Logs every snapshot a client observes, standing in for a real surface.
struct LogObserver {
    name: &'static str,
}

impl RoomObserver for LogObserver {
    fn room_changed(&self, room: &Room) {
        info!(
            client = self.name,
            phase = %room.phase,
            turns_taken = room.turns_taken,
            "Snapshot"
        );
    }

    fn room_error(&self, error: &AppError) {
        info!(client = self.name, error = %error, "Subscription error");
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "impostor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting impostor demo game");

    let store: Arc<dyn RoomStore> = Arc::new(MemoryRoomStore::new());
    // One-second turns so the scripted game finishes quickly.
    let service = Arc::new(SessionService::with_config(
        Arc::clone(&store),
        WordBank::default(),
        SessionConfig { turn_seconds: 1 },
    ));

    // Three scripted participants on one machine, each with its own identity.
    let mut alice = SessionClient::new(service.clone(), store.clone(), DeviceIdentity::generate());
    let mut bob = SessionClient::new(service.clone(), store.clone(), DeviceIdentity::generate());
    let mut cara = SessionClient::new(service.clone(), store.clone(), DeviceIdentity::generate());

    let code = alice.create_room("Alice").await?;
    bob.join_room(&code, "Bob").await?;
    cara.join_room(&code, "Cara").await?;
    info!(room_code = %code, "Lobby assembled");

    let _attachments = vec![
        alice
            .attach(&code, Arc::new(LogObserver { name: "alice" }))
            .await?,
        bob.attach(&code, Arc::new(LogObserver { name: "bob" }))
            .await?,
        cara.attach(&code, Arc::new(LogObserver { name: "cara" }))
            .await?,
    ];

    alice.start_game(&code, 1).await?;
    futures::future::try_join_all([
        alice.mark_ready(&code),
        bob.mark_ready(&code),
        cara.mark_ready(&code),
    ])
    .await?;

    // The attached watchers fire each expired turn; wait for voting to open.
    let mut watch = store.subscribe(&code).await?;
    let mut room = watch.current();
    while room.phase != Phase::Voting {
        room = watch.changed().await?;
    }
    info!(room_code = %code, "Voting is open");

    let impostor_id = room.impostor_id.clone();
    let vote_for = |client: &SessionClient| {
        if client.participant_id() == impostor_id {
            room.participants
                .iter()
                .find(|p| p.id != impostor_id)
                .map(|p| p.id.clone())
                .unwrap_or_default()
        } else {
            impostor_id.clone()
        }
    };
    futures::future::try_join_all([
        alice.cast_vote(&code, &vote_for(&alice)),
        bob.cast_vote(&code, &vote_for(&bob)),
        cara.cast_vote(&code, &vote_for(&cara)),
    ])
    .await?;

    let finished = store
        .get(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(code.clone()))?;
    let impostor_name = finished
        .participant(&impostor_id)
        .map(|p| p.display_name.clone())
        .unwrap_or_default();
    info!(
        outcome = ?finished.outcome,
        impostor = %impostor_name,
        secret_word = %finished.secret_word,
        "Game over"
    );

    // The leader resets the room for a rematch.
    alice.play_again(&code).await?;
    let lobby = store
        .get(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(code.clone()))?;
    info!(phase = %lobby.phase, participants = lobby.participants.len(), "Back in the lobby");

    Ok(())
}
