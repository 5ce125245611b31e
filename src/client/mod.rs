// Public API - what other modules can use
pub use identity::DeviceIdentity;

mod identity;

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::room::{Phase, Room};
use crate::session::SessionService;
use crate::shared::AppError;
use crate::store::{RoomStore, RoomWatch};

/// Callbacks a client surface implements to observe its room.
pub trait RoomObserver: Send + Sync {
    /// Latest committed snapshot, delivered once on attach and then after
    /// every observed commit.
    fn room_changed(&self, room: &Room);

    /// Transport-level disruption or a vanished room. Application errors
    /// never arrive here. After a [`AppError::NotFound`] the local room
    /// association is gone and the surface should return to its entry screen.
    fn room_error(&self, error: &AppError);
}

/// Thin per-participant process: holds one subscription to a room document,
/// relays snapshots to the observer and issues actions through the session
/// service. No game decision lives here beyond the timer duty below.
pub struct SessionClient {
    service: Arc<SessionService>,
    store: Arc<dyn RoomStore>,
    identity: DeviceIdentity,
}

impl SessionClient {
    pub fn new(
        service: Arc<SessionService>,
        store: Arc<dyn RoomStore>,
        identity: DeviceIdentity,
    ) -> Self {
        Self {
            service,
            store,
            identity,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn participant_id(&self) -> &str {
        &self.identity.participant_id
    }

    /// Creates a room and remembers it as this device's active one.
    pub async fn create_room(&mut self, display_name: &str) -> Result<String, AppError> {
        let code = self
            .service
            .create_room(display_name, &self.identity.participant_id)
            .await?;
        self.identity.display_name = display_name.to_string();
        self.identity.last_room_code = Some(code.clone());
        Ok(code)
    }

    /// Joins a room, normalizing the hand-typed code to uppercase.
    pub async fn join_room(&mut self, code: &str, display_name: &str) -> Result<String, AppError> {
        let code = code.trim().to_uppercase();
        self.service
            .join_room(&code, display_name, &self.identity.participant_id)
            .await?;
        self.identity.display_name = display_name.to_string();
        self.identity.last_room_code = Some(code.clone());
        Ok(code)
    }

    pub async fn start_game(&self, code: &str, rounds_total: u32) -> Result<(), AppError> {
        self.service.start_game(code, rounds_total).await.map(drop)
    }

    pub async fn mark_ready(&self, code: &str) -> Result<(), AppError> {
        self.service
            .mark_ready(code, &self.identity.participant_id)
            .await
            .map(drop)
    }

    /// The active participant pressing "done": advance from the turn count
    /// this client currently sees.
    pub async fn finish_turn(&self, code: &str) -> Result<(), AppError> {
        let room = self
            .store
            .get(code)
            .await?
            .ok_or_else(|| AppError::NotFound(code.to_string()))?;
        self.service.next_turn(code, room.turns_taken).await.map(drop)
    }

    pub async fn cast_vote(&self, code: &str, target_id: &str) -> Result<(), AppError> {
        self.service
            .cast_vote(code, &self.identity.participant_id, target_id)
            .await
            .map(drop)
    }

    /// Rematch, offered to the leader only. The state machine itself does not
    /// enforce this; the convention lives here.
    pub async fn play_again(&self, code: &str) -> Result<(), AppError> {
        let room = self
            .store
            .get(code)
            .await?
            .ok_or_else(|| AppError::NotFound(code.to_string()))?;
        if room.leader().map(|l| l.id.as_str()) != Some(self.participant_id()) {
            return Err(AppError::InvalidState(
                "only the leader can start a rematch".to_string(),
            ));
        }
        self.service.play_again(code).await.map(drop)
    }

    /// Attaches to a room: subscribes, relays snapshots to `observer` and
    /// runs the turn-deadline watcher until the attachment is dropped.
    pub async fn attach(
        &mut self,
        code: &str,
        observer: Arc<dyn RoomObserver>,
    ) -> Result<RoomAttachment, AppError> {
        let watch = self.store.subscribe(code).await?;
        self.identity.last_room_code = Some(code.to_string());
        let task = tokio::spawn(run_room_task(
            watch,
            Arc::clone(&self.service),
            code.to_string(),
            self.identity.participant_id.clone(),
            observer,
        ));
        Ok(RoomAttachment {
            code: code.to_string(),
            task,
        })
    }
}

/// A live attachment to one room. Dropping it aborts the watcher task.
pub struct RoomAttachment {
    code: String,
    task: JoinHandle<()>,
}

impl RoomAttachment {
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Leaving is a local action only: the subscription is dropped and the
    /// shared document is never mutated by a departure.
    pub fn leave(self) {}
}

impl Drop for RoomAttachment {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Relays snapshots to the observer and fires the turn-timeout advance when
/// this client is on duty: the active participant's client is the primary,
/// the leader's the fallback for a speaker who disconnected. Duplicate fires
/// collapse in the `turns_taken` guard on the service side.
async fn run_room_task(
    mut watch: RoomWatch,
    service: Arc<SessionService>,
    code: String,
    participant_id: String,
    observer: Arc<dyn RoomObserver>,
) {
    let mut room = watch.current();
    observer.room_changed(&room);

    loop {
        let next = match deadline_wait(&room, &participant_id) {
            Some(wait) => {
                tokio::select! {
                    changed = watch.changed() => changed,
                    _ = sleep(wait) => {
                        let expected = room.turns_taken;
                        debug!(room_code = %code, expected_turns_taken = expected, "Turn deadline expired, firing advance");
                        if let Err(err) = service.next_turn(&code, expected).await {
                            match err {
                                AppError::NotFound(_) => {
                                    observer.room_error(&err);
                                    return;
                                }
                                err => warn!(room_code = %code, error = %err, "Timeout advance rejected"),
                            }
                        }
                        // Our fire (or whoever won the race) committed; pick
                        // up the resulting snapshot before arming again.
                        watch.changed().await
                    }
                }
            }
            None => watch.changed().await,
        };

        match next {
            Ok(snapshot) => {
                room = snapshot;
                observer.room_changed(&room);
            }
            Err(err) => {
                observer.room_error(&err);
                return;
            }
        }
    }
}

/// How long until this client must fire the timeout advance, or None when it
/// has no timer duty in the given snapshot.
fn deadline_wait(room: &Room, participant_id: &str) -> Option<Duration> {
    if room.phase != Phase::Turns || room.turn_deadline == 0 {
        return None;
    }
    let on_duty = room.current_turn_participant_id == participant_id
        || room.leader().is_some_and(|l| l.id == participant_id);
    if !on_duty {
        return None;
    }
    let remaining = room.turn_deadline - Utc::now().timestamp_millis();
    Some(Duration::from_millis(remaining.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::room::Participant;
    use crate::session::SessionConfig;
    use crate::store::MemoryRoomStore;
    use crate::words::WordBank;

    struct ChannelObserver {
        tx: mpsc::UnboundedSender<Room>,
    }

    impl RoomObserver for ChannelObserver {
        fn room_changed(&self, room: &Room) {
            let _ = self.tx.send(room.clone());
        }
        fn room_error(&self, _error: &AppError) {}
    }

    fn turns_snapshot(deadline: i64) -> Room {
        let mut room = Room::new("QWZX", Participant::new("leader", "alice", true));
        room.participants.push(Participant::new("b", "bob", false));
        room.participants.push(Participant::new("c", "cara", false));
        room.phase = Phase::Turns;
        room.current_turn_participant_id = "b".to_string();
        room.turn_deadline = deadline;
        room
    }

    #[test]
    fn timer_duty_falls_on_speaker_and_leader_only() {
        let room = turns_snapshot(Utc::now().timestamp_millis() + 5_000);

        assert!(deadline_wait(&room, "b").is_some());
        assert!(deadline_wait(&room, "leader").is_some());
        assert!(deadline_wait(&room, "c").is_none());
    }

    #[test]
    fn no_duty_outside_turns_or_without_a_deadline() {
        let mut room = turns_snapshot(0);
        assert!(deadline_wait(&room, "b").is_none());

        room.turn_deadline = Utc::now().timestamp_millis() + 5_000;
        room.phase = Phase::Voting;
        assert!(deadline_wait(&room, "b").is_none());
    }

    #[test]
    fn expired_deadline_fires_immediately() {
        let room = turns_snapshot(Utc::now().timestamp_millis() - 1_000);
        assert_eq!(deadline_wait(&room, "b"), Some(Duration::from_millis(0)));
    }

    /// With a zero-length turn the leader's watcher alone must walk the whole
    /// describing stage, turn by turn, into VOTING.
    #[tokio::test(flavor = "multi_thread")]
    async fn leader_watcher_drives_expired_turns_to_voting() {
        let store = Arc::new(MemoryRoomStore::new());
        let service = Arc::new(SessionService::with_config(
            store.clone(),
            WordBank::default(),
            SessionConfig { turn_seconds: 0 },
        ));

        let mut leader = SessionClient::new(
            service.clone(),
            store.clone(),
            DeviceIdentity {
                participant_id: "u-alice".to_string(),
                display_name: String::new(),
                last_room_code: None,
            },
        );
        let code = leader.create_room("alice").await.unwrap();
        service.join_room(&code, "bob", "u-bob").await.unwrap();
        service.join_room(&code, "cara", "u-cara").await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let attachment = leader
            .attach(&code, Arc::new(ChannelObserver { tx }))
            .await
            .unwrap();

        leader.start_game(&code, 1).await.unwrap();
        for id in ["u-alice", "u-bob", "u-cara"] {
            service.mark_ready(&code, id).await.unwrap();
        }

        let reached_voting = timeout(Duration::from_secs(5), async {
            while let Some(room) = rx.recv().await {
                if room.phase == Phase::Voting {
                    return room;
                }
            }
            panic!("observer channel closed before voting");
        })
        .await
        .expect("watcher never reached voting");

        assert_eq!(reached_voting.turns_taken, 3);
        attachment.leave();
    }
}
