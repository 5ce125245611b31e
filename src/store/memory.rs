use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::{RoomStore, RoomWatch, UpdateFn};
use crate::room::Room;
use crate::shared::AppError;

/// In-process implementation of the store contract, backing tests and the
/// demo binary. A production deployment would put a replicated document
/// database behind the same trait.
pub struct MemoryRoomStore {
    rooms: Mutex<HashMap<String, Room>>,
    /// Per-room snapshot channels, created on first interest.
    channels: Mutex<HashMap<String, watch::Sender<Room>>>,
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Pushes a committed snapshot to subscribers of `code`.
    fn notify(&self, code: &str, room: &Room) {
        let mut channels = self.channels.lock().unwrap();
        let sender = channels
            .entry(code.to_string())
            .or_insert_with(|| watch::channel(room.clone()).0);
        sender.send_replace(room.clone());
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    #[instrument(skip(self, room))]
    async fn create(&self, room: &Room) -> Result<bool, AppError> {
        {
            let mut rooms = self.rooms.lock().unwrap();
            if rooms.contains_key(&room.code) {
                debug!(room_code = %room.code, "Room code already taken");
                return Ok(false);
            }
            rooms.insert(room.code.clone(), room.clone());
        }
        self.notify(&room.code, room);
        debug!(room_code = %room.code, "Room document created");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn get(&self, code: &str) -> Result<Option<Room>, AppError> {
        Ok(self.rooms.lock().unwrap().get(code).cloned())
    }

    #[instrument(skip(self, room))]
    async fn set(&self, code: &str, room: &Room) -> Result<(), AppError> {
        self.rooms
            .lock()
            .unwrap()
            .insert(code.to_string(), room.clone());
        self.notify(code, room);
        Ok(())
    }

    #[instrument(skip(self, apply))]
    async fn update(&self, code: &str, apply: UpdateFn) -> Result<Room, AppError> {
        loop {
            let snapshot = self
                .rooms
                .lock()
                .unwrap()
                .get(code)
                .cloned()
                .ok_or_else(|| AppError::NotFound(code.to_string()))?;

            // Apply outside the lock; commit only if the document is still
            // the one we read, otherwise re-run against the newer value.
            let next = apply(snapshot.clone());

            let committed = {
                let mut rooms = self.rooms.lock().unwrap();
                match rooms.get(code) {
                    Some(current) if *current == snapshot => {
                        rooms.insert(code.to_string(), next.clone());
                        true
                    }
                    Some(_) => false,
                    None => return Err(AppError::NotFound(code.to_string())),
                }
            };

            if committed {
                self.notify(code, &next);
                return Ok(next);
            }
            debug!(room_code = %code, "Write conflict, retrying update");
        }
    }

    #[instrument(skip(self))]
    async fn subscribe(&self, code: &str) -> Result<RoomWatch, AppError> {
        let room = self
            .rooms
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::NotFound(code.to_string()))?;

        let mut channels = self.channels.lock().unwrap();
        let sender = channels
            .entry(code.to_string())
            .or_insert_with(|| watch::channel(room).0);
        Ok(RoomWatch::new(sender.subscribe()))
    }
}
