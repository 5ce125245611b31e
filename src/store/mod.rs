// Public API - what other modules can use
pub use memory::MemoryRoomStore;

mod memory;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::room::Room;
use crate::shared::AppError;

/// A pure document transformation applied through [`RoomStore::update`].
///
/// The store may invoke it more than once when the commit races another
/// writer, so it must be side-effect free: no clock reads, no randomness.
pub type UpdateFn = Box<dyn Fn(Room) -> Room + Send + Sync>;

/// Contract required of whatever storage technology hosts room documents.
///
/// Single-document atomic compare-and-update is the only synchronization
/// primitive the session core relies on: no locks, no multi-document
/// transactions.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Stores a new document. Returns `false` without writing when the code
    /// is already taken, so callers can regenerate and retry.
    async fn create(&self, room: &Room) -> Result<bool, AppError>;

    async fn get(&self, code: &str) -> Result<Option<Room>, AppError>;

    /// Unconditional overwrite.
    async fn set(&self, code: &str, room: &Room) -> Result<(), AppError>;

    /// Atomic read-modify-write: applies `apply` to the latest document and
    /// commits only if nothing changed since the read, retrying the whole
    /// cycle otherwise. Returns the committed document.
    async fn update(&self, code: &str, apply: UpdateFn) -> Result<Room, AppError>;

    /// Live subscription delivering the current document immediately and the
    /// latest value after every subsequent commit.
    async fn subscribe(&self, code: &str) -> Result<RoomWatch, AppError>;
}

/// Handle to a live room subscription.
///
/// Delivery is latest-value-wins: a slow reader always observes the newest
/// snapshot but may skip intermediate commits.
pub struct RoomWatch {
    receiver: watch::Receiver<Room>,
}

impl RoomWatch {
    pub(crate) fn new(receiver: watch::Receiver<Room>) -> Self {
        Self { receiver }
    }

    /// The most recently committed snapshot.
    pub fn current(&self) -> Room {
        self.receiver.borrow().clone()
    }

    /// Waits for the next commit and returns it. Errors when the backing
    /// store has gone away.
    pub async fn changed(&mut self) -> Result<Room, AppError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| AppError::TransportError("room subscription closed".to_string()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}
