// Library crate for the impostor word-game session core
// This file exposes the public API for integration tests

pub mod client;
pub mod room;
pub mod session;
pub mod shared;
pub mod store;
pub mod words;

// Re-export commonly used types for easier access in tests
pub use client::{DeviceIdentity, RoomAttachment, RoomObserver, SessionClient};
pub use room::{Outcome, Participant, Phase, Room};
pub use session::{SessionConfig, SessionService};
pub use shared::AppError;
pub use store::{MemoryRoomStore, RoomStore, RoomWatch};
pub use words::WordBank;
