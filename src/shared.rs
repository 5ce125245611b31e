use thiserror::Error;

/// A room must hold at least this many participants before leaving the lobby.
pub const MIN_PARTICIPANTS: usize = 3;

/// Display names longer than this are truncated on entry.
pub const MAX_NAME_LEN: usize = 12;

/// Errors surfaced to callers of the session actions.
///
/// Locally recoverable conditions (duplicate join, duplicate vote, duplicate
/// timeout fire) never appear here: they are absorbed as no-ops inside the
/// transaction that would otherwise double-apply them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("room not found: {0}")]
    NotFound(String),

    #[error("game already in progress in room {0}")]
    GameInProgress(String),

    #[error("not enough players to start: {0}")]
    InsufficientPlayers(usize),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("transport error: {0}")]
    TransportError(String),
}
