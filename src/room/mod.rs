// Public API - what other modules can use
pub use models::{Outcome, Participant, Phase, Room};

pub mod code;
pub mod models;
