use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-device identity resumed across app restarts: a stable opaque
/// participant id plus the last-used display name and room code.
///
/// Only used to pick up a local session again; the session core never reads
/// this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub participant_id: String,
    pub display_name: String,
    pub last_room_code: Option<String>,
}

impl DeviceIdentity {
    pub fn generate() -> Self {
        Self {
            participant_id: Uuid::new_v4().to_string(),
            display_name: String::new(),
            last_room_code: None,
        }
    }

    /// Loads the identity stored at `path`, generating (and trying to save) a
    /// fresh one when the file is missing or unreadable.
    pub fn load_or_generate(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Self>(&raw) {
                Ok(identity) => {
                    debug!(participant_id = %identity.participant_id, "Loaded device identity");
                    identity
                }
                Err(err) => {
                    warn!(error = %err, "Stored identity unreadable, generating a new one");
                    Self::generate_and_save(path)
                }
            },
            Err(_) => Self::generate_and_save(path),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
    }

    fn generate_and_save(path: &Path) -> Self {
        let identity = Self::generate();
        if let Err(err) = identity.save(path) {
            warn!(error = %err, "Could not persist device identity");
        }
        identity
    }
}
