use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{VoiceError, VoiceResult};

/// On-disk shape of the persisted credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredentials {
    token: Option<String>,
    last_login: Option<DateTime<Utc>>,
}

/// Persistent bearer token storage.
///
/// The token lives in a small JSON file so separate runs of the client stay
/// logged in. A file that fails to parse is treated as absent rather than
/// fatal; the user just logs in again.
pub struct TokenStore {
    path: PathBuf,
    state: Mutex<StoredCredentials>,
}

impl TokenStore {
    /// Open a store backed by `path`, loading any existing credentials.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Ignoring unreadable credentials file {:?}: {}", path, e);
                    StoredCredentials::default()
                }
            },
            Err(_) => StoredCredentials::default(),
        };
        debug!(
            "Token store at {:?} ({})",
            path,
            if state.token.is_some() {
                "token present"
            } else {
                "no token"
            }
        );
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// Open the store at the platform config directory.
    pub fn open_default() -> VoiceResult<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| VoiceError::Config("no config directory available".to_string()))?;
        Ok(Self::open(base.join("spitkorean").join("credentials.json")))
    }

    /// Current bearer token, if logged in.
    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    /// When the token was last stored.
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().last_login
    }

    /// Store a new token and stamp the login time.
    pub fn set_token(&self, token: impl Into<String>) -> VoiceResult<()> {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.token = Some(token.into());
            state.last_login = Some(Utc::now());
            state.clone()
        };
        self.persist(&snapshot)
    }

    /// Forget the stored token.
    pub fn clear(&self) -> VoiceResult<()> {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.token = None;
            state.clone()
        };
        self.persist(&snapshot)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &StoredCredentials) -> VoiceResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
