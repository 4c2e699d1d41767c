use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::audio::{AudioProvider, MicrophoneConstraints};
use crate::error::{PermissionDenial, VoiceError, VoiceResult};

/// Microphone permission gate
///
/// Opens the microphone once and releases it immediately, classifying any
/// failure. A denial is remembered so recording can fail fast with the
/// same classification instead of prompting on every attempt; only an
/// explicit `request()` (or a later successful stream open) clears it.
pub struct PermissionGate {
    provider: Arc<dyn AudioProvider>,
    last_denial: Mutex<Option<PermissionDenial>>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn AudioProvider>) -> Self {
        Self {
            provider,
            last_denial: Mutex::new(None),
        }
    }

    /// Prompt for microphone access: acquire a stream, then release it.
    pub async fn request(&self, constraints: &MicrophoneConstraints) -> VoiceResult<()> {
        match self.provider.open_microphone(constraints).await {
            Ok(mut stream) => {
                stream.close().await?;
                self.clear();
                info!("Microphone permission granted");
                Ok(())
            }
            Err(VoiceError::Permission(denial)) => {
                warn!("Microphone permission failure: {}", denial);
                self.remember(denial.clone());
                Err(VoiceError::Permission(denial))
            }
            Err(other) => Err(other),
        }
    }

    /// The remembered classification from the last failed prompt, if any.
    pub fn cached_denial(&self) -> Option<PermissionDenial> {
        self.last_denial.lock().unwrap().clone()
    }

    /// Record a denial observed outside `request()` (e.g. during a
    /// recording start).
    pub fn remember(&self, denial: PermissionDenial) {
        *self.last_denial.lock().unwrap() = Some(denial);
    }

    /// Forget any remembered denial.
    pub fn clear(&self) {
        *self.last_denial.lock().unwrap() = None;
    }
}
