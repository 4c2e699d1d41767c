use std::path::Path;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::VoiceResult;

use super::format::ContainerFormat;

/// A finished recording
///
/// Immutable once produced. Deliberately not `Clone`: the pronunciation
/// bridge takes the clip by value, so a recording can be uploaded at most
/// once and the bytes are never silently duplicated.
#[derive(Debug)]
pub struct AudioClip {
    /// Stable identity for logging and correlation
    pub id: Uuid,
    /// Complete container file bytes
    pub bytes: Vec<u8>,
    /// Negotiated MIME type of `bytes`
    pub mime: String,
    /// Container format family
    pub format: ContainerFormat,
    /// Measured recording length
    pub duration: Duration,
    /// When the recording started
    pub recorded_at: DateTime<Utc>,
}

impl AudioClip {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name used when the clip is uploaded or saved.
    pub fn upload_file_name(&self) -> String {
        format!("recording.{}", self.format.extension())
    }

    /// Encode as a `data:` URL for direct embedding in a UI.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Write the container bytes to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> VoiceResult<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}
