use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::audio::AudioClip;

/// Point-in-time view of a recording session
#[derive(Debug, Clone, Serialize)]
pub struct RecordingStats {
    /// Whether capture is currently active
    pub is_recording: bool,

    /// Whether a stop is being finalized
    pub is_processing: bool,

    /// When the active recording started, if one is running
    pub started_at: Option<DateTime<Utc>>,

    /// Elapsed capture time in milliseconds (100 ms resolution)
    pub elapsed_ms: u64,

    /// Current input level, 0.0 (silence) to 1.0 (full scale)
    pub audio_level: f32,

    /// Encoded chunks buffered so far
    pub chunks_buffered: usize,

    /// Share of the maximum duration consumed, 0.0 to 1.0
    pub progress: f32,
}

/// Notifications delivered outside the start()/stop() call path
#[derive(Debug)]
pub enum RecordingEvent {
    /// Capture began with this negotiated MIME type
    Started { mime: String },

    /// The maximum duration was reached and the clip was finalized
    AutoStopped(AudioClip),

    /// Stop landed under the minimum duration; nothing was kept
    Discarded {
        recorded: Duration,
        minimum: Duration,
    },

    /// Finalization failed after capture ended
    Failed { message: String },
}

/// "m:ss" display for an elapsed time.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let total_secs = elapsed_ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
