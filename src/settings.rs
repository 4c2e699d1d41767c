use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::ContainerFormat;
use crate::error::{VoiceError, VoiceResult};

/// Requested voice gender for synthesized speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsGender {
    Female,
    Male,
}

impl TtsGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsGender::Female => "female",
            TtsGender::Male => "male",
        }
    }
}

/// Configuration for recording, playback, and analysis
///
/// Created with defaults at session start and mutated only through
/// `apply()` / `reset()`. Sessions snapshot the relevant fields when an
/// operation begins, so changing settings never affects work in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Capture channel count (1 = mono, 2 = stereo)
    pub channel_count: u16,

    /// Ask the runtime to cancel acoustic echo
    pub echo_cancellation: bool,

    /// Ask the runtime to suppress background noise
    pub noise_suppression: bool,

    /// Ask the runtime to normalize input gain
    pub auto_gain_control: bool,

    /// Voice gender for synthesized speech
    pub tts_voice_gender: TtsGender,

    /// Speech rate multiplier (0.5 to 2.0)
    pub tts_speed: f32,

    /// Pitch adjustment in semitones (-20.0 to 20.0)
    pub tts_pitch: f32,

    /// Preferred container format for finished recordings
    pub recording_format: ContainerFormat,

    /// Recordings auto-stop when they reach this duration
    pub max_recording_time: Duration,

    /// Recordings shorter than this are discarded on stop
    pub min_recording_time: Duration,

    /// Score at or above this counts as a pass (0 to 100)
    pub pronunciation_threshold: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channel_count: 1,                          // Mono
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            tts_voice_gender: TtsGender::Female,
            tts_speed: 1.0,
            tts_pitch: 0.0,
            recording_format: ContainerFormat::Webm,
            max_recording_time: Duration::from_secs(60),
            min_recording_time: Duration::from_secs(1), // Discard accidental taps
            pronunciation_threshold: 70.0,
        }
    }
}

impl VoiceSettings {
    /// Merge a partial update into these settings. Unset fields keep their
    /// current values.
    pub fn apply(&mut self, update: VoiceSettingsUpdate) {
        if let Some(sample_rate) = update.sample_rate {
            self.sample_rate = sample_rate;
        }
        if let Some(channel_count) = update.channel_count {
            self.channel_count = channel_count;
        }
        if let Some(echo_cancellation) = update.echo_cancellation {
            self.echo_cancellation = echo_cancellation;
        }
        if let Some(noise_suppression) = update.noise_suppression {
            self.noise_suppression = noise_suppression;
        }
        if let Some(auto_gain_control) = update.auto_gain_control {
            self.auto_gain_control = auto_gain_control;
        }
        if let Some(tts_voice_gender) = update.tts_voice_gender {
            self.tts_voice_gender = tts_voice_gender;
        }
        if let Some(tts_speed) = update.tts_speed {
            self.tts_speed = tts_speed;
        }
        if let Some(tts_pitch) = update.tts_pitch {
            self.tts_pitch = tts_pitch;
        }
        if let Some(recording_format) = update.recording_format {
            self.recording_format = recording_format;
        }
        if let Some(max_recording_time) = update.max_recording_time {
            self.max_recording_time = max_recording_time;
        }
        if let Some(min_recording_time) = update.min_recording_time {
            self.min_recording_time = min_recording_time;
        }
        if let Some(pronunciation_threshold) = update.pronunciation_threshold {
            self.pronunciation_threshold = pronunciation_threshold;
        }
    }

    /// Restore all defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check that every field is inside its valid range.
    pub fn validate(&self) -> VoiceResult<()> {
        if self.sample_rate == 0 {
            return Err(VoiceError::InvalidInput(
                "sample_rate must be positive".to_string(),
            ));
        }
        if self.channel_count == 0 || self.channel_count > 2 {
            return Err(VoiceError::InvalidInput(format!(
                "channel_count must be 1 or 2, got {}",
                self.channel_count
            )));
        }
        if !(0.5..=2.0).contains(&self.tts_speed) {
            return Err(VoiceError::InvalidInput(format!(
                "tts_speed must be between 0.5 and 2.0, got {}",
                self.tts_speed
            )));
        }
        if !(-20.0..=20.0).contains(&self.tts_pitch) {
            return Err(VoiceError::InvalidInput(format!(
                "tts_pitch must be between -20.0 and 20.0, got {}",
                self.tts_pitch
            )));
        }
        if !(0.0..=100.0).contains(&self.pronunciation_threshold) {
            return Err(VoiceError::InvalidInput(format!(
                "pronunciation_threshold must be between 0 and 100, got {}",
                self.pronunciation_threshold
            )));
        }
        if self.max_recording_time.is_zero() {
            return Err(VoiceError::InvalidInput(
                "max_recording_time must be positive".to_string(),
            ));
        }
        if self.min_recording_time > self.max_recording_time {
            return Err(VoiceError::InvalidInput(format!(
                "min_recording_time ({:?}) exceeds max_recording_time ({:?})",
                self.min_recording_time, self.max_recording_time
            )));
        }
        Ok(())
    }
}

/// Partial settings change; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceSettingsUpdate {
    pub sample_rate: Option<u32>,
    pub channel_count: Option<u16>,
    pub echo_cancellation: Option<bool>,
    pub noise_suppression: Option<bool>,
    pub auto_gain_control: Option<bool>,
    pub tts_voice_gender: Option<TtsGender>,
    pub tts_speed: Option<f32>,
    pub tts_pitch: Option<f32>,
    pub recording_format: Option<ContainerFormat>,
    pub max_recording_time: Option<Duration>,
    pub min_recording_time: Option<Duration>,
    pub pronunciation_threshold: Option<f32>,
}
