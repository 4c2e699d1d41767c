use std::f32::consts::TAU;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::audio::wav;
use crate::error::{VoiceError, VoiceResult};
use crate::settings::TtsGender;

use super::client::ApiClient;

/// Synthesis language tag sent with every request
pub const SPEECH_LANGUAGE: &str = "ko-KR";

/// Parameters for one synthesis call
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_gender: TtsGender,
    /// Speech rate multiplier (0.5 to 2.0)
    pub speed: f32,
    /// Pitch adjustment in semitones (-20.0 to 20.0)
    pub pitch: f32,
    pub language: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_gender: TtsGender, speed: f32, pitch: f32) -> Self {
        Self {
            text: text.into(),
            voice_gender,
            speed,
            pitch,
            language: SPEECH_LANGUAGE.to_string(),
        }
    }
}

/// Synthesized audio plus the MIME type it arrived as
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Backend that turns text into audio bytes. The crate ships an HTTP
/// implementation against the platform TTS endpoint and an offline
/// placeholder for tests and demos.
#[async_trait::async_trait]
pub trait SynthesisBackend: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<SynthesizedSpeech>;
}

/// Remote synthesis through the platform TTS endpoint
pub struct HttpSynthesis {
    client: Arc<ApiClient>,
}

impl HttpSynthesis {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SynthesisBackend for HttpSynthesis {
    async fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<SynthesizedSpeech> {
        let response = self
            .client
            .post("/common/tts")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .unwrap_or("audio/mpeg")
            .trim()
            .to_string();

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(VoiceError::Synthesis(
                "synthesis returned no audio".to_string(),
            ));
        }
        debug!("Synthesized {} bytes of {}", bytes.len(), mime);

        Ok(SynthesizedSpeech { bytes, mime })
    }
}

/// Offline synthesis that renders a steady tone as WAV. The tone pitch
/// tracks the requested voice gender and its length scales inversely with
/// the speed multiplier, so playback paths behave like they would with
/// real speech.
pub struct PlaceholderSynthesis {
    duration: Duration,
    calls: AtomicUsize,
}

const PLACEHOLDER_SAMPLE_RATE: u32 = 16_000;

impl Default for PlaceholderSynthesis {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderSynthesis {
    pub fn new() -> Self {
        Self {
            duration: Duration::from_millis(300),
            calls: AtomicUsize::new(0),
        }
    }

    /// Base utterance length before the speed multiplier applies.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// How many synthesize calls this backend has served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SynthesisBackend for PlaceholderSynthesis {
    async fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<SynthesizedSpeech> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let frequency = match request.voice_gender {
            TtsGender::Female => 440.0f32,
            TtsGender::Male => 220.0f32,
        };
        let duration = self.duration.div_f32(request.speed);
        let count = (duration.as_secs_f32() * PLACEHOLDER_SAMPLE_RATE as f32) as usize;
        let samples: Vec<i16> = (0..count)
            .map(|i| {
                let t = i as f32 / PLACEHOLDER_SAMPLE_RATE as f32;
                let value = (TAU * frequency * t).sin() * 0.3;
                (value * i16::MAX as f32) as i16
            })
            .collect();

        let bytes = wav::encode_pcm16(&samples, PLACEHOLDER_SAMPLE_RATE, 1)?;
        Ok(SynthesizedSpeech {
            bytes,
            mime: "audio/wav".to_string(),
        })
    }
}
