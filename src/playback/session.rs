use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::synthesis::{SynthesisBackend, SynthesisRequest};
use crate::audio::{decode_audio, AudioProvider};
use crate::error::{VoiceError, VoiceResult};
use crate::settings::{TtsGender, VoiceSettings};

/// How much PCM each write to the sink carries
const PLAYBACK_FRAME: Duration = Duration::from_millis(20);

/// Per-call overrides for [`PlaybackSession::speak`]. Unset fields fall back
/// to the session settings.
#[derive(Debug, Clone, Default)]
pub struct SpeakOptions {
    pub gender: Option<TtsGender>,
    pub speed: Option<f32>,
    pub pitch: Option<f32>,
}

/// Notifications from the playback render task
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Rendering began
    Started,
    /// The utterance played to the end. Never sent for interrupted playback.
    Finished,
    /// Rendering failed partway through
    Failed(String),
}

/// Speech playback session.
///
/// Synthesizes text through the configured backend, decodes the returned
/// audio, and renders it on the provider's output sink. One utterance plays
/// at a time; a second `speak` while one is active is refused rather than
/// queued or mixed.
pub struct PlaybackSession {
    provider: Arc<dyn AudioProvider>,
    synthesizer: Arc<dyn SynthesisBackend>,
    is_playing: Arc<AtomicBool>,
    halt_flag: Arc<AtomicBool>,
    render_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackSession {
    /// Create a session and the receiver for its events.
    pub fn new(
        provider: Arc<dyn AudioProvider>,
        synthesizer: Arc<dyn SynthesisBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            provider,
            synthesizer,
            is_playing: Arc::new(AtomicBool::new(false)),
            halt_flag: Arc::new(AtomicBool::new(false)),
            render_task: Arc::new(Mutex::new(None)),
            events_tx,
        };
        (session, events_rx)
    }

    /// Synthesize `text` and play it.
    ///
    /// Returns `Ok(true)` when playback started, `Ok(false)` when another
    /// utterance was already playing (nothing is queued). Synthesis and
    /// decode failures surface here before anything is heard, and release
    /// the playback slot.
    pub async fn speak(
        &self,
        text: &str,
        options: &SpeakOptions,
        settings: &VoiceSettings,
    ) -> VoiceResult<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::InvalidInput(
                "text to speak must not be empty".to_string(),
            ));
        }

        if !self.provider.capabilities().playback {
            return Err(VoiceError::CapabilityMissing("playback".to_string()));
        }

        let gender = options.gender.unwrap_or(settings.tts_voice_gender);
        let speed = options.speed.unwrap_or(settings.tts_speed);
        let pitch = options.pitch.unwrap_or(settings.tts_pitch);
        if !(0.5..=2.0).contains(&speed) {
            return Err(VoiceError::InvalidInput(format!(
                "speed must be between 0.5 and 2.0, got {}",
                speed
            )));
        }
        if !(-20.0..=20.0).contains(&pitch) {
            return Err(VoiceError::InvalidInput(format!(
                "pitch must be between -20.0 and 20.0, got {}",
                pitch
            )));
        }

        if self
            .is_playing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Playback already in progress, ignoring speak request");
            return Ok(false);
        }
        self.halt_flag.store(false, Ordering::SeqCst);

        // The slot is claimed. Every failure from here on has to give it
        // back before returning.
        let request = SynthesisRequest::new(text, gender, speed, pitch);
        let speech = match self.synthesizer.synthesize(&request).await {
            Ok(speech) => speech,
            Err(e) => {
                error!("Speech synthesis failed: {}", e);
                self.is_playing.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        debug!(
            "Synthesized {} bytes of {} for playback",
            speech.bytes.len(),
            speech.mime
        );

        let decoded = match decode_audio(speech.bytes, &speech.mime) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!("Failed to decode synthesized audio: {}", e);
                self.is_playing.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        let total = decoded.duration();
        let frames = decoded.into_frames(PLAYBACK_FRAME);

        let mut sink = match self.provider.open_playback().await {
            Ok(sink) => sink,
            Err(e) => {
                error!("Failed to open playback sink: {}", e);
                self.is_playing.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut task_guard = self.render_task.lock().await;
        let halt_flag = Arc::clone(&self.halt_flag);
        let is_playing = Arc::clone(&self.is_playing);
        let events_tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let mut halted = false;
            for frame in frames {
                if halt_flag.load(Ordering::SeqCst) {
                    halted = true;
                    break;
                }
                if let Err(e) = sink.write(frame).await {
                    error!("Playback write failed: {}", e);
                    let _ = events_tx.send(PlaybackEvent::Failed(e.to_string()));
                    is_playing.store(false, Ordering::SeqCst);
                    return;
                }
            }

            if halted {
                if let Err(e) = sink.halt().await {
                    warn!("Failed to halt playback sink: {}", e);
                }
                debug!("Playback interrupted before completion");
            } else {
                if let Err(e) = sink.drain().await {
                    warn!("Failed to drain playback sink: {}", e);
                }
                info!("Playback finished");
                let _ = events_tx.send(PlaybackEvent::Finished);
            }
            is_playing.store(false, Ordering::SeqCst);
        });
        *task_guard = Some(handle);
        drop(task_guard);

        let _ = self.events_tx.send(PlaybackEvent::Started);
        info!("Playback started: {:?} of synthesized speech", total);
        Ok(true)
    }

    /// Interrupt the active utterance.
    ///
    /// The interrupted playback never emits `Finished`. Calling this while
    /// idle is a no-op.
    pub async fn stop(&self) -> VoiceResult<()> {
        if !self.is_playing.load(Ordering::SeqCst) {
            warn!("No playback in progress, ignoring stop request");
            return Ok(());
        }

        info!("Stopping playback");
        self.halt_flag.store(true, Ordering::SeqCst);
        let handle = { self.render_task.lock().await.take() };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Render task failed: {}", e);
            }
        }
        Ok(())
    }

    /// Whether an utterance is currently playing.
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::SeqCst)
    }
}
