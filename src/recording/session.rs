use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::{
    level_from_samples, negotiate_mime, AudioClip, AudioProvider, ContainerFormat,
    MicrophoneConstraints, MicrophoneStream, RecorderOptions, DEFAULT_BIT_RATE,
};
use crate::capability::CapabilityReport;
use crate::error::{VoiceError, VoiceResult};
use crate::permission::PermissionGate;
use crate::settings::VoiceSettings;

use super::stats::{RecordingEvent, RecordingStats};

/// Resolution of the elapsed-time counter and the auto-stop check
pub const TIMER_RESOLUTION: Duration = Duration::from_millis(100);

/// Requested cadence for encoded chunks from the recorder
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Everything owned by one in-flight recording.
///
/// Taking this out of the session mutex is what ends the recording: whichever
/// path (explicit stop or the auto-stop timer) takes it first finalizes the
/// clip, and the other sees `None` and does nothing.
struct ActiveRecording {
    stream: Box<dyn MicrophoneStream>,
    chunk_task: JoinHandle<Vec<u8>>,
    level_task: Option<JoinHandle<()>>,
    timer_task: Option<JoinHandle<()>>,
    started: Instant,
    recorded_at: DateTime<Utc>,
    mime: &'static str,
    format: ContainerFormat,
    min_duration: Duration,
    max_duration: Duration,
}

/// Microphone capture session.
///
/// Owns the capture pipeline for one recording at a time: the microphone
/// stream, an encoder chunk collector, a level meter, and a timer that
/// enforces the maximum duration. `start` and `stop` bracket a recording;
/// events that happen outside that bracket (auto-stop, discard) arrive on
/// the channel returned by [`RecordingSession::new`].
pub struct RecordingSession {
    provider: Arc<dyn AudioProvider>,
    permissions: PermissionGate,
    active: Arc<Mutex<Option<ActiveRecording>>>,
    is_recording: Arc<AtomicBool>,
    is_processing: Arc<AtomicBool>,
    elapsed_ms: Arc<AtomicU64>,
    level_bits: Arc<AtomicU32>,
    chunks_buffered: Arc<AtomicUsize>,
    events_tx: mpsc::UnboundedSender<RecordingEvent>,
}

impl RecordingSession {
    /// Create a session and the receiver for its out-of-band events.
    pub fn new(
        provider: Arc<dyn AudioProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<RecordingEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            permissions: PermissionGate::new(Arc::clone(&provider)),
            provider,
            active: Arc::new(Mutex::new(None)),
            is_recording: Arc::new(AtomicBool::new(false)),
            is_processing: Arc::new(AtomicBool::new(false)),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            level_bits: Arc::new(AtomicU32::new(0f32.to_bits())),
            chunks_buffered: Arc::new(AtomicUsize::new(0)),
            events_tx,
        };
        (session, events_rx)
    }

    /// Start recording with the given settings.
    ///
    /// Returns `Ok(true)` when capture began, `Ok(false)` when a recording
    /// was already active (the existing one keeps running). Capability gaps,
    /// remembered permission denials, and format negotiation failures are
    /// errors; a negotiation failure releases the microphone before
    /// returning.
    pub async fn start(&self, settings: &VoiceSettings) -> VoiceResult<bool> {
        settings.validate()?;

        let report = CapabilityReport::probe(self.provider.as_ref());
        report.ensure_recording_supported()?;

        if let Some(denial) = self.permissions.cached_denial() {
            warn!("Microphone previously denied: {}", denial);
            return Err(VoiceError::Permission(denial));
        }

        let mut active_guard = self.active.lock().await;
        if active_guard.is_some() {
            warn!("Recording already in progress, ignoring start request");
            return Ok(false);
        }

        let constraints = MicrophoneConstraints::from(settings);
        let mut stream = match self.provider.open_microphone(&constraints).await {
            Ok(stream) => {
                self.permissions.clear();
                stream
            }
            Err(VoiceError::Permission(denial)) => {
                error!("Microphone access failed: {} ({})", denial, denial.remedy());
                self.permissions.remember(denial.clone());
                return Err(VoiceError::Permission(denial));
            }
            Err(other) => return Err(other),
        };

        // Negotiate the container after the stream is up; on failure the
        // microphone has to be released again.
        let mime = match negotiate_mime(settings.recording_format, self.provider.as_ref()) {
            Some(mime) => mime,
            None => {
                if let Err(e) = stream.close().await {
                    warn!("Failed to release microphone: {}", e);
                }
                return Err(VoiceError::UnsupportedFormat {
                    format: settings.recording_format,
                    tried: settings
                        .recording_format
                        .mime_candidates()
                        .iter()
                        .map(|m| m.to_string())
                        .collect(),
                });
            }
        };

        let options = RecorderOptions {
            mime: mime.to_string(),
            chunk_interval: CHUNK_INTERVAL,
            bit_rate: DEFAULT_BIT_RATE,
        };
        let mut chunk_rx = match stream.start_recorder(&options).await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(close_err) = stream.close().await {
                    warn!("Failed to release microphone: {}", close_err);
                }
                return Err(e);
            }
        };

        // The level meter is best effort. A session without an analyser
        // still records, it just reports silence.
        let frames_rx = if report.analyser_available {
            match stream.tap_frames().await {
                Ok(rx) => Some(rx),
                Err(e) => {
                    warn!("Level metering unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.elapsed_ms.store(0, Ordering::SeqCst);
        self.level_bits.store(0f32.to_bits(), Ordering::SeqCst);
        self.chunks_buffered.store(0, Ordering::SeqCst);

        let chunks_buffered = Arc::clone(&self.chunks_buffered);
        let chunk_task = tokio::spawn(async move {
            let mut buffer: Vec<u8> = Vec::new();
            let mut count = 0usize;
            while let Some(chunk) = chunk_rx.recv().await {
                if chunk.bytes.is_empty() {
                    continue;
                }
                buffer.extend_from_slice(&chunk.bytes);
                count += 1;
                chunks_buffered.store(count, Ordering::SeqCst);
            }
            debug!("Chunk collector finished with {} chunks", count);
            buffer
        });

        let level_task = frames_rx.map(|mut rx| {
            let level_bits = Arc::clone(&self.level_bits);
            tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    let level = level_from_samples(&frame.samples);
                    level_bits.store(level.to_bits(), Ordering::SeqCst);
                }
                level_bits.store(0f32.to_bits(), Ordering::SeqCst);
            })
        });

        let started = Instant::now();
        let recorded_at = Utc::now();

        let timer_task = {
            let active = Arc::clone(&self.active);
            let is_recording = Arc::clone(&self.is_recording);
            let is_processing = Arc::clone(&self.is_processing);
            let elapsed_ms = Arc::clone(&self.elapsed_ms);
            let level_bits = Arc::clone(&self.level_bits);
            let chunks_buffered = Arc::clone(&self.chunks_buffered);
            let events_tx = self.events_tx.clone();
            let max_duration = settings.max_recording_time;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(TIMER_RESOLUTION);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if !is_recording.load(Ordering::SeqCst) {
                        break;
                    }
                    let elapsed = started.elapsed();
                    elapsed_ms.store(elapsed.as_millis() as u64, Ordering::SeqCst);
                    if elapsed < max_duration {
                        continue;
                    }

                    warn!("Maximum recording time reached, stopping automatically");
                    let taken = { active.lock().await.take() };
                    let Some(mut active_recording) = taken else {
                        break;
                    };
                    is_recording.store(false, Ordering::SeqCst);
                    // This task cannot join itself.
                    active_recording.timer_task = None;
                    is_processing.store(true, Ordering::SeqCst);
                    let result = finalize(
                        active_recording,
                        &elapsed_ms,
                        &level_bits,
                        &chunks_buffered,
                        &events_tx,
                    )
                    .await;
                    is_processing.store(false, Ordering::SeqCst);
                    match result {
                        Ok(Some(clip)) => {
                            let _ = events_tx.send(RecordingEvent::AutoStopped(clip));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!("Auto-stop finalization failed: {}", e);
                            let _ = events_tx.send(RecordingEvent::Failed {
                                message: e.to_string(),
                            });
                        }
                    }
                    break;
                }
            })
        };

        *active_guard = Some(ActiveRecording {
            stream,
            chunk_task,
            level_task,
            timer_task: Some(timer_task),
            started,
            recorded_at,
            mime,
            format: settings.recording_format,
            min_duration: settings.min_recording_time,
            max_duration: settings.max_recording_time,
        });
        drop(active_guard);
        self.is_recording.store(true, Ordering::SeqCst);

        let _ = self.events_tx.send(RecordingEvent::Started {
            mime: mime.to_string(),
        });
        info!(
            "Recording started: {} at {} Hz, max {:?}",
            mime, settings.sample_rate, settings.max_recording_time
        );
        Ok(true)
    }

    /// Stop the active recording and finalize it into a clip.
    ///
    /// Returns `Ok(None)` when no recording was active (including when the
    /// auto-stop timer got there first) or when the recording stayed under
    /// the minimum duration and was discarded.
    pub async fn stop(&self) -> VoiceResult<Option<AudioClip>> {
        let taken = { self.active.lock().await.take() };
        let Some(active) = taken else {
            warn!("No recording in progress, ignoring stop request");
            return Ok(None);
        };

        info!("Stopping recording");
        self.is_recording.store(false, Ordering::SeqCst);
        self.is_processing.store(true, Ordering::SeqCst);
        let result = finalize(
            active,
            &self.elapsed_ms,
            &self.level_bits,
            &self.chunks_buffered,
            &self.events_tx,
        )
        .await;
        self.is_processing.store(false, Ordering::SeqCst);
        result
    }

    /// Short probe recording to confirm the microphone yields usable audio.
    ///
    /// Starts a capture, waits for `duration`, then stops. `Ok(true)` means
    /// a clip came out the other end.
    pub async fn microphone_check(
        &self,
        settings: &VoiceSettings,
        duration: Duration,
    ) -> VoiceResult<bool> {
        if !self.start(settings).await? {
            return Ok(false);
        }
        tokio::time::sleep(duration).await;
        let clip = self.stop().await?;
        Ok(clip.is_some())
    }

    /// Whether capture is currently active.
    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Whether a stop is being finalized.
    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::SeqCst)
    }

    /// Most recent input level, 0.0 to 1.0.
    pub fn audio_level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::SeqCst))
    }

    /// The permission gate this session records through.
    pub fn permissions(&self) -> &PermissionGate {
        &self.permissions
    }

    /// Snapshot of the session state.
    pub async fn stats(&self) -> RecordingStats {
        let (started_at, max_ms) = {
            let guard = self.active.lock().await;
            match guard.as_ref() {
                Some(active) => (
                    Some(active.recorded_at),
                    Some(active.max_duration.as_millis() as u64),
                ),
                None => (None, None),
            }
        };

        let elapsed_ms = self.elapsed_ms.load(Ordering::SeqCst);
        let progress = match max_ms {
            Some(max) if max > 0 => (elapsed_ms as f32 / max as f32).min(1.0),
            _ => 0.0,
        };

        RecordingStats {
            is_recording: self.is_recording(),
            is_processing: self.is_processing(),
            started_at,
            elapsed_ms,
            audio_level: self.audio_level(),
            chunks_buffered: self.chunks_buffered.load(Ordering::SeqCst),
            progress,
        }
    }
}

/// Tear down an active recording and assemble the clip.
///
/// Duration is measured before the stream closes so teardown time never
/// counts as recorded audio.
async fn finalize(
    mut active: ActiveRecording,
    elapsed_ms: &AtomicU64,
    level_bits: &AtomicU32,
    chunks_buffered: &AtomicUsize,
    events_tx: &mpsc::UnboundedSender<RecordingEvent>,
) -> VoiceResult<Option<AudioClip>> {
    let recorded = active.started.elapsed();

    // Join the timer first so auto-stop cannot fire mid-teardown.
    if let Some(task) = active.timer_task.take() {
        if let Err(e) = task.await {
            error!("Timer task failed: {}", e);
        }
    }

    if let Err(e) = active.stream.close().await {
        warn!("Failed to close microphone stream: {}", e);
    }

    let bytes = match active.chunk_task.await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(VoiceError::Device(format!("chunk collector failed: {}", e)));
        }
    };

    if let Some(task) = active.level_task.take() {
        if let Err(e) = task.await {
            error!("Level task failed: {}", e);
        }
    }

    elapsed_ms.store(0, Ordering::SeqCst);
    level_bits.store(0f32.to_bits(), Ordering::SeqCst);
    chunks_buffered.store(0, Ordering::SeqCst);

    if recorded < active.min_duration {
        info!(
            "Recording too short ({:?} < {:?}), discarding",
            recorded, active.min_duration
        );
        let _ = events_tx.send(RecordingEvent::Discarded {
            recorded,
            minimum: active.min_duration,
        });
        return Ok(None);
    }

    if bytes.is_empty() {
        return Err(VoiceError::EmptyRecording);
    }

    let clip = AudioClip {
        id: Uuid::new_v4(),
        bytes,
        mime: active.mime.to_string(),
        format: active.format,
        duration: recorded,
        recorded_at: active.recorded_at,
    };
    info!(
        "Recording {} finalized: {} bytes of {} over {:?}",
        clip.id,
        clip.len(),
        clip.mime,
        recorded
    );

    Ok(Some(clip))
}
