//! Simulated audio runtime
//!
//! A full `AudioProvider` implementation with no hardware behind it:
//! scripted capabilities and permission outcomes, a 440 Hz tone source,
//! a streamed-WAV chunk encoder, and a paced playback sink. Demos run on
//! it out of the box and tests use its counters to assert that every
//! device handle is released.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{PermissionDenial, VoiceError, VoiceResult};

use super::provider::{
    AudioFrame, AudioProvider, DeviceCapabilities, EncodedChunk, MicrophoneConstraints,
    MicrophoneStream, PlaybackSink, RecorderOptions,
};
use super::wav;

const TONE_HZ: f32 = 440.0;

#[derive(Default)]
struct SimCounters {
    /// Times `open_microphone` was called (permission prompts shown)
    microphone_prompts: AtomicUsize,
    /// Microphone handles currently held
    open_microphones: AtomicUsize,
    /// Playback sinks currently held
    open_playbacks: AtomicUsize,
    /// Frames written to playback sinks
    frames_played: AtomicUsize,
}

/// Hardware-free audio provider for tests and demos
pub struct SimulatedAudio {
    capabilities: DeviceCapabilities,
    encodable: Vec<String>,
    denial: Mutex<Option<PermissionDenial>>,
    amplitude: f32,
    frame_interval: Duration,
    realtime_playback: bool,
    counters: Arc<SimCounters>,
}

impl Default for SimulatedAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAudio {
    /// Fully capable runtime: WAV encoding, tone input at a moderate
    /// level, real-time paced playback.
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                recorder: true,
                microphone: true,
                analyser: true,
                playback: true,
            },
            encodable: vec!["audio/wav".to_string(), "audio/wave".to_string()],
            denial: Mutex::new(None),
            amplitude: 0.4,
            frame_interval: Duration::from_millis(20),
            realtime_playback: true,
            counters: Arc::new(SimCounters::default()),
        }
    }

    pub fn without_recorder(mut self) -> Self {
        self.capabilities.recorder = false;
        self
    }

    pub fn without_microphone(mut self) -> Self {
        self.capabilities.microphone = false;
        self
    }

    pub fn without_analyser(mut self) -> Self {
        self.capabilities.analyser = false;
        self
    }

    pub fn without_playback(mut self) -> Self {
        self.capabilities.playback = false;
        self
    }

    /// Script the next microphone opens to fail with this classification.
    pub fn with_denial(self, denial: PermissionDenial) -> Self {
        *self.denial.lock().unwrap() = Some(denial);
        self
    }

    /// Claim an additional encodable MIME type. The encoder still emits
    /// streamed-WAV PCM regardless of the advertised label.
    pub fn with_mime(mut self, mime: &str) -> Self {
        self.encodable.push(mime.to_string());
        self
    }

    /// Tone amplitude, 0.0 (silence) to 1.0 (full scale).
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Render playback writes instantly instead of pacing them.
    pub fn with_instant_playback(mut self) -> Self {
        self.realtime_playback = false;
        self
    }

    /// Change the scripted permission outcome mid-test.
    pub fn set_denial(&self, denial: Option<PermissionDenial>) {
        *self.denial.lock().unwrap() = denial;
    }

    /// Times the microphone was requested (prompt count).
    pub fn microphone_prompts(&self) -> usize {
        self.counters.microphone_prompts.load(Ordering::SeqCst)
    }

    /// Microphone handles currently held.
    pub fn active_microphones(&self) -> usize {
        self.counters.open_microphones.load(Ordering::SeqCst)
    }

    /// Playback sinks currently held.
    pub fn active_playbacks(&self) -> usize {
        self.counters.open_playbacks.load(Ordering::SeqCst)
    }

    /// Frames written to playback sinks so far.
    pub fn frames_played(&self) -> usize {
        self.counters.frames_played.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AudioProvider for SimulatedAudio {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn supports_mime(&self, mime: &str) -> bool {
        self.encodable.iter().any(|m| m == mime)
    }

    async fn open_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> VoiceResult<Box<dyn MicrophoneStream>> {
        self.counters
            .microphone_prompts
            .fetch_add(1, Ordering::SeqCst);

        if let Some(denial) = self.denial.lock().unwrap().clone() {
            return Err(VoiceError::Permission(denial));
        }
        if !self.capabilities.microphone {
            return Err(VoiceError::Permission(PermissionDenial::DeviceNotFound));
        }

        self.counters.open_microphones.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Simulated microphone opened ({}Hz, {} channels)",
            constraints.sample_rate, constraints.channel_count
        );

        Ok(Box::new(SimMicrophone {
            sample_rate: constraints.sample_rate,
            channels: constraints.channel_count,
            amplitude: self.amplitude,
            frame_interval: self.frame_interval,
            encodable: self.encodable.clone(),
            analyser: self.capabilities.analyser,
            counters: Arc::clone(&self.counters),
            stopped: Arc::new(AtomicBool::new(false)),
            opened: Instant::now(),
            recorder_started: false,
            tasks: Vec::new(),
            released: false,
        }))
    }

    async fn open_playback(&self) -> VoiceResult<Box<dyn PlaybackSink>> {
        if !self.capabilities.playback {
            return Err(VoiceError::Device(
                "no output device in this runtime".to_string(),
            ));
        }

        self.counters.open_playbacks.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(SimSpeaker {
            realtime: self.realtime_playback,
            counters: Arc::clone(&self.counters),
            released: false,
        }))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

struct SimMicrophone {
    sample_rate: u32,
    channels: u16,
    amplitude: f32,
    frame_interval: Duration,
    encodable: Vec<String>,
    analyser: bool,
    counters: Arc<SimCounters>,
    stopped: Arc<AtomicBool>,
    opened: Instant,
    recorder_started: bool,
    tasks: Vec<JoinHandle<()>>,
    released: bool,
}

impl SimMicrophone {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.stopped.store(true, Ordering::SeqCst);
            self.counters.open_microphones.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl MicrophoneStream for SimMicrophone {
    async fn start_recorder(
        &mut self,
        options: &RecorderOptions,
    ) -> VoiceResult<mpsc::Receiver<EncodedChunk>> {
        if self.recorder_started {
            return Err(VoiceError::Device(
                "recorder already started on this stream".to_string(),
            ));
        }
        if !self.encodable.iter().any(|m| m == &options.mime) {
            return Err(VoiceError::Device(format!(
                "simulated encoder cannot produce {}",
                options.mime
            )));
        }
        self.recorder_started = true;

        let (tx, rx) = mpsc::channel(100);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let amplitude = self.amplitude;
        let interval = options.chunk_interval;
        let stopped = Arc::clone(&self.stopped);
        let opened = self.opened;

        let task = tokio::spawn(async move {
            let header = wav::stream_header(sample_rate, channels);
            if tx
                .send(EncodedChunk {
                    bytes: header.to_vec(),
                    timestamp_ms: 0,
                })
                .await
                .is_err()
            {
                return;
            }

            // Per-channel sample position already emitted
            let mut emitted: u64 = 0;
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately

            loop {
                ticker.tick().await;

                let elapsed = opened.elapsed();
                let position = elapsed.as_micros() as u64 * sample_rate as u64 / 1_000_000;
                if position > emitted {
                    let count = (position - emitted) as usize;
                    let samples =
                        tone_samples(amplitude, sample_rate, channels, emitted, count);
                    let bytes: Vec<u8> =
                        samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                    let chunk = EncodedChunk {
                        bytes,
                        timestamp_ms: elapsed.as_millis() as u64,
                    };
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                    emitted = position;
                }

                // Checked after the flush so the final partial chunk goes out
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
            }
        });
        self.tasks.push(task);

        Ok(rx)
    }

    async fn tap_frames(&mut self) -> VoiceResult<mpsc::Receiver<AudioFrame>> {
        if !self.analyser {
            return Err(VoiceError::Device(
                "no analyser in this runtime".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(100);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let amplitude = self.amplitude;
        let interval = self.frame_interval;
        let stopped = Arc::clone(&self.stopped);
        let opened = self.opened;

        let task = tokio::spawn(async move {
            let per_frame =
                ((sample_rate as u64 * interval.as_millis() as u64) / 1000).max(1) as usize;
            let mut position: u64 = 0;
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if stopped.load(Ordering::SeqCst) {
                    break;
                }

                let frame = AudioFrame {
                    samples: tone_samples(amplitude, sample_rate, channels, position, per_frame),
                    sample_rate,
                    channels,
                    timestamp_ms: opened.elapsed().as_millis() as u64,
                };
                position += per_frame as u64;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        self.tasks.push(task);

        Ok(rx)
    }

    async fn close(&mut self) -> VoiceResult<()> {
        self.stopped.store(true, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        self.release();
        debug!("Simulated microphone closed");
        Ok(())
    }
}

impl Drop for SimMicrophone {
    fn drop(&mut self) {
        self.release();
    }
}

struct SimSpeaker {
    realtime: bool,
    counters: Arc<SimCounters>,
    released: bool,
}

#[async_trait::async_trait]
impl PlaybackSink for SimSpeaker {
    async fn write(&mut self, frame: AudioFrame) -> VoiceResult<()> {
        if self.realtime {
            tokio::time::sleep(frame.duration()).await;
        }
        self.counters.frames_played.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn drain(&mut self) -> VoiceResult<()> {
        Ok(())
    }

    async fn halt(&mut self) -> VoiceResult<()> {
        Ok(())
    }
}

impl Drop for SimSpeaker {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.open_playbacks.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn tone_samples(
    amplitude: f32,
    sample_rate: u32,
    channels: u16,
    start_sample: u64,
    count: usize,
) -> Vec<i16> {
    let mut samples = Vec::with_capacity(count * channels as usize);
    for i in 0..count {
        let t = (start_sample + i as u64) as f32 / sample_rate as f32;
        let value =
            (amplitude * (2.0 * std::f32::consts::PI * TONE_HZ * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..channels {
            samples.push(value);
        }
    }
    samples
}
