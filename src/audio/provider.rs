use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::VoiceResult;
use crate::settings::VoiceSettings;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the stream opened
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Frame length in wall-clock time.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        Duration::from_micros(per_channel * 1_000_000 / self.sample_rate as u64)
    }
}

/// A piece of encoder output. Concatenating every chunk of a recording in
/// order yields one complete container file.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub bytes: Vec<u8>,
    /// Timestamp in milliseconds since the encoder started
    pub timestamp_ms: u64,
}

/// What the runtime can do, before asking for any device
#[derive(Debug, Clone, Copy)]
pub struct DeviceCapabilities {
    /// An encoder for recording is present
    pub recorder: bool,
    /// An input device can be requested
    pub microphone: bool,
    /// Raw frames can be tapped for level analysis
    pub analyser: bool,
    /// An output sink can be opened
    pub playback: bool,
}

/// Input constraints passed when opening the microphone
#[derive(Debug, Clone)]
pub struct MicrophoneConstraints {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl From<&VoiceSettings> for MicrophoneConstraints {
    fn from(settings: &VoiceSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            channel_count: settings.channel_count,
            echo_cancellation: settings.echo_cancellation,
            noise_suppression: settings.noise_suppression,
            auto_gain_control: settings.auto_gain_control,
        }
    }
}

/// Encoder parameters for one recording
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Negotiated MIME type the encoder must produce
    pub mime: String,
    /// How often the encoder should emit a chunk
    pub chunk_interval: Duration,
    /// Target bitrate in bits per second
    pub bit_rate: u32,
}

/// Audio runtime provider trait
///
/// Implementations wrap whatever the host platform offers for capture and
/// playback. The crate ships `SimulatedAudio` for tests and demos; real
/// device providers (cpal, a browser bridge, ...) live with the embedding
/// application.
#[async_trait::async_trait]
pub trait AudioProvider: Send + Sync {
    /// Probe what this runtime supports. Pure query, no devices touched.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Whether the encoder can produce this MIME type.
    fn supports_mime(&self, mime: &str) -> bool;

    /// Open the microphone. Prompts for permission when the platform
    /// requires it; failures carry a `PermissionDenial` classification.
    async fn open_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> VoiceResult<Box<dyn MicrophoneStream>>;

    /// Open a playback sink on the default output device.
    async fn open_playback(&self) -> VoiceResult<Box<dyn PlaybackSink>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// An open microphone stream
///
/// Dropping the stream releases the device; `close()` does so while also
/// flushing the encoder, so active recordings always call it.
#[async_trait::async_trait]
pub trait MicrophoneStream: Send {
    /// Start encoding into the negotiated MIME type.
    ///
    /// Returns a channel receiver that will receive encoded chunks roughly
    /// every `chunk_interval` until the stream is closed. Valid once per
    /// stream.
    async fn start_recorder(
        &mut self,
        options: &RecorderOptions,
    ) -> VoiceResult<mpsc::Receiver<EncodedChunk>>;

    /// Tap the raw PCM frames for level analysis.
    ///
    /// Returns a channel receiver that closes when the stream closes.
    async fn tap_frames(&mut self) -> VoiceResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing, flush the encoder, and release the device. Both
    /// receivers end shortly after.
    async fn close(&mut self) -> VoiceResult<()>;
}

/// An open playback sink
#[async_trait::async_trait]
pub trait PlaybackSink: Send {
    /// Queue decoded PCM for rendering.
    async fn write(&mut self, frame: AudioFrame) -> VoiceResult<()>;

    /// Wait until everything queued has been rendered.
    async fn drain(&mut self) -> VoiceResult<()>;

    /// Discard queued audio and stop immediately.
    async fn halt(&mut self) -> VoiceResult<()>;
}
