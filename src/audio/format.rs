use serde::{Deserialize, Serialize};

use super::provider::AudioProvider;

/// Default encoder bitrate for recordings (bits per second)
pub const DEFAULT_BIT_RATE: u32 = 128_000;

/// Container format for finished recordings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// WebM with Opus audio
    Webm,
    /// MP4 with AAC audio
    Mp4,
    /// Uncompressed WAV
    Wav,
}

impl ContainerFormat {
    /// All formats, in the order the capability probe reports them.
    pub const ALL: [ContainerFormat; 3] = [
        ContainerFormat::Webm,
        ContainerFormat::Mp4,
        ContainerFormat::Wav,
    ];

    /// MIME candidates for this format, most specific first. Negotiation
    /// walks the list and takes the first one the encoder supports.
    pub fn mime_candidates(&self) -> &'static [&'static str] {
        match self {
            ContainerFormat::Webm => &["audio/webm;codecs=opus", "audio/webm"],
            ContainerFormat::Mp4 => &["audio/mp4;codecs=mp4a.40.2", "audio/mp4"],
            ContainerFormat::Wav => &["audio/wav", "audio/wave"],
        }
    }

    /// File extension used for uploads and saved clips.
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Wav => "wav",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Wav => "wav",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the first MIME candidate of `format` that `provider` can encode.
pub fn negotiate_mime(
    format: ContainerFormat,
    provider: &dyn AudioProvider,
) -> Option<&'static str> {
    format
        .mime_candidates()
        .iter()
        .copied()
        .find(|mime| provider.supports_mime(mime))
}
