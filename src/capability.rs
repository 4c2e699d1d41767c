use serde::Serialize;
use tracing::debug;

use crate::audio::{AudioProvider, ContainerFormat};
use crate::error::{VoiceError, VoiceResult};

/// What the current runtime supports
///
/// Produced by `probe()`; a pure query with no device side effects.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    /// An encoder for recording is present
    pub recorder_available: bool,
    /// An input device can be requested
    pub microphone_available: bool,
    /// Raw frames can be tapped for level metering
    pub analyser_available: bool,
    /// An output sink can be opened for synthesized speech
    pub playback_available: bool,
    /// Formats with at least one encodable MIME candidate
    pub supported_formats: Vec<ContainerFormat>,
}

impl CapabilityReport {
    /// Probe the provider for everything recording and playback need.
    pub fn probe(provider: &dyn AudioProvider) -> Self {
        let capabilities = provider.capabilities();

        let supported_formats = if capabilities.recorder {
            ContainerFormat::ALL
                .iter()
                .copied()
                .filter(|format| {
                    format
                        .mime_candidates()
                        .iter()
                        .any(|mime| provider.supports_mime(mime))
                })
                .collect()
        } else {
            Vec::new()
        };

        let report = Self {
            recorder_available: capabilities.recorder,
            microphone_available: capabilities.microphone,
            analyser_available: capabilities.analyser,
            playback_available: capabilities.playback,
            supported_formats,
        };

        debug!(
            "Capability probe on '{}': recorder={} microphone={} analyser={} playback={} formats={:?}",
            provider.name(),
            report.recorder_available,
            report.microphone_available,
            report.analyser_available,
            report.playback_available,
            report.supported_formats
        );

        report
    }

    /// Whether recording can work at all on this runtime.
    pub fn recording_supported(&self) -> bool {
        self.recorder_available && self.microphone_available
    }

    /// Everything recording and playback need is present.
    pub fn fully_supported(&self) -> bool {
        self.recorder_available
            && self.microphone_available
            && self.analyser_available
            && self.playback_available
    }

    /// Names of the missing features, for error messages.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.recorder_available {
            missing.push("recorder");
        }
        if !self.microphone_available {
            missing.push("microphone");
        }
        if !self.analyser_available {
            missing.push("analyser");
        }
        if !self.playback_available {
            missing.push("playback");
        }
        missing
    }

    /// Whether this container format has an encodable MIME candidate.
    pub fn supports(&self, format: ContainerFormat) -> bool {
        self.supported_formats.contains(&format)
    }

    /// Fail fast when recording prerequisites are absent.
    pub fn ensure_recording_supported(&self) -> VoiceResult<()> {
        if self.recording_supported() {
            return Ok(());
        }
        let missing: Vec<&str> = self
            .missing()
            .into_iter()
            .filter(|name| *name == "recorder" || *name == "microphone")
            .collect();
        Err(VoiceError::CapabilityMissing(missing.join(", ")))
    }
}
