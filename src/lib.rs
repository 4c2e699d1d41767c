pub mod api;
pub mod audio;
pub mod capability;
pub mod config;
pub mod error;
pub mod permission;
pub mod playback;
pub mod recording;
pub mod settings;

pub use api::{
    AnalysisBackend, ApiClient, ConnectionMonitor, ConnectionStatus, HttpAnalysis, HttpSynthesis,
    KoreanLevel, PlaceholderAnalysis, PlaceholderSynthesis, PronunciationAnalyzer,
    PronunciationReport, StatusConfig, SynthesisBackend, SynthesisRequest, SynthesizedSpeech,
    TokenStore,
};
pub use audio::{
    AudioClip, AudioFrame, AudioProvider, ContainerFormat, DeviceCapabilities, SimulatedAudio,
};
pub use capability::CapabilityReport;
pub use config::{ApiConfig, AuthConfig, ClientConfig};
pub use error::{PermissionDenial, VoiceError, VoiceResult};
pub use permission::PermissionGate;
pub use playback::{PlaybackEvent, PlaybackSession, SpeakOptions};
pub use recording::{RecordingEvent, RecordingSession, RecordingStats};
pub use settings::{TtsGender, VoiceSettings, VoiceSettingsUpdate};
