pub mod analysis;
pub mod client;
pub mod status;
pub mod synthesis;
pub mod token;

pub use analysis::{
    AnalysisBackend, HttpAnalysis, KoreanLevel, PlaceholderAnalysis, PronunciationAnalyzer,
    PronunciationReport,
};
pub use client::{read_envelope, ApiClient, ApiEnvelope};
pub use status::{ConnectionMonitor, ConnectionStatus, StatusConfig};
pub use synthesis::{
    HttpSynthesis, PlaceholderSynthesis, SynthesisBackend, SynthesisRequest, SynthesizedSpeech,
    SPEECH_LANGUAGE,
};
pub use token::TokenStore;
