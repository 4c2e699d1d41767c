use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::AudioClip;
use crate::error::{VoiceError, VoiceResult};

use super::client::{read_envelope, ApiClient};

/// Learner level sent with every analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KoreanLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl KoreanLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KoreanLevel::Beginner => "beginner",
            KoreanLevel::Intermediate => "intermediate",
            KoreanLevel::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for KoreanLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the analysis service says about one recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PronunciationReport {
    /// What the recognizer heard
    pub transcribed_text: String,

    /// Accuracy score, 0 to 100
    pub pronunciation_score: f32,

    /// Service-specific breakdown, passed through untouched
    #[serde(default)]
    pub detailed_analysis: Option<serde_json::Value>,

    /// Coaching hints for the learner
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

impl PronunciationReport {
    /// Whether the score clears the pass threshold.
    pub fn passes(&self, threshold: f32) -> bool {
        self.pronunciation_score >= threshold
    }
}

/// Backend that scores a recording against its reference text
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(
        &self,
        clip: AudioClip,
        original_text: &str,
        level: KoreanLevel,
    ) -> VoiceResult<PronunciationReport>;
}

/// Validating front door for pronunciation analysis.
///
/// Rejects unusable input (blank reference text, empty clip) before any
/// bytes leave the machine. The clip is consumed either way; a recording
/// goes to analysis exactly once.
pub struct PronunciationAnalyzer {
    backend: Arc<dyn AnalysisBackend>,
}

impl PronunciationAnalyzer {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { backend }
    }

    pub async fn analyze(
        &self,
        clip: AudioClip,
        original_text: &str,
        level: KoreanLevel,
    ) -> VoiceResult<PronunciationReport> {
        let original_text = original_text.trim();
        if original_text.is_empty() {
            return Err(VoiceError::InvalidInput(
                "reference text must not be empty".to_string(),
            ));
        }
        if clip.is_empty() {
            return Err(VoiceError::InvalidInput(
                "audio clip is empty".to_string(),
            ));
        }

        debug!(
            "Submitting {} bytes of {} for {} level analysis",
            clip.len(),
            clip.mime,
            level
        );
        let report = self.backend.analyze(clip, original_text, level).await?;
        info!(
            "Pronunciation scored {:.1}: \"{}\"",
            report.pronunciation_score, report.transcribed_text
        );
        Ok(report)
    }
}

/// Remote analysis through the platform pronunciation endpoint
pub struct HttpAnalysis {
    client: Arc<ApiClient>,
}

impl HttpAnalysis {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for HttpAnalysis {
    async fn analyze(
        &self,
        clip: AudioClip,
        original_text: &str,
        level: KoreanLevel,
    ) -> VoiceResult<PronunciationReport> {
        let file_name = clip.upload_file_name();
        let mime = clip.mime.clone();
        let part = reqwest::multipart::Part::bytes(clip.bytes)
            .file_name(file_name)
            .mime_str(&mime)?;
        let form = reqwest::multipart::Form::new()
            .part("audio", part)
            .text("original_text", original_text.to_string())
            .text("level", level.as_str());

        let response = self
            .client
            .post("/journey/pronunciation-analysis")
            .multipart(form)
            .send()
            .await?;

        read_envelope(response).await
    }
}

/// Offline analysis that echoes the reference text back with a fixed score
pub struct PlaceholderAnalysis {
    score: f32,
    calls: AtomicUsize,
}

impl Default for PlaceholderAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderAnalysis {
    pub fn new() -> Self {
        Self {
            score: 85.0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// How many analyze calls this backend has served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for PlaceholderAnalysis {
    async fn analyze(
        &self,
        _clip: AudioClip,
        original_text: &str,
        _level: KoreanLevel,
    ) -> VoiceResult<PronunciationReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let suggestions = if self.score < 80.0 {
            vec!["Slow down and articulate each syllable".to_string()]
        } else {
            Vec::new()
        };
        Ok(PronunciationReport {
            transcribed_text: original_text.to_string(),
            pronunciation_score: self.score,
            detailed_analysis: None,
            improvement_suggestions: suggestions,
        })
    }
}
