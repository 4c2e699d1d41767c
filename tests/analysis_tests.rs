// Integration tests for the pronunciation analysis bridge
//
// These tests cover input validation ahead of any network call, the
// placeholder backend, threshold verdicts, and response envelope parsing.

use anyhow::Result;
use chrono::Utc;
use spitkorean_voice::api::{ApiEnvelope, KoreanLevel, PlaceholderAnalysis, PronunciationReport};
use spitkorean_voice::audio::{AudioClip, ContainerFormat};
use spitkorean_voice::{PronunciationAnalyzer, VoiceError};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn make_clip(bytes: Vec<u8>) -> AudioClip {
    AudioClip {
        id: Uuid::new_v4(),
        bytes,
        mime: "audio/wav".to_string(),
        format: ContainerFormat::Wav,
        duration: Duration::from_millis(800),
        recorded_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_blank_reference_text_is_rejected() -> Result<()> {
    let backend = Arc::new(PlaceholderAnalysis::new());
    let analyzer = PronunciationAnalyzer::new(backend.clone());

    let err = analyzer
        .analyze(make_clip(vec![1; 128]), "   ", KoreanLevel::Beginner)
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::InvalidInput(_)));
    assert_eq!(
        backend.calls(),
        0,
        "Validation failures must not reach the backend"
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_clip_is_rejected() -> Result<()> {
    let backend = Arc::new(PlaceholderAnalysis::new());
    let analyzer = PronunciationAnalyzer::new(backend.clone());

    let err = analyzer
        .analyze(make_clip(Vec::new()), "안녕하세요", KoreanLevel::Beginner)
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::InvalidInput(_)));
    assert_eq!(backend.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_placeholder_reports_score() -> Result<()> {
    let backend = Arc::new(PlaceholderAnalysis::new().with_score(92.0));
    let analyzer = PronunciationAnalyzer::new(backend.clone());

    let report = analyzer
        .analyze(make_clip(vec![1; 128]), "안녕하세요", KoreanLevel::Advanced)
        .await?;

    assert_eq!(report.transcribed_text, "안녕하세요");
    assert_eq!(report.pronunciation_score, 92.0);
    assert!(report.passes(70.0));
    assert!(!report.passes(95.0));
    assert_eq!(backend.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_score_at_threshold_passes() -> Result<()> {
    let analyzer = PronunciationAnalyzer::new(Arc::new(PlaceholderAnalysis::new().with_score(70.0)));

    let report = analyzer
        .analyze(make_clip(vec![1; 64]), "감사합니다", KoreanLevel::Beginner)
        .await?;
    assert!(
        report.passes(70.0),
        "A score equal to the threshold should pass"
    );
    Ok(())
}

#[tokio::test]
async fn test_low_score_includes_suggestions() -> Result<()> {
    let analyzer = PronunciationAnalyzer::new(Arc::new(PlaceholderAnalysis::new().with_score(55.0)));

    let report = analyzer
        .analyze(make_clip(vec![1; 64]), "천천히", KoreanLevel::Intermediate)
        .await?;
    assert!(!report.passes(70.0));
    assert!(
        !report.improvement_suggestions.is_empty(),
        "Failing scores should come with coaching hints"
    );
    Ok(())
}

#[test]
fn test_report_envelope_parses_full_payload() -> Result<()> {
    let json = r#"{
        "status": "success",
        "data": {
            "transcribed_text": "안녕하세요",
            "pronunciation_score": 87.5,
            "detailed_analysis": {"vowels": "good", "finals": "weak"},
            "improvement_suggestions": ["받침을 또렷하게 발음하세요"]
        }
    }"#;

    let envelope: ApiEnvelope<PronunciationReport> = serde_json::from_str(json)?;
    assert_eq!(envelope.status, "success");
    let report = envelope.data.expect("data should be present");
    assert_eq!(report.transcribed_text, "안녕하세요");
    assert_eq!(report.pronunciation_score, 87.5);
    assert!(report.detailed_analysis.is_some());
    assert_eq!(report.improvement_suggestions.len(), 1);
    Ok(())
}

#[test]
fn test_report_envelope_defaults_optional_fields() -> Result<()> {
    let json = r#"{
        "status": "success",
        "data": {
            "transcribed_text": "네",
            "pronunciation_score": 91.0
        }
    }"#;

    let envelope: ApiEnvelope<PronunciationReport> = serde_json::from_str(json)?;
    let report = envelope.data.expect("data should be present");
    assert!(report.detailed_analysis.is_none());
    assert!(report.improvement_suggestions.is_empty());
    Ok(())
}

#[test]
fn test_error_envelope_carries_message() -> Result<()> {
    let json = r#"{"status": "error", "message": "audio too noisy"}"#;

    let envelope: ApiEnvelope<PronunciationReport> = serde_json::from_str(json)?;
    assert_eq!(envelope.status, "error");
    assert!(envelope.data.is_none());
    assert_eq!(envelope.message.as_deref(), Some("audio too noisy"));
    Ok(())
}

#[test]
fn test_level_serializes_lowercase() -> Result<()> {
    assert_eq!(serde_json::to_string(&KoreanLevel::Beginner)?, "\"beginner\"");
    assert_eq!(
        serde_json::to_string(&KoreanLevel::Intermediate)?,
        "\"intermediate\""
    );
    assert_eq!(serde_json::to_string(&KoreanLevel::Advanced)?, "\"advanced\"");
    assert_eq!(KoreanLevel::Advanced.to_string(), "advanced");
    Ok(())
}
