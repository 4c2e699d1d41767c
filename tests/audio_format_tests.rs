// Integration tests for container formats, level metering, and WAV handling
//
// These tests verify MIME negotiation against provider capabilities, the
// RMS level meter, and that streamed WAV output survives a decode pass.

use anyhow::Result;
use chrono::Utc;
use spitkorean_voice::audio::wav;
use spitkorean_voice::audio::{
    decode_audio, level_from_samples, level_percent, negotiate_mime, AudioClip, ContainerFormat,
    SimulatedAudio,
};
use spitkorean_voice::recording::format_elapsed;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_negotiation_prefers_most_specific_candidate() {
    let provider = SimulatedAudio::new()
        .with_mime("audio/webm")
        .with_mime("audio/webm;codecs=opus");

    let mime = negotiate_mime(ContainerFormat::Webm, &provider);
    assert_eq!(
        mime,
        Some("audio/webm;codecs=opus"),
        "Should pick the codec-qualified candidate first"
    );
}

#[test]
fn test_negotiation_fails_when_nothing_matches() {
    // The default simulated encoder only does WAV
    let provider = SimulatedAudio::new();

    assert_eq!(negotiate_mime(ContainerFormat::Mp4, &provider), None);
    assert_eq!(
        negotiate_mime(ContainerFormat::Wav, &provider),
        Some("audio/wav")
    );
}

#[test]
fn test_format_extensions() {
    assert_eq!(ContainerFormat::Webm.extension(), "webm");
    assert_eq!(ContainerFormat::Mp4.extension(), "mp4");
    assert_eq!(ContainerFormat::Wav.extension(), "wav");
    assert_eq!(ContainerFormat::Webm.to_string(), "webm");
}

#[test]
fn test_level_of_silence_is_zero() {
    assert_eq!(level_from_samples(&[]), 0.0);
    assert_eq!(level_from_samples(&[0i16; 480]), 0.0);
}

#[test]
fn test_level_of_full_scale_square_is_one() {
    let samples = vec![i16::MAX; 480];
    let level = level_from_samples(&samples);
    assert!(
        (level - 1.0).abs() < 0.001,
        "Full-scale square wave should measure 1.0, got {}",
        level
    );
}

#[test]
fn test_level_of_sine_matches_rms() {
    // A sine at amplitude 0.5 has an RMS of 0.5 / sqrt(2)
    let samples: Vec<i16> = (0..4800)
        .map(|i| {
            let t = i as f32 / 48_000.0;
            (0.5 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * i16::MAX as f32) as i16
        })
        .collect();

    let level = level_from_samples(&samples);
    let expected = 0.5 / std::f32::consts::SQRT_2;
    assert!(
        (level - expected).abs() < 0.01,
        "Expected RMS near {}, got {}",
        expected,
        level
    );
}

#[test]
fn test_level_percent_rounds() {
    assert_eq!(level_percent(0.0), 0);
    assert_eq!(level_percent(0.504), 50);
    assert_eq!(level_percent(1.0), 100);
    assert_eq!(level_percent(7.5), 100, "Values above 1.0 should clamp");
}

#[test]
fn test_streamed_wav_roundtrip() -> Result<()> {
    let samples: Vec<i16> = (0..1600).map(|i| (i % 256) as i16 * 100).collect();

    // Header with zeroed sizes followed by raw PCM, the way the recorder
    // streams it
    let mut bytes = wav::stream_header(16_000, 1).to_vec();
    bytes.extend(samples.iter().flat_map(|s| s.to_le_bytes()));

    let decoded = wav::read_streamed(&bytes)?;
    assert_eq!(decoded.sample_rate, 16_000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.samples, samples, "PCM should survive the roundtrip");
    Ok(())
}

#[test]
fn test_streamed_reader_rejects_garbage() {
    assert!(wav::read_streamed(b"not a wav file at all").is_err());
    assert!(wav::read_streamed(&[]).is_err());
}

#[test]
fn test_encoded_wav_decodes_with_symphonia() -> Result<()> {
    let samples: Vec<i16> = (0..3200)
        .map(|i| {
            let t = i as f32 / 16_000.0;
            (0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() * i16::MAX as f32) as i16
        })
        .collect();
    let bytes = wav::encode_pcm16(&samples, 16_000, 1)?;

    let decoded = decode_audio(bytes, "audio/wav")?;
    assert_eq!(decoded.sample_rate, 16_000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(
        decoded.samples.len(),
        samples.len(),
        "Decoder should return every sample"
    );
    Ok(())
}

#[test]
fn test_decode_of_empty_payload_fails() {
    assert!(decode_audio(Vec::new(), "audio/mpeg").is_err());
}

fn make_clip(bytes: Vec<u8>) -> AudioClip {
    AudioClip {
        id: uuid::Uuid::new_v4(),
        bytes,
        mime: "audio/wav".to_string(),
        format: ContainerFormat::Wav,
        duration: Duration::from_millis(500),
        recorded_at: Utc::now(),
    }
}

#[test]
fn test_clip_data_url_and_file_name() {
    let clip = make_clip(vec![1, 2, 3, 4]);

    assert_eq!(clip.upload_file_name(), "recording.wav");
    assert!(
        clip.to_data_url().starts_with("data:audio/wav;base64,"),
        "Data URL should carry the clip MIME type"
    );
    assert_eq!(clip.len(), 4);
    assert!(!clip.is_empty());
}

#[test]
fn test_clip_save_writes_container_bytes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("clip.wav");

    let clip = make_clip(vec![7u8; 256]);
    clip.save(&path)?;

    let written = std::fs::read(&path)?;
    assert_eq!(written.len(), 256, "Saved file should match the clip bytes");
    Ok(())
}

#[test]
fn test_format_elapsed_display() {
    assert_eq!(format_elapsed(0), "0:00");
    assert_eq!(format_elapsed(999), "0:00");
    assert_eq!(format_elapsed(5_000), "0:05");
    assert_eq!(format_elapsed(65_000), "1:05");
    assert_eq!(format_elapsed(600_000), "10:00");
}
