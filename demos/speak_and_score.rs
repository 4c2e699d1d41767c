use anyhow::Result;
use spitkorean_voice::audio::SimulatedAudio;
use spitkorean_voice::{
    KoreanLevel, PlaceholderAnalysis, PlaceholderSynthesis, PlaybackEvent, PlaybackSession,
    PronunciationAnalyzer, RecordingSession, SpeakOptions, VoiceSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🗣️  Starting speak-and-score walkthrough");

    let provider = Arc::new(SimulatedAudio::new().with_instant_playback());
    let phrase = "안녕하세요";
    let mut settings = VoiceSettings::default();
    settings.recording_format = spitkorean_voice::ContainerFormat::Wav;

    // 1. Play the reference pronunciation
    let synthesizer = Arc::new(PlaceholderSynthesis::new());
    let (playback, mut playback_events) =
        PlaybackSession::new(provider.clone(), synthesizer);

    playback
        .speak(phrase, &SpeakOptions::default(), &settings)
        .await?;
    info!("🔊 Playing reference audio for \"{}\"", phrase);

    loop {
        let event = timeout(Duration::from_secs(5), playback_events.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("playback event channel closed"))?;
        match event {
            PlaybackEvent::Finished => {
                info!("✅ Reference playback finished");
                break;
            }
            PlaybackEvent::Failed(message) => {
                anyhow::bail!("playback failed: {}", message);
            }
            other => info!("📨 Playback event: {:?}", other),
        }
    }

    // 2. Record the learner repeating the phrase
    let (recorder, _recording_events) = RecordingSession::new(provider);
    recorder.start(&settings).await?;
    info!("🎤 Recording, repeat the phrase now...");
    sleep(Duration::from_millis(1500)).await;

    let clip = recorder
        .stop()
        .await?
        .ok_or_else(|| anyhow::anyhow!("recording was discarded as too short"))?;
    info!(
        "✅ Captured {} bytes over {:.1}s",
        clip.len(),
        clip.duration.as_secs_f32()
    );

    // 3. Score the pronunciation
    let analyzer = PronunciationAnalyzer::new(Arc::new(
        PlaceholderAnalysis::new().with_score(88.0),
    ));
    let report = analyzer
        .analyze(clip, phrase, KoreanLevel::Beginner)
        .await?;

    info!("📝 Heard: \"{}\"", report.transcribed_text);
    info!("🎯 Score: {:.1}", report.pronunciation_score);
    for suggestion in &report.improvement_suggestions {
        info!("💡 {}", suggestion);
    }

    if report.passes(settings.pronunciation_threshold) {
        info!("🏆 Passed at threshold {:.0}", settings.pronunciation_threshold);
    } else {
        info!(
            "📚 Below threshold {:.0}, keep practicing",
            settings.pronunciation_threshold
        );
    }

    info!("🏁 Walkthrough complete");
    Ok(())
}
