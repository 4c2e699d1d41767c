use anyhow::Result;
use spitkorean_voice::audio::{level_percent, MicrophoneConstraints, SimulatedAudio};
use spitkorean_voice::recording::format_elapsed;
use spitkorean_voice::{CapabilityReport, RecordingSession, VoiceSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🎙️  Starting microphone check");

    // 1. Probe device capabilities
    let provider = Arc::new(SimulatedAudio::new());
    let report = CapabilityReport::probe(provider.as_ref());
    if report.recording_supported() {
        info!("✅ Recording supported");
    } else {
        info!("❌ Recording not supported, missing: {:?}", report.missing());
        return Ok(());
    }
    info!("📋 Supported formats: {:?}", report.supported_formats);

    // 2. Request microphone permission up front
    let (session, mut events) = RecordingSession::new(provider);
    let mut settings = VoiceSettings::default();
    settings.recording_format = spitkorean_voice::ContainerFormat::Wav;
    settings.max_recording_time = Duration::from_secs(3);

    session
        .permissions()
        .request(&MicrophoneConstraints::from(&settings))
        .await?;
    info!("✅ Microphone permission granted");

    // 3. Record for two seconds while showing the live meter
    if !session.start(&settings).await? {
        info!("❌ Recording refused to start");
        return Ok(());
    }

    for _ in 0..5 {
        sleep(Duration::from_millis(400)).await;
        let stats = session.stats().await;
        info!(
            "📈 {} | level {:>3}% | {} chunks buffered",
            format_elapsed(stats.elapsed_ms),
            level_percent(stats.audio_level),
            stats.chunks_buffered
        );
    }

    // 4. Stop and inspect the clip
    match session.stop().await? {
        Some(clip) => info!(
            "✅ Captured {} bytes of {} over {:.1}s",
            clip.len(),
            clip.mime,
            clip.duration.as_secs_f32()
        ),
        None => info!("⚠️  Recording was too short and was discarded"),
    }

    // 5. Drain session events
    while let Ok(event) = events.try_recv() {
        info!("📨 Event: {:?}", event);
    }

    info!("🏁 Microphone check complete");
    Ok(())
}
