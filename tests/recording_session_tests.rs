// Integration tests for the recording session lifecycle
//
// These tests run against the simulated audio runtime and verify start/stop
// semantics, the auto-stop timer, minimum-duration discards, permission
// caching, and that the microphone is released on every path.

use anyhow::Result;
use spitkorean_voice::audio::wav;
use spitkorean_voice::audio::{ContainerFormat, MicrophoneConstraints, SimulatedAudio};
use spitkorean_voice::{
    PermissionDenial, RecordingEvent, RecordingSession, VoiceError, VoiceSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn test_settings() -> VoiceSettings {
    VoiceSettings {
        recording_format: ContainerFormat::Wav,
        max_recording_time: Duration::from_secs(2),
        min_recording_time: Duration::from_millis(100),
        ..VoiceSettings::default()
    }
}

#[tokio::test]
async fn test_start_stop_produces_clip() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, mut events) = RecordingSession::new(provider.clone());
    let settings = test_settings();

    assert!(session.start(&settings).await?, "Start should begin capture");
    assert!(session.is_recording());
    assert!(matches!(
        events.try_recv(),
        Ok(RecordingEvent::Started { .. })
    ));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let clip = session.stop().await?.expect("Clip should be produced");

    assert_eq!(clip.format, ContainerFormat::Wav);
    assert_eq!(clip.mime, "audio/wav");
    assert!(
        clip.duration >= Duration::from_millis(250),
        "Measured duration should cover the capture window, got {:?}",
        clip.duration
    );
    assert!(clip.len() > 44, "Clip should hold more than a WAV header");

    // The streamed container should decode back to PCM
    let decoded = wav::read_streamed(&clip.bytes)?;
    assert!(!decoded.samples.is_empty());
    assert_eq!(decoded.sample_rate, settings.sample_rate);

    assert!(!session.is_recording());
    assert!(!session.is_processing());
    assert_eq!(
        provider.active_microphones(),
        0,
        "Microphone should be released after stop"
    );
    Ok(())
}

#[tokio::test]
async fn test_short_recording_is_discarded() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, mut events) = RecordingSession::new(provider.clone());
    let settings = VoiceSettings {
        min_recording_time: Duration::from_millis(300),
        ..test_settings()
    };

    session.start(&settings).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let clip = session.stop().await?;
    assert!(clip.is_none(), "Recording under the minimum should be dropped");

    assert!(matches!(
        events.try_recv(),
        Ok(RecordingEvent::Started { .. })
    ));
    match events.try_recv() {
        Ok(RecordingEvent::Discarded { recorded, minimum }) => {
            assert!(recorded < minimum);
        }
        other => panic!("Expected Discarded event, got {:?}", other),
    }

    assert_eq!(provider.active_microphones(), 0);
    Ok(())
}

#[tokio::test]
async fn test_double_start_is_refused() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, _events) = RecordingSession::new(provider.clone());
    let settings = test_settings();

    assert!(session.start(&settings).await?);
    assert!(
        !session.start(&settings).await?,
        "Second start should be refused while recording"
    );
    assert_eq!(
        provider.microphone_prompts(),
        1,
        "The refused start must not touch the microphone"
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(session.stop().await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_stop_without_start_is_noop() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, _events) = RecordingSession::new(provider);

    assert!(session.stop().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_auto_stop_at_max_duration() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, mut events) = RecordingSession::new(provider.clone());
    let settings = VoiceSettings {
        max_recording_time: Duration::from_millis(300),
        ..test_settings()
    };

    session.start(&settings).await?;
    assert!(matches!(
        events.recv().await,
        Some(RecordingEvent::Started { .. })
    ));

    let event = timeout(Duration::from_secs(3), events.recv())
        .await?
        .expect("Auto-stop event should arrive");
    match event {
        RecordingEvent::AutoStopped(clip) => {
            assert!(
                clip.duration >= Duration::from_millis(300),
                "Auto-stop should fire at or after the limit, got {:?}",
                clip.duration
            );
            assert!(
                clip.duration <= Duration::from_millis(600),
                "Auto-stop should fire within a tick of the limit, got {:?}",
                clip.duration
            );
            assert!(clip.len() > 44);
        }
        other => panic!("Expected AutoStopped event, got {:?}", other),
    }

    assert!(!session.is_recording());
    assert_eq!(
        provider.active_microphones(),
        0,
        "Auto-stop should release the microphone"
    );

    // The clip is already delivered; an explicit stop finds nothing
    assert!(session.stop().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_start_without_recorder_fails_fast() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new().without_recorder());
    let (session, _events) = RecordingSession::new(provider.clone());

    let err = session.start(&test_settings()).await.unwrap_err();
    assert!(
        matches!(err, VoiceError::CapabilityMissing(_)),
        "Expected CapabilityMissing, got {:?}",
        err
    );
    assert_eq!(
        provider.microphone_prompts(),
        0,
        "Capability failures must not prompt for the microphone"
    );
    Ok(())
}

#[tokio::test]
async fn test_unsupported_format_releases_microphone() -> Result<()> {
    // The simulated encoder cannot produce WebM
    let provider = Arc::new(SimulatedAudio::new());
    let (session, _events) = RecordingSession::new(provider.clone());
    let settings = VoiceSettings {
        recording_format: ContainerFormat::Webm,
        ..test_settings()
    };

    let err = session.start(&settings).await.unwrap_err();
    match err {
        VoiceError::UnsupportedFormat { format, tried } => {
            assert_eq!(format, ContainerFormat::Webm);
            assert_eq!(tried.len(), 2, "Both WebM candidates should be listed");
        }
        other => panic!("Expected UnsupportedFormat, got {:?}", other),
    }

    assert_eq!(provider.microphone_prompts(), 1);
    assert_eq!(
        provider.active_microphones(),
        0,
        "Negotiation failure should hand the microphone back"
    );
    assert!(!session.is_recording());
    Ok(())
}

#[tokio::test]
async fn test_denied_permission_is_cached() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new().with_denial(PermissionDenial::Denied));
    let (session, _events) = RecordingSession::new(provider.clone());
    let settings = test_settings();

    let err = session.start(&settings).await.unwrap_err();
    assert!(matches!(
        err,
        VoiceError::Permission(PermissionDenial::Denied)
    ));
    assert_eq!(provider.microphone_prompts(), 1);

    // The denial is remembered; the next start fails without a new prompt
    let err = session.start(&settings).await.unwrap_err();
    assert!(matches!(
        err,
        VoiceError::Permission(PermissionDenial::Denied)
    ));
    assert_eq!(
        provider.microphone_prompts(),
        1,
        "Cached denial must not prompt again"
    );
    Ok(())
}

#[tokio::test]
async fn test_recovery_after_permission_granted() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new().with_denial(PermissionDenial::Denied));
    let (session, _events) = RecordingSession::new(provider.clone());
    let settings = test_settings();

    assert!(session.start(&settings).await.is_err());

    // The user flips the permission; a fresh gate request clears the cache
    provider.set_denial(None);
    let constraints = MicrophoneConstraints::from(&settings);
    session.permissions().request(&constraints).await?;
    assert!(session.permissions().cached_denial().is_none());

    assert!(
        session.start(&settings).await?,
        "Recording should work once permission is granted"
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(session.stop().await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_device_busy_classification() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new().with_denial(PermissionDenial::DeviceBusy));
    let (session, _events) = RecordingSession::new(provider);

    let err = session.start(&test_settings()).await.unwrap_err();
    match err {
        VoiceError::Permission(denial) => {
            assert_eq!(denial, PermissionDenial::DeviceBusy);
            assert!(
                !denial.remedy().is_empty(),
                "Every denial should carry user guidance"
            );
        }
        other => panic!("Expected Permission error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_settings_rejected_before_devices() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, _events) = RecordingSession::new(provider.clone());
    let settings = VoiceSettings {
        min_recording_time: Duration::from_secs(10),
        max_recording_time: Duration::from_secs(2),
        ..test_settings()
    };

    let err = session.start(&settings).await.unwrap_err();
    assert!(matches!(err, VoiceError::InvalidInput(_)));
    assert_eq!(provider.microphone_prompts(), 0);
    Ok(())
}

#[tokio::test]
async fn test_microphone_check() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, _events) = RecordingSession::new(provider.clone());

    let ok = session
        .microphone_check(&test_settings(), Duration::from_millis(250))
        .await?;
    assert!(ok, "A capture above the minimum should pass the check");

    // Below the minimum the probe clip is discarded
    let settings = VoiceSettings {
        min_recording_time: Duration::from_millis(300),
        ..test_settings()
    };
    let ok = session
        .microphone_check(&settings, Duration::from_millis(50))
        .await?;
    assert!(!ok, "A too-short capture should fail the check");

    assert_eq!(provider.active_microphones(), 0);
    Ok(())
}

#[tokio::test]
async fn test_stats_while_recording() -> Result<()> {
    let provider = Arc::new(SimulatedAudio::new());
    let (session, _events) = RecordingSession::new(provider);
    let settings = test_settings();

    let idle = session.stats().await;
    assert!(!idle.is_recording);
    assert_eq!(idle.elapsed_ms, 0);
    assert!(idle.started_at.is_none());

    session.start(&settings).await?;
    tokio::time::sleep(Duration::from_millis(350)).await;

    let stats = session.stats().await;
    assert!(stats.is_recording);
    assert!(stats.started_at.is_some());
    assert!(
        stats.elapsed_ms >= 200,
        "Elapsed should advance in timer ticks, got {}ms",
        stats.elapsed_ms
    );
    assert!(stats.progress > 0.0 && stats.progress <= 1.0);
    assert!(
        stats.chunks_buffered >= 1,
        "Encoder chunks should be arriving"
    );
    assert!(
        stats.audio_level > 0.1,
        "The tone input should register on the meter, got {}",
        stats.audio_level
    );

    session.stop().await?;
    let after = session.stats().await;
    assert_eq!(after.elapsed_ms, 0, "Stop should reset the counters");
    assert_eq!(after.audio_level, 0.0);
    assert_eq!(after.chunks_buffered, 0);
    Ok(())
}
