use std::io::Cursor;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{VoiceError, VoiceResult};

use super::provider::AudioFrame;

/// Interleaved PCM16 pulled out of a compressed payload
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Total playing time.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        Duration::from_micros(per_channel * 1_000_000 / self.sample_rate as u64)
    }

    /// Split into frames of roughly `frame_duration` for the render loop.
    pub fn into_frames(self, frame_duration: Duration) -> Vec<AudioFrame> {
        let channels = self.channels.max(1) as usize;
        let sample_rate = self.sample_rate.max(1);
        let per_channel =
            ((sample_rate as u64 * frame_duration.as_millis() as u64) / 1000).max(1) as usize;
        let step = per_channel * channels;

        let mut frames = Vec::with_capacity(self.samples.len() / step + 1);
        let mut offset = 0;
        while offset < self.samples.len() {
            let end = (offset + step).min(self.samples.len());
            let timestamp_ms =
                (offset as u64 / channels as u64) * 1000 / sample_rate as u64;
            frames.push(AudioFrame {
                samples: self.samples[offset..end].to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms,
            });
            offset = end;
        }
        frames
    }
}

/// Decode a compressed audio payload (MP3, WAV, OGG, ...) to PCM16.
pub fn decode_audio(bytes: Vec<u8>, mime: &str) -> VoiceResult<DecodedAudio> {
    if bytes.is_empty() {
        return Err(VoiceError::Decode("empty audio payload".to_string()));
    }

    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_for_mime(mime) {
        hint.with_extension(extension);
    }
    hint.mime_type(mime);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| VoiceError::Decode(format!("unrecognized audio payload: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| VoiceError::Decode("payload has no audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| VoiceError::Decode(format!("no decoder for payload: {}", e)))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => break,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(VoiceError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = &mut sample_buf {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Malformed packet; skip and keep going
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(VoiceError::Decode(e.to_string())),
        }
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(VoiceError::Decode(
            "payload decoded to no audio".to_string(),
        ));
    }

    debug!(
        "Decoded {} samples ({}Hz, {} channels) from {}",
        samples.len(),
        sample_rate,
        channels,
        mime
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some("wav"),
        "audio/ogg" => Some("ogg"),
        "audio/mp4" | "audio/m4a" => Some("m4a"),
        "audio/webm" => Some("webm"),
        "audio/flac" => Some("flac"),
        _ => None,
    }
}
