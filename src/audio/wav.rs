use std::io::Cursor;

use crate::error::{VoiceError, VoiceResult};

use super::decode::DecodedAudio;

/// Encode interleaved PCM16 into a complete WAV file in memory.
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> VoiceResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoiceError::Device(format!("WAV encode failed: {}", e)))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| VoiceError::Device(format!("WAV encode failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| VoiceError::Device(format!("WAV finalize failed: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

/// 44-byte WAV header for a stream whose length is not yet known.
///
/// RIFF and data sizes are left zero; readers of streamed buffers take the
/// data chunk to end-of-buffer instead of trusting the declared size.
pub fn stream_header(sample_rate: u32, channels: u16) -> [u8; 44] {
    let byte_rate = sample_rate * channels as u32 * 2;
    let block_align = channels * 2;

    let mut header = [0u8; 44];
    header[0..4].copy_from_slice(b"RIFF");
    // bytes 4..8 stay zero: total size unknown while streaming
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&16u16.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    // bytes 40..44 stay zero: data size unknown while streaming
    header
}

/// Parse a PCM16 WAV buffer, tolerating the zeroed sizes that streamed
/// encoders leave behind. The data chunk is read to end-of-buffer whenever
/// the declared size is zero or lies.
pub fn read_streamed(bytes: &[u8]) -> VoiceResult<DecodedAudio> {
    if bytes.len() < 44 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(VoiceError::Decode("not a WAV buffer".to_string()));
    }

    let mut sample_rate = 0u32;
    let mut channels = 0u16;
    let mut data: Option<&[u8]> = None;

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let declared = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]) as usize;
        let body_start = pos + 8;

        match id {
            b"fmt " => {
                if body_start + 16 > bytes.len() {
                    return Err(VoiceError::Decode("truncated fmt chunk".to_string()));
                }
                let format = u16::from_le_bytes([bytes[body_start], bytes[body_start + 1]]);
                let bits =
                    u16::from_le_bytes([bytes[body_start + 14], bytes[body_start + 15]]);
                if format != 1 || bits != 16 {
                    return Err(VoiceError::Decode(format!(
                        "unsupported WAV encoding (format {}, {} bits)",
                        format, bits
                    )));
                }
                channels = u16::from_le_bytes([bytes[body_start + 2], bytes[body_start + 3]]);
                sample_rate = u32::from_le_bytes([
                    bytes[body_start + 4],
                    bytes[body_start + 5],
                    bytes[body_start + 6],
                    bytes[body_start + 7],
                ]);
            }
            b"data" => {
                let remaining = bytes.len() - body_start;
                let len = if declared == 0 || declared > remaining {
                    remaining
                } else {
                    declared
                };
                data = Some(&bytes[body_start..body_start + len]);
                break;
            }
            _ => {}
        }

        // Chunks are word-aligned; skip the pad byte on odd sizes
        let advance = declared + (declared % 2);
        pos = body_start + advance.max(1);
    }

    let data = data.ok_or_else(|| VoiceError::Decode("WAV buffer has no data chunk".to_string()))?;
    if sample_rate == 0 || channels == 0 {
        return Err(VoiceError::Decode("WAV buffer has no fmt chunk".to_string()));
    }

    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}
