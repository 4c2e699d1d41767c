/// Normalized input level of one PCM frame.
///
/// Root-mean-square of the samples scaled to 0.0..=1.0, where 0.0 is
/// silence and 1.0 is a full-scale signal. Good enough for a visual level
/// meter; not a loudness measurement.
pub fn level_from_samples(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let rms = (sum_sq / samples.len() as f64).sqrt() as f32;
    rms.clamp(0.0, 1.0)
}

/// Level meter percentage (0 to 100) for UI display.
pub fn level_percent(level: f32) -> u8 {
    (level.clamp(0.0, 1.0) * 100.0).round() as u8
}
