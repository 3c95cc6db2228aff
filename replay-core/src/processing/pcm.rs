//! Pure PCM sample math shared by the trimmer, capture backends, and tests.
//!
//! All conversions are deterministic: integer encodes clamp to
//! `[-1.0, 1.0]` and map full scale to the symmetric maximum (so
//! `-1.0` becomes `-i16::MAX`, not `i16::MIN`); float samples pass
//! through bit-exact.

use crate::models::config::{BitDepth, SampleEncoding};

const I24_MAX: f64 = 8_388_607.0;

/// Decode little-endian PCM bytes into normalized f32 samples.
///
/// Trailing bytes that do not form a whole sample are ignored.
pub fn decode_samples(bytes: &[u8], depth: BitDepth) -> Vec<f32> {
    let step = depth.bytes_per_sample();
    if step == 0 {
        return Vec::new();
    }
    let count = bytes.len() / step;
    let mut samples = Vec::with_capacity(count);

    match (depth.encoding, depth.bits) {
        (SampleEncoding::PcmInt, 8) => {
            for &b in &bytes[..count] {
                samples.push((b as i16 - 128) as f32 / i8::MAX as f32);
            }
        }
        (SampleEncoding::PcmInt, 16) => {
            for chunk in bytes.chunks_exact(2).take(count) {
                let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                samples.push(v as f32 / i16::MAX as f32);
            }
        }
        (SampleEncoding::PcmInt, 24) => {
            for chunk in bytes.chunks_exact(3).take(count) {
                // Sign-extend the top byte.
                let v = (chunk[0] as i32) | ((chunk[1] as i32) << 8) | ((chunk[2] as i8 as i32) << 16);
                samples.push((v as f64 / I24_MAX) as f32);
            }
        }
        (SampleEncoding::PcmInt, 32) => {
            for chunk in bytes.chunks_exact(4).take(count) {
                let v = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                samples.push((v as f64 / i32::MAX as f64) as f32);
            }
        }
        (SampleEncoding::PcmFloat, 32) => {
            for chunk in bytes.chunks_exact(4).take(count) {
                samples.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
        _ => {}
    }
    samples
}

/// Encode normalized f32 samples as little-endian PCM bytes.
pub fn encode_samples(samples: &[f32], depth: BitDepth) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * depth.bytes_per_sample());

    match (depth.encoding, depth.bits) {
        (SampleEncoding::PcmInt, 8) => {
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0);
                data.push((clamped * i8::MAX as f32 + 128.0) as u8);
            }
        }
        (SampleEncoding::PcmInt, 16) => {
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0);
                let v = (clamped * i16::MAX as f32) as i16;
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        (SampleEncoding::PcmInt, 24) => {
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0) as f64;
                let v = (clamped * I24_MAX) as i32;
                data.extend_from_slice(&v.to_le_bytes()[..3]);
            }
        }
        (SampleEncoding::PcmInt, 32) => {
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0) as f64;
                let v = (clamped * i32::MAX as f64) as i32;
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        (SampleEncoding::PcmFloat, 32) => {
            for &sample in samples {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        }
        _ => {}
    }
    data
}

/// Average interleaved channels into one mono sample per frame.
///
/// Trailing samples short of a whole frame are ignored.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Linear interpolation resampling for mono audio.
///
/// Returns the input unchanged if the rates already match.
pub fn resample_linear(samples: &[f32], source_rate: f64, target_rate: f64) -> Vec<f32> {
    if (source_rate - target_rate).abs() < 0.01 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = target_rate / source_rate;
    let output_count = (samples.len() as f64 * ratio) as usize;
    if output_count == 0 {
        return Vec::new();
    }

    let mut output = vec![0.0f32; output_count];
    for (i, sample) in output.iter_mut().enumerate() {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        if index + 1 < samples.len() {
            *sample = samples[index] * (1.0 - fraction) + samples[index + 1] * fraction;
        } else if index < samples.len() {
            *sample = samples[index];
        }
    }
    output
}

/// RMS level of samples (0.0–1.0 for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn int16_full_scale_and_clamping() {
        let depth = BitDepth::pcm_int(16);
        let pcm = encode_samples(&[0.0, 1.0, -1.0, 2.0, -3.0], depth);
        assert_eq!(pcm.len(), 10);

        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 0);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[4], pcm[5]]), -i16::MAX);
        // Out-of-range input clamps.
        assert_eq!(i16::from_le_bytes([pcm[6], pcm[7]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[8], pcm[9]]), -i16::MAX);
    }

    #[test]
    fn int16_round_trip() {
        let depth = BitDepth::pcm_int(16);
        let original = [0.0f32, 0.25, -0.25, 0.9, -0.9];
        let decoded = decode_samples(&encode_samples(&original, depth), depth);

        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.iter().zip(&decoded) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn int8_round_trip_centers_on_128() {
        let depth = BitDepth::pcm_int(8);
        let pcm = encode_samples(&[0.0, 1.0, -1.0], depth);
        assert_eq!(pcm, vec![128, 255, 1]);

        let decoded = decode_samples(&pcm, depth);
        assert_abs_diff_eq!(decoded[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(decoded[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(decoded[2], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn int24_round_trip() {
        let depth = BitDepth::pcm_int(24);
        let original = [0.0f32, 0.5, -0.5, 1.0, -1.0];
        let pcm = encode_samples(&original, depth);
        assert_eq!(pcm.len(), 15);

        let decoded = decode_samples(&pcm, depth);
        for (a, b) in original.iter().zip(&decoded) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn int32_round_trip() {
        let depth = BitDepth::pcm_int(32);
        let original = [0.0f32, 0.125, -0.75, 1.0];
        let decoded = decode_samples(&encode_samples(&original, depth), depth);
        for (a, b) in original.iter().zip(&decoded) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn float32_passes_through_bit_exact() {
        let depth = BitDepth::pcm_float();
        let original = [0.0f32, 1.5, -2.25, f32::MIN_POSITIVE];
        let decoded = decode_samples(&encode_samples(&original, depth), depth);
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_ignores_trailing_partial_sample() {
        let depth = BitDepth::pcm_int(16);
        let decoded = decode_samples(&[0, 0, 1], depth);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn downmix_stereo_to_mono() {
        let stereo = [0.2, 0.8, 0.4, 0.6];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 2);
        assert_abs_diff_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(mono[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn downmix_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn downmix_drops_a_trailing_partial_frame() {
        // Five samples at four channels: one full frame, one orphan.
        let quad = [0.4, 0.4, 0.8, 0.8, 0.9];
        let mono = downmix_to_mono(&quad, 4);
        assert_eq!(mono.len(), 1);
        assert_abs_diff_eq!(mono[0], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn resample_same_rate_is_passthrough() {
        let samples = vec![1.0, 2.0, 3.0];
        assert_eq!(resample_linear(&samples, 48000.0, 48000.0), samples);
    }

    #[test]
    fn resample_upsample_2x() {
        let result = resample_linear(&[0.0, 1.0], 24000.0, 48000.0);
        assert_eq!(result.len(), 4);
        assert_abs_diff_eq!(result[0], 0.0, epsilon = 0.01);
        // Midpoint falls on the interpolated half step.
        assert_abs_diff_eq!(result[1], 0.5, epsilon = 0.1);
    }

    #[test]
    fn resample_downsample_halves_count() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        assert_eq!(resample_linear(&samples, 48000.0, 24000.0).len(), 50);
    }

    #[test]
    fn rms_and_peak_levels() {
        assert_eq!(rms_level(&[0.0, 0.0, 0.0]), 0.0);
        assert_abs_diff_eq!(rms_level(&[1.0, 1.0, 1.0]), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(peak_level(&[0.1, -0.5, 0.3]), 0.5, epsilon = 1e-6);
        assert_eq!(rms_level(&[]), 0.0);
    }
}
