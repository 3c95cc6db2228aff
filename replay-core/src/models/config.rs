use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How PCM samples are laid out in the buffer and in saved WAV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Signed (or, at 8 bits, offset-binary unsigned) integer PCM.
    PcmInt,
    /// IEEE 754 float samples. Only valid at 32 bits.
    PcmFloat,
}

/// Sample width and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitDepth {
    /// Bits per sample. Valid values: 8, 16, 24, 32.
    pub bits: u8,
    pub encoding: SampleEncoding,
}

impl BitDepth {
    pub fn pcm_int(bits: u8) -> Self {
        Self {
            bits,
            encoding: SampleEncoding::PcmInt,
        }
    }

    pub fn pcm_float() -> Self {
        Self {
            bits: 32,
            encoding: SampleEncoding::PcmFloat,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bits / 8) as usize
    }
}

/// Configuration for a replay capture session.
///
/// Capture is mono; the buffer holds `buffer_duration_s` seconds of the
/// most recent audio at `sample_rate_hz`. Immutable while capture is
/// running — change it through `ReplaySession::reconfigure` from idle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate in Hz (default: 44100).
    pub sample_rate_hz: u32,

    /// Sample width and encoding (default: 16-bit integer PCM).
    pub bit_depth: BitDepth,

    /// How many seconds of audio the replay buffer retains (default: 60).
    pub buffer_duration_s: u32,
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![8, 16, 24, 32].contains(&self.bit_depth.bits) {
            return Err(format!("unsupported bit depth: {}", self.bit_depth.bits));
        }
        if self.bit_depth.encoding == SampleEncoding::PcmFloat && self.bit_depth.bits != 32 {
            return Err("float encoding requires 32-bit samples".into());
        }
        if self.buffer_duration_s == 0 {
            return Err("buffer duration must be positive".into());
        }
        // The full buffer must stay addressable as a single WAV data chunk.
        // Widen before multiplying: absurd rates must fail here, not wrap.
        let capacity = self.sample_rate_hz as u64
            * self.bytes_per_sample() as u64
            * self.buffer_duration_s as u64;
        if capacity > u32::MAX as u64 - 44 {
            return Err(format!("buffer of {} bytes exceeds the WAV size limit", capacity));
        }
        Ok(())
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bit_depth.bytes_per_sample()
    }

    /// Bytes produced per second of capture. Fits in `u32` for any
    /// configuration `validate` accepts.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz * self.bytes_per_sample() as u32
    }

    /// Total ring capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.byte_rate() as usize * self.buffer_duration_s as usize
    }

    /// Size of a capture frame covering `ms` milliseconds, sample-aligned
    /// and never zero.
    pub fn frame_bytes(&self, ms: u32) -> usize {
        let samples = (self.sample_rate_hz as u64 * ms as u64 / 1000).max(1) as usize;
        samples * self.bytes_per_sample()
    }

    /// Playback duration of `byte_len` bytes at this configuration.
    pub fn duration_for(&self, byte_len: usize) -> Duration {
        let rate = self.byte_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(byte_len as f64 / rate as f64)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            bit_depth: BitDepth::pcm_int(16),
            buffer_duration_s: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = AudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bytes_per_sample(), 2);
        assert_eq!(config.byte_rate(), 88200);
        assert_eq!(config.capacity_bytes(), 88200 * 60);
    }

    #[test]
    fn rejects_zero_rate_and_duration() {
        let mut config = AudioConfig::default();
        config.sample_rate_hz = 0;
        assert!(config.validate().is_err());

        let mut config = AudioConfig::default();
        config.buffer_duration_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_odd_bit_depths() {
        let mut config = AudioConfig::default();
        config.bit_depth = BitDepth::pcm_int(12);
        assert!(config.validate().is_err());
    }

    #[test]
    fn float_must_be_32_bit() {
        let mut config = AudioConfig::default();
        config.bit_depth = BitDepth {
            bits: 16,
            encoding: SampleEncoding::PcmFloat,
        };
        assert!(config.validate().is_err());

        config.bit_depth = BitDepth::pcm_float();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_buffers_too_large_for_wav() {
        // 192 kHz * 4 bytes * 6000 s = 4.6 GB of PCM, past the u32 chunk field.
        let config = AudioConfig {
            sample_rate_hz: 192000,
            bit_depth: BitDepth::pcm_float(),
            buffer_duration_s: 6000,
        };
        assert!(config.validate().is_err());

        let config = AudioConfig {
            sample_rate_hz: 192000,
            bit_depth: BitDepth::pcm_float(),
            buffer_duration_s: 60,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_absurd_sample_rates() {
        // 2^31 Hz at 16-bit is 4 GiB/s; in u32 the byte rate would wrap
        // to zero and read as an empty buffer.
        let config = AudioConfig {
            sample_rate_hz: 1 << 31,
            bit_depth: BitDepth::pcm_int(16),
            buffer_duration_s: 1,
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("WAV size limit"));

        let config = AudioConfig {
            sample_rate_hz: u32::MAX,
            bit_depth: BitDepth::pcm_int(8),
            buffer_duration_s: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn frame_bytes_is_sample_aligned_and_positive() {
        let config = AudioConfig {
            sample_rate_hz: 44100,
            bit_depth: BitDepth::pcm_int(16),
            buffer_duration_s: 60,
        };
        // 20 ms at 44.1 kHz = 882 samples = 1764 bytes
        assert_eq!(config.frame_bytes(20), 1764);

        // Degenerate rates still yield at least one sample.
        let tiny = AudioConfig {
            sample_rate_hz: 10,
            bit_depth: BitDepth::pcm_int(8),
            buffer_duration_s: 1,
        };
        assert_eq!(tiny.frame_bytes(20), 1);
    }

    #[test]
    fn duration_round_trips_through_byte_length() {
        let config = AudioConfig::default();
        let bytes = config.capacity_bytes();
        let duration = config.duration_for(bytes);
        assert!((duration.as_secs_f64() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn serde_round_trip() {
        let config = AudioConfig {
            sample_rate_hz: 48000,
            bit_depth: BitDepth::pcm_float(),
            buffer_duration_s: 30,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: AudioConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
