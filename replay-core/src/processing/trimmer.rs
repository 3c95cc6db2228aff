//! Voice-activity trimming for captured snapshots.
//!
//! Classifies fixed-size windows as speech or silence using an adaptive
//! energy threshold with a zero-crossing-rate rescue for fricatives,
//! then keeps the speech regions (plus padding) in original order.
//!
//! The trimmer is pure and deterministic. Whenever it cannot classify
//! the clip with confidence it returns the input unchanged rather than
//! guessing (fail-open).

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::snapshot::Snapshot;
use crate::processing::pcm;

/// RMS floor below which a noise-floor estimate is treated as silence
/// when judging peak/floor separation.
const SILENCE_FLOOR: f32 = 1e-4;

/// Tuning for [`VoiceActivityTrimmer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimConfig {
    /// Analysis window length in milliseconds.
    pub window_ms: u32,
    /// Padding kept around each detected speech region, in milliseconds.
    pub padding_ms: u32,
    /// Position of the energy threshold between the noise floor (0.0)
    /// and the loudest window (1.0).
    pub energy_ratio: f32,
    /// Zero-crossing rate above which a moderate-energy window is
    /// rescued as speech (fricatives carry little energy).
    pub zcr_floor: f32,
    /// Clips with fewer windows than this are returned unchanged.
    pub min_windows: usize,
    /// Minimum peak-to-floor RMS ratio required before trimming;
    /// flatter clips are returned unchanged.
    pub min_separation: f32,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            window_ms: 25,
            padding_ms: 150,
            energy_ratio: 0.25,
            zcr_floor: 0.35,
            min_windows: 8,
            min_separation: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowStats {
    rms: f32,
    zcr: f32,
}

/// Removes low-confidence non-speech regions from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct VoiceActivityTrimmer {
    config: TrimConfig,
}

impl VoiceActivityTrimmer {
    pub fn new(config: TrimConfig) -> Self {
        Self { config }
    }

    /// Trim non-speech regions out of `snapshot`.
    ///
    /// Returns a snapshot with the same config and capture timestamp.
    /// The input is returned byte-for-byte when the clip is too short,
    /// when the energy profile is too flat to separate speech from
    /// noise, or when no window classifies as speech.
    pub fn trim(&self, snapshot: &Snapshot) -> Snapshot {
        let samples = pcm::decode_samples(&snapshot.data, snapshot.config.bit_depth);
        if samples.is_empty() {
            return snapshot.clone();
        }

        let window_len = ((snapshot.config.sample_rate_hz as u64
            * self.config.window_ms as u64
            / 1000) as usize)
            .max(1);
        let windows: Vec<WindowStats> = samples
            .chunks(window_len)
            .map(|w| WindowStats {
                rms: pcm::rms_level(w),
                zcr: zero_crossing_rate(w),
            })
            .collect();

        if windows.len() < self.config.min_windows {
            debug!(
                "trim skipped: clip too short ({} windows < {})",
                windows.len(),
                self.config.min_windows
            );
            return snapshot.clone();
        }

        let mut sorted_rms: Vec<f32> = windows.iter().map(|w| w.rms).collect();
        sorted_rms.sort_by(|a, b| a.total_cmp(b));
        let noise_floor = sorted_rms[windows.len() / 10];
        let peak = sorted_rms[windows.len() - 1];

        if peak < self.config.min_separation * noise_floor.max(SILENCE_FLOOR) {
            debug!(
                "trim skipped: peak {:.4} too close to noise floor {:.4}",
                peak, noise_floor
            );
            return snapshot.clone();
        }

        let threshold = noise_floor + self.config.energy_ratio * (peak - noise_floor);
        let speech: Vec<bool> = windows
            .iter()
            .map(|w| {
                w.rms >= threshold
                    || (w.rms >= threshold * 0.5 && w.zcr >= self.config.zcr_floor)
            })
            .collect();

        if !speech.iter().any(|&s| s) {
            debug!("trim skipped: no speech-classified windows");
            return snapshot.clone();
        }

        let pad_windows =
            (self.config.padding_ms as usize).div_ceil(self.config.window_ms.max(1) as usize);
        let regions = merge_regions(&speech, pad_windows);

        let window_bytes = window_len * snapshot.config.bytes_per_sample();
        let mut out = Vec::new();
        for &(start, end) in &regions {
            let from = start * window_bytes;
            let to = (end * window_bytes).min(snapshot.data.len());
            out.extend_from_slice(&snapshot.data[from..to]);
        }

        debug!(
            "trimmed {} -> {} bytes across {} region(s)",
            snapshot.data.len(),
            out.len(),
            regions.len()
        );
        Snapshot {
            data: out,
            config: snapshot.config,
            taken_at: snapshot.taken_at,
        }
    }
}

/// Fraction of adjacent sample pairs whose signs differ.
fn zero_crossing_rate(window: &[f32]) -> f32 {
    if window.len() < 2 {
        return 0.0;
    }
    let crossings = window
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / (window.len() - 1) as f32
}

/// Turn per-window speech flags into padded, merged `(start, end)`
/// window-index regions, end exclusive.
fn merge_regions(speech: &[bool], pad_windows: usize) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;

    for index in 0..=speech.len() {
        let active = index < speech.len() && speech[index];
        match (run_start, active) {
            (None, true) => run_start = Some(index),
            (Some(start), false) => {
                let padded = (
                    start.saturating_sub(pad_windows),
                    (index + pad_windows).min(speech.len()),
                );
                match merged.last_mut() {
                    Some(last) if padded.0 <= last.1 => last.1 = last.1.max(padded.1),
                    _ => merged.push(padded),
                }
                run_start = None;
            }
            _ => {}
        }
    }
    merged
}
