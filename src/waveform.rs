//! Waveform model
//!
//! A fixed-length sequence of normalized amplitudes (0..1) generated once
//! per track. The render loop reads it every frame, so the data sits behind
//! an `Arc<[f32]>` and is never mutated after construction.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Default number of bars
pub const DEFAULT_BARS: usize = 400;

/// Smallest bar count accepted from config
pub const MIN_BARS: usize = 200;

/// Largest bar count accepted from config
pub const MAX_BARS: usize = 3000;

/// Resolution the audio device computes peaks at (resampled to the bar count)
pub const PEAK_RESOLUTION: usize = MAX_BARS;

/// Lowest amplitude of a synthesized bar
const SYNTH_FLOOR: f32 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct Waveform {
    amplitudes: Arc<[f32]>,
}

impl Waveform {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Clamp a configured bar count into the supported range
    pub fn clamp_bars(bars: usize) -> usize {
        bars.clamp(MIN_BARS, MAX_BARS)
    }

    /// Placeholder waveform shown until real peaks arrive.
    ///
    /// Layered sines plus a little noise; the noise is seeded from the track
    /// id so the same track always looks the same.
    pub fn synthesize(track_id: &str, bars: usize) -> Self {
        let bars = Self::clamp_bars(bars);
        let mut hasher = DefaultHasher::new();
        track_id.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        let amplitudes: Vec<f32> = (0..bars)
            .map(|i| {
                let x = i as f32 / 8.0;
                let y = x.sin() * 0.3
                    + (x * 2.3).sin() * 0.2
                    + (x * 4.7).sin() * 0.1
                    + rng.r#gen::<f32>() * 0.1;
                (y.abs() + 0.1).clamp(SYNTH_FLOOR, 1.0)
            })
            .collect();

        Self {
            amplitudes: amplitudes.into(),
        }
    }

    /// Resample decoded peaks down to `bars` buckets (max per bucket) and
    /// normalize so the loudest bar is 1.0.
    pub fn from_peaks(peaks: &[f32], bars: usize) -> Self {
        if peaks.is_empty() {
            return Self::empty();
        }
        let bars = Self::clamp_bars(bars);
        let len = peaks.len();

        let mut amplitudes: Vec<f32> = (0..bars)
            .map(|i| {
                let start = (i * len / bars).min(len - 1);
                let end = ((i + 1) * len / bars).clamp(start + 1, len);
                peaks[start..end]
                    .iter()
                    .fold(0.0f32, |a, &b| a.max(b.abs()))
            })
            .collect();

        let loudest = amplitudes.iter().copied().fold(0.0f32, f32::max);
        if loudest > 0.0 {
            for a in &mut amplitudes {
                *a = (*a / loudest).clamp(0.0, 1.0);
            }
        }

        Self {
            amplitudes: amplitudes.into(),
        }
    }

    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }
}

/// Per-bucket absolute peaks of interleaved PCM, one bucket per output value.
pub fn compute_peaks(pcm: &[f32], resolution: usize) -> Vec<f32> {
    if pcm.is_empty() || resolution == 0 {
        return Vec::new();
    }
    let chunk_size = pcm.len().div_ceil(resolution).max(1);
    pcm.chunks(chunk_size)
        .map(|chunk| chunk.iter().fold(0.0f32, |a, &b| a.max(b.abs())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_is_deterministic_per_track() {
        let a = Waveform::synthesize("track-1", 400);
        let b = Waveform::synthesize("track-1", 400);
        let c = Waveform::synthesize("track-2", 400);
        assert_eq!(a.amplitudes(), b.amplitudes());
        assert_ne!(a.amplitudes(), c.amplitudes());
    }

    #[test]
    fn test_synthesize_respects_floor_and_range() {
        let wf = Waveform::synthesize("mahlet", 400);
        assert_eq!(wf.len(), 400);
        assert!(wf.amplitudes().iter().all(|&a| (SYNTH_FLOOR..=1.0).contains(&a)));
    }

    #[test]
    fn test_bar_count_is_clamped() {
        assert_eq!(Waveform::synthesize("x", 10).len(), MIN_BARS);
        assert_eq!(Waveform::synthesize("x", 10_000).len(), MAX_BARS);
    }

    #[test]
    fn test_from_peaks_normalizes() {
        let peaks: Vec<f32> = (0..1000).map(|i| if i == 500 { 0.5 } else { 0.25 }).collect();
        let wf = Waveform::from_peaks(&peaks, 200);
        assert_eq!(wf.len(), 200);
        let max = wf.amplitudes().iter().copied().fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(wf.amplitudes().iter().any(|&a| (a - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_from_peaks_upsamples_short_input() {
        let wf = Waveform::from_peaks(&[0.2, 0.4], 200);
        assert_eq!(wf.len(), 200);
        assert!((wf.amplitudes()[0] - 0.5).abs() < 1e-6);
        assert!((wf.amplitudes()[199] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_silent_peaks_stays_zero() {
        let wf = Waveform::from_peaks(&[0.0; 500], 200);
        assert!(wf.amplitudes().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_compute_peaks() {
        let pcm = [0.1, -0.9, 0.2, 0.3, -0.4, 0.0];
        let peaks = compute_peaks(&pcm, 3);
        assert_eq!(peaks, vec![0.9, 0.3, 0.4]);
        assert!(compute_peaks(&[], 10).is_empty());
    }
}
