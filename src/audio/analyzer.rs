use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use super::snapshot::{AudioSnapshot, COARSE_BINS};

/// Analysis window length in samples. 256 keeps latency low and gives 128
/// usable magnitude bins, plenty for band levels.
pub const DEFAULT_FFT_SIZE: usize = 256;

// Magnitude-to-level mapping range in dBFS.
const MIN_DB: f64 = -100.0;
const MAX_DB: f64 = -30.0;

// Per-bin exponential smoothing weight on the previous value.
const BIN_SMOOTHING: f64 = 0.8;
// Energy lowpass step per update.
const ENERGY_SMOOTHING: f64 = 0.35;
// Envelope follower coefficients.
const ENVELOPE_ATTACK: f64 = 0.75;
const ENVELOPE_RELEASE: f64 = 0.035;

/// Pure spectrum analyzer: feed raw mono samples, call `update()` once per
/// rendered frame, read the snapshot. No device I/O lives here, which is what
/// makes the analysis unit-testable with synthetic sine buffers.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    /// Most recent `fft_size` samples, oldest first.
    ring: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// Smoothed per-bin levels in `[0,1]`, length `fft_size / 2`.
    bins: Vec<f64>,
    energy: f64,
    envelope: f64,
    snapshot: AudioSnapshot,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.next_power_of_two().max(32);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        // Hann window tapers the frame edges against spectral leakage.
        let window = (0..fft_size)
            .map(|i| {
                let phase = std::f32::consts::TAU * i as f32 / fft_size as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        Self {
            fft,
            fft_size,
            window,
            ring: vec![0.0; fft_size],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            bins: vec![0.0; fft_size / 2],
            energy: 0.0,
            envelope: 0.0,
            snapshot: AudioSnapshot::neutral(),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Append samples, keeping only the most recent analysis window.
    pub fn feed(&mut self, samples: &[f32]) {
        if samples.len() >= self.fft_size {
            self.ring
                .copy_from_slice(&samples[samples.len() - self.fft_size..]);
        } else {
            self.ring.rotate_left(samples.len());
            let tail = self.fft_size - samples.len();
            self.ring[tail..].copy_from_slice(samples);
        }
    }

    /// Run one analysis pass over the current window and refresh the
    /// snapshot. Called once per rendered frame regardless of how many
    /// capture callbacks fed samples in between.
    pub fn update(&mut self) -> AudioSnapshot {
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            *slot = Complex::new(self.ring[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        // Magnitudes to dBFS, mapped onto [0,1], smoothed per bin.
        let norm = 2.0 / self.fft_size as f64;
        for (i, bin) in self.bins.iter_mut().enumerate() {
            let mag = f64::from(self.scratch[i].norm()) * norm;
            let db = if mag > 0.0 { 20.0 * mag.log10() } else { MIN_DB };
            let level = ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
            *bin = *bin * BIN_SMOOTHING + level * (1.0 - BIN_SMOOTHING);
        }

        let n = self.bins.len();
        let bass_end = (n / 10).max(1);
        let mid_end = (n / 2).max(bass_end + 1);
        let avg = |s: &[f64]| -> f64 {
            if s.is_empty() {
                0.0
            } else {
                s.iter().sum::<f64>() / s.len() as f64
            }
        };
        let volume = avg(&self.bins);
        let bass = avg(&self.bins[..bass_end]);
        let mid = avg(&self.bins[bass_end..mid_end]);
        let treble = avg(&self.bins[mid_end..]);

        let target = (volume * 0.6 + bass * 0.8 + mid * 0.4 + treble * 0.25).min(1.0);
        self.energy += (target - self.energy) * ENERGY_SMOOTHING;

        let coeff = if self.energy > self.envelope {
            ENVELOPE_ATTACK
        } else {
            ENVELOPE_RELEASE
        };
        self.envelope += (self.energy - self.envelope) * coeff;

        let mut frequencies = [0.0; COARSE_BINS];
        for (i, slot) in frequencies.iter_mut().enumerate() {
            *slot = self.bins[i * n / COARSE_BINS];
        }

        self.snapshot = AudioSnapshot {
            volume,
            bass,
            mid,
            treble,
            energy: self.energy,
            envelope: self.envelope,
            frequencies,
        };
        self.snapshot
    }

    pub fn snapshot(&self) -> AudioSnapshot {
        self.snapshot
    }

    /// Forget all state so the next capture session starts from silence.
    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.bins.fill(0.0);
        self.energy = 0.0;
        self.envelope = 0.0;
        self.snapshot = AudioSnapshot::neutral();
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (std::f64::consts::TAU * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    #[test]
    fn silence_stays_neutral() {
        let mut a = SpectrumAnalyzer::default();
        a.feed(&vec![0.0; 1024]);
        let snap = a.update();
        assert_eq!(snap.volume, 0.0);
        assert_eq!(snap.bass, 0.0);
        assert_eq!(snap.envelope, 0.0);
    }

    #[test]
    fn low_tone_lands_in_bass_band() {
        let mut a = SpectrumAnalyzer::default();
        // 100 Hz at 48 kHz: bin ~0.5, squarely in the bottom 10% of bins.
        let samples = sine(100.0, 48_000.0, 1024, 0.9);
        let mut snap = AudioSnapshot::neutral();
        for _ in 0..20 {
            a.feed(&samples);
            snap = a.update();
        }
        assert!(snap.bass > snap.treble, "bass {} treble {}", snap.bass, snap.treble);
        assert!(snap.bass > 0.1);
    }

    #[test]
    fn envelope_attacks_fast_and_releases_slow() {
        let mut a = SpectrumAnalyzer::default();
        let loud = sine(100.0, 48_000.0, 1024, 0.9);
        for _ in 0..20 {
            a.feed(&loud);
            a.update();
        }
        let peaked = a.snapshot().envelope;
        assert!(peaked > 0.05);
        a.feed(&vec![0.0; 1024]);
        let after_one = a.update().envelope;
        // Slow release: one silent frame barely moves it.
        assert!(after_one > peaked * 0.9);
    }

    #[test]
    fn levels_stay_in_unit_range() {
        let mut a = SpectrumAnalyzer::default();
        let blast = vec![1.0f32; 1024];
        for _ in 0..30 {
            a.feed(&blast);
            let s = a.update();
            for v in [s.volume, s.bass, s.mid, s.treble, s.energy, s.envelope] {
                assert!((0.0..=1.0).contains(&v), "level out of range: {v}");
            }
        }
    }

    #[test]
    fn reset_returns_to_neutral() {
        let mut a = SpectrumAnalyzer::default();
        a.feed(&sine(100.0, 48_000.0, 1024, 0.9));
        a.update();
        a.reset();
        assert_eq!(a.snapshot(), AudioSnapshot::neutral());
    }
}
