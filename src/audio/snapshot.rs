/// Number of coarse spectrum values carried for per-point frequency effects.
pub const COARSE_BINS: usize = 32;

/// One frame's worth of audio analysis, normalized to `[0,1]`.
///
/// This is the only type the renderers see: they read levels from a snapshot
/// and never touch the audio pipeline. A `neutral()` snapshot renders
/// identically to "no audio", which keeps exports deterministic by default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioSnapshot {
    /// Mean level across the whole spectrum.
    pub volume: f64,
    /// Low band: bottom 10% of bins.
    pub bass: f64,
    /// Mid band: 10%..50% of bins.
    pub mid: f64,
    /// High band: top half of bins.
    pub treble: f64,
    /// Smoothed overall excitement, weighted toward bass.
    pub energy: f64,
    /// Fast-attack, slow-release follower of `energy`.
    pub envelope: f64,
    /// Coarse spectrum resampled to a fixed bin count.
    pub frequencies: [f64; COARSE_BINS],
}

impl AudioSnapshot {
    /// Silence. All levels zero; modulation formulas collapse to identity.
    pub const fn neutral() -> Self {
        Self {
            volume: 0.0,
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            energy: 0.0,
            envelope: 0.0,
            frequencies: [0.0; COARSE_BINS],
        }
    }

    /// Coarse bin for a point index, cycling through the spectrum.
    pub fn frequency_for(&self, index: usize) -> f64 {
        self.frequencies[index % COARSE_BINS]
    }
}

impl Default for AudioSnapshot {
    fn default() -> Self {
        Self::neutral()
    }
}
