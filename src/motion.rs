//! Slow ambient camera drift plus a pointer-driven influence term.
//!
//! The drift is a sum of incommensurate sines, so it never visibly repeats
//! within a session, and it is a pure function of time: two calls with the
//! same timestamp give the same offset, which is what keeps export
//! deterministic when drift is enabled.

use crate::foundation::core::Vec2;

const SEED_X: f64 = 0.0;
const SEED_Y: f64 = 100.0;
const BASE_OFFSET_PX: f64 = 30.0;
const INFLUENCE_GAIN: f64 = 0.1;
// Per-frame decay at the 60 Hz reference rate.
const INFLUENCE_DECAY: f64 = 0.995;
const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

fn drift_noise(t: f64, seed: f64) -> f64 {
    (t * 1.1 + seed).sin() * 0.5 + (t * 0.7 + seed * 2.3).sin() * 0.3
        + (t * 1.3 + seed * 0.7).sin() * 0.2
}

#[derive(Clone, Debug)]
pub struct CameraDrift {
    intensity: f64,
    influence: Vec2,
    last_ms: Option<f64>,
}

impl CameraDrift {
    pub fn new(intensity: f64) -> Self {
        Self {
            intensity: intensity.max(0.0),
            influence: Vec2::ZERO,
            last_ms: None,
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f64) {
        self.intensity = intensity.max(0.0);
    }

    /// Nudge the camera toward recent pointer motion.
    pub fn apply_influence(&mut self, delta: Vec2) {
        self.influence += delta * INFLUENCE_GAIN;
    }

    /// Offset to translate the scene by at `now_ms`. Decays the pointer
    /// influence by elapsed time, so the fade-out speed is frame-rate
    /// independent.
    pub fn offset(&mut self, now_ms: f64) -> Vec2 {
        let dt = match self.last_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        if dt > 0.0 {
            let decay = INFLUENCE_DECAY.powf(dt / REFERENCE_FRAME_MS);
            self.influence = self.influence * decay;
        }

        let max_offset = BASE_OFFSET_PX * self.intensity;
        let t = now_ms / 1000.0;
        let ambient = Vec2::new(
            drift_noise(t, SEED_X) * max_offset,
            drift_noise(t, SEED_Y) * max_offset,
        );
        let total = ambient + self.influence;
        // Influence can push past the ambient range but never runs away.
        let limit = (2.0 * max_offset).max(f64::EPSILON);
        Vec2::new(total.x.clamp(-limit, limit), total.y.clamp(-limit, limit))
    }

    pub fn reset(&mut self) {
        self.influence = Vec2::ZERO;
        self.last_ms = None;
    }

    /// Ambient-only drift as a pure function of time. Export uses this so
    /// every frame depends only on its own timestamp.
    pub fn ambient(intensity: f64, now_ms: f64) -> Vec2 {
        let max_offset = BASE_OFFSET_PX * intensity.max(0.0);
        let t = now_ms / 1000.0;
        Vec2::new(
            drift_noise(t, SEED_X) * max_offset,
            drift_noise(t, SEED_Y) * max_offset,
        )
    }
}

impl Default for CameraDrift {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_drift_is_deterministic() {
        let mut a = CameraDrift::new(1.0);
        let mut b = CameraDrift::new(1.0);
        for frame in 0..100 {
            let t = frame as f64 * 16.0;
            assert_eq!(a.offset(t), b.offset(t));
        }
    }

    #[test]
    fn offset_stays_within_twice_the_range() {
        let mut drift = CameraDrift::new(1.5);
        drift.apply_influence(Vec2::new(1e6, -1e6));
        let off = drift.offset(1234.0);
        let limit = 2.0 * BASE_OFFSET_PX * 1.5 + 1e-9;
        assert!(off.x.abs() <= limit && off.y.abs() <= limit, "{off:?}");
    }

    #[test]
    fn influence_decays_over_time() {
        let mut drift = CameraDrift::new(1.0);
        drift.apply_influence(Vec2::new(100.0, 0.0));
        let first = drift.offset(0.0);
        let later = drift.offset(10_000.0);
        let ambient_only = {
            let mut d = CameraDrift::new(1.0);
            d.offset(10_000.0)
        };
        // After ten seconds the influence term is essentially gone.
        assert!((later.x - ambient_only.x).abs() < (first.x.abs() + 1.0) * 0.1);
    }

    #[test]
    fn reset_clears_influence() {
        let mut drift = CameraDrift::new(1.0);
        drift.apply_influence(Vec2::new(50.0, 50.0));
        drift.reset();
        let mut clean = CameraDrift::new(1.0);
        assert_eq!(drift.offset(500.0), clean.offset(500.0));
    }
}
