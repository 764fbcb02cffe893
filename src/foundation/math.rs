//! Deterministic pseudo-random helpers shared by the brush renderers and the
//! camera drift. None of these allocate or carry hidden state; visual effects
//! that need randomness derive it from seeds so replay and export stay
//! bit-stable.

#[derive(Clone, Copy, Debug)]
pub struct Rng64 {
    state: u64,
}

impl Rng64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        // SplitMix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    pub fn next_f64_01(&mut self) -> f64 {
        // 53 bits of precision.
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }
}

/// Hash an integer lattice coordinate to `[0,1)`.
pub fn noise01(seed: u64, x: u64) -> f64 {
    let mut rng = Rng64::new(seed ^ x.wrapping_mul(0xD6E8_FEB8_6659_FD93));
    rng.next_f64_01()
}

/// The stroke renderers' hash: `fract(sin(seed) * 10000)`.
///
/// Kept as-is rather than replaced with a named PRNG because the particle and
/// flare placement was tuned against exactly this distribution.
pub fn fract_sin(seed: f64) -> f64 {
    let x = seed.sin() * 10000.0;
    x - x.floor()
}

pub fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_deterministic() {
        let mut a = Rng64::new(123);
        let mut b = Rng64::new(123);
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn noise01_is_bounded() {
        for x in 0..100 {
            let v = noise01(7, x);
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn fract_sin_is_bounded_and_stable() {
        for i in 0..50 {
            let seed = i as f64 * 137.5;
            let v = fract_sin(seed);
            assert!((0.0..1.0).contains(&v));
            assert_eq!(v, fract_sin(seed));
        }
    }

    #[test]
    fn mul_div255_endpoints() {
        assert_eq!(mul_div255(255, 255), 255);
        assert_eq!(mul_div255(255, 0), 0);
        assert_eq!(mul_div255(128, 255), 128);
    }
}
