use crate::foundation::error::{BubbleError, BubbleResult};

pub use kurbo::{Point, Vec2};

/// Output raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> BubbleResult<Self> {
        if den == 0 {
            return Err(BubbleError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(BubbleError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }
}

/// Straight-alpha RGBA8 color as carried by the document model.
///
/// Premultiplication happens at the raster surface boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Parse `#rrggbb` / `#rrggbbaa` hex notation (the palette format used by hosts).
    pub fn from_hex(s: &str) -> BubbleResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let parse = |r: std::ops::Range<usize>| -> BubbleResult<u8> {
            u8::from_str_radix(
                hex.get(r)
                    .ok_or_else(|| BubbleError::validation(format!("bad hex color '{s}'")))?,
                16,
            )
            .map_err(|_| BubbleError::validation(format!("bad hex color '{s}'")))
        };
        match hex.len() {
            6 => Ok(Self::rgb(parse(0..2)?, parse(2..4)?, parse(4..6)?)),
            8 => Ok(Self::rgba(parse(0..2)?, parse(2..4)?, parse(4..6)?, parse(6..8)?)),
            _ => Err(BubbleError::validation(format!("bad hex color '{s}'"))),
        }
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn smooth_step(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        assert!((Fps::new(24, 1).unwrap().frame_duration_secs() - 1.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn hex_color_roundtrip() {
        let c = Rgba8::from_hex("#6366f1").unwrap();
        assert_eq!(c, Rgba8::rgb(0x63, 0x66, 0xf1));
        let c = Rgba8::from_hex("8b5cf680").unwrap();
        assert_eq!(c.a, 0x80);
        assert!(Rgba8::from_hex("#123").is_err());
    }

    #[test]
    fn smooth_step_clamps_and_eases() {
        assert_eq!(smooth_step(-1.0), 0.0);
        assert_eq!(smooth_step(2.0), 1.0);
        assert!((smooth_step(0.5) - 0.5).abs() < 1e-12);
        assert!(smooth_step(0.25) < 0.25);
    }
}
