//! Stamp artwork: built-in glyphs, custom text, and prepared images.
//!
//! Glyphs are rasterized into small premultiplied scratch surfaces and placed
//! along the stroke with `draw_surface`, so rotation and the crescent cutout
//! never touch pixels already on the layer. Text and images are host-supplied
//! through `StampAssets`; a text stamp with no font loaded, or an image stamp
//! with no prepared image, draws nothing rather than failing.

use std::collections::HashMap;

use crate::foundation::core::{Point, Rgba8};
use crate::foundation::error::{BubbleError, BubbleResult};
use crate::model::StampKind;

use super::surface::{BlendMode, Surface};

/// Fonts and prepared stamp images, owned by the host session.
#[derive(Default)]
pub struct StampAssets {
    font: Option<fontdue::Font>,
    /// Alpha masks keyed by the id carried in `StampSpec::image`.
    images: HashMap<String, AlphaMask>,
}

struct AlphaMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

/// Prepared-image working resolution. Stamps are small; 256 is plenty.
const IMAGE_MASK_SIZE: u32 = 256;

impl StampAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Load a TTF/OTF font for text stamps.
    pub fn set_font(&mut self, bytes: &[u8]) -> BubbleResult<()> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| BubbleError::validation(format!("font load: {e}")))?;
        self.font = Some(font);
        Ok(())
    }

    /// Prepare an image for stamping: downscale, convert to a darkness mask
    /// (dark areas of the photo become the stamp ink) and clip to a circle.
    pub fn prepare_image(&mut self, key: impl Into<String>, bytes: &[u8]) -> BubbleResult<()> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| BubbleError::validation(format!("image decode: {e}")))?
            .resize_exact(
                IMAGE_MASK_SIZE,
                IMAGE_MASK_SIZE,
                image::imageops::FilterType::Triangle,
            )
            .to_luma8();
        let side = IMAGE_MASK_SIZE;
        let center = f64::from(side) / 2.0;
        let radius = center - 1.0;
        let mut alpha = Vec::with_capacity((side * side) as usize);
        for y in 0..side {
            for x in 0..side {
                let d = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5)
                    .distance(Point::new(center, center));
                if d > radius {
                    alpha.push(0);
                    continue;
                }
                // Photocopy contrast: push luminance toward the extremes,
                // then invert so dark pixels carry the ink.
                let l = f64::from(img.get_pixel(x, y)[0]) / 255.0;
                let boosted = ((l - 0.5) * 1.8 + 0.5).clamp(0.0, 1.0);
                let rim = ((radius - d) / 2.0).clamp(0.0, 1.0);
                alpha.push(((1.0 - boosted) * rim * 255.0).round() as u8);
            }
        }
        self.images.insert(
            key.into(),
            AlphaMask {
                width: side,
                height: side,
                alpha,
            },
        );
        Ok(())
    }

    pub fn has_image(&self, key: &str) -> bool {
        self.images.contains_key(key)
    }

    /// Colored surface for a prepared image, or None when the key is unknown.
    pub fn image_surface(&self, key: &str, color: Rgba8) -> Option<Surface> {
        let mask = self.images.get(key)?;
        Some(mask_to_surface(
            mask.width,
            mask.height,
            &mask.alpha,
            color,
        ))
    }

    /// Rasterize a line of text at `px` into a colored surface. None when no
    /// font is loaded or the text has no visible glyphs.
    pub fn text_surface(&self, text: &str, px: f32, color: Rgba8) -> Option<Surface> {
        let font = self.font.as_ref()?;
        let px = px.max(4.0);

        struct Placed {
            x: i32,
            y: i32,
            w: usize,
            h: usize,
            coverage: Vec<u8>,
        }
        let mut placed = Vec::new();
        let mut pen_x = 0.0f32;
        let (mut min_y, mut max_y) = (i32::MAX, i32::MIN);
        for ch in text.chars() {
            let (metrics, coverage) = font.rasterize(ch, px);
            if metrics.width > 0 && metrics.height > 0 {
                let x = (pen_x + metrics.xmin as f32) as i32;
                // fontdue's ymin is from the baseline, y-up.
                let y = -(metrics.ymin + metrics.height as i32);
                min_y = min_y.min(y);
                max_y = max_y.max(y + metrics.height as i32);
                placed.push(Placed {
                    x,
                    y,
                    w: metrics.width,
                    h: metrics.height,
                    coverage,
                });
            }
            pen_x += metrics.advance_width;
        }
        if placed.is_empty() {
            return None;
        }
        let width = pen_x.ceil().max(1.0) as u32;
        let height = (max_y - min_y).max(1) as u32;
        let mut alpha = vec![0u8; (width * height) as usize];
        for g in &placed {
            for row in 0..g.h {
                for col in 0..g.w {
                    let tx = g.x + col as i32;
                    let ty = g.y - min_y + row as i32;
                    if tx < 0 || ty < 0 || tx as u32 >= width || ty as u32 >= height {
                        continue;
                    }
                    let dst = &mut alpha[(ty as u32 * width + tx as u32) as usize];
                    *dst = (*dst).max(g.coverage[row * g.w + col]);
                }
            }
        }
        Some(mask_to_surface(width, height, &alpha, color))
    }
}

fn mask_to_surface(width: u32, height: u32, alpha: &[u8], color: Rgba8) -> Surface {
    use crate::foundation::math::mul_div255;
    let opacity = u16::from(color.a);
    let mut data = Vec::with_capacity(alpha.len() * 4);
    for &a in alpha {
        let a = mul_div255(u16::from(a), opacity);
        data.push(mul_div255(u16::from(color.r), u16::from(a)));
        data.push(mul_div255(u16::from(color.g), u16::from(a)));
        data.push(mul_div255(u16::from(color.b), u16::from(a)));
        data.push(a);
    }
    Surface::from_premul(width, height, data)
}

/// Rasterize a built-in glyph at `size` pixels square. `Text` and `Image`
/// are not glyphs; callers route those through `StampAssets`.
pub fn glyph_surface(kind: StampKind, color: Rgba8, size: f64) -> Surface {
    let side = size.ceil().max(4.0) as u32;
    let mut s = Surface::new(side, side);
    let c = Point::new(f64::from(side) / 2.0, f64::from(side) / 2.0);
    let r = f64::from(side) / 2.0 * 0.9;
    match kind {
        StampKind::Star => {
            s.fill_polygon(&star_points(c, r, 5, 0.5), color, 1.0, BlendMode::Over);
        }
        StampKind::Sparkle => {
            s.fill_polygon(&star_points(c, r, 4, 0.22), color, 1.0, BlendMode::Over);
        }
        StampKind::Heart => {
            s.fill_polygon(&heart_points(c, r), color, 1.0, BlendMode::Over);
        }
        StampKind::Flower => {
            for i in 0..6 {
                let a = std::f64::consts::TAU * f64::from(i) / 6.0;
                let petal = Point::new(c.x + a.cos() * r * 0.55, c.y + a.sin() * r * 0.55);
                s.fill_disc(petal, r * 0.38, color, 1.0, BlendMode::Over);
            }
            s.fill_disc(c, r * 0.3, Rgba8::WHITE, 0.9, BlendMode::Over);
        }
        StampKind::Bubble => {
            s.fill_disc(c, r, color, 0.18, BlendMode::Over);
            s.stroke_arc(
                c,
                r * 0.94,
                0.0,
                std::f64::consts::TAU,
                r * 0.12,
                color,
                1.0,
                BlendMode::Over,
            );
            let highlight = Point::new(c.x - r * 0.35, c.y - r * 0.35);
            s.fill_disc(highlight, r * 0.16, Rgba8::WHITE, 0.8, BlendMode::Over);
        }
        StampKind::Moon => {
            s.fill_disc(c, r, color, 1.0, BlendMode::Over);
            let bite = Point::new(c.x + r * 0.45, c.y - r * 0.2);
            s.fill_disc(bite, r * 0.85, color, 1.0, BlendMode::DestOut);
        }
        StampKind::Text | StampKind::Image => {}
    }
    s
}

fn star_points(center: Point, radius: f64, spikes: u32, inner_ratio: f64) -> Vec<Point> {
    let n = spikes * 2;
    (0..n)
        .map(|i| {
            let r = if i % 2 == 0 {
                radius
            } else {
                radius * inner_ratio
            };
            let a = std::f64::consts::TAU * f64::from(i) / f64::from(n) - std::f64::consts::FRAC_PI_2;
            Point::new(center.x + a.cos() * r, center.y + a.sin() * r)
        })
        .collect()
}

fn heart_points(center: Point, radius: f64) -> Vec<Point> {
    // Classic parametric heart, normalized to the glyph box. Canvas y grows
    // downward, so the curve's y is negated.
    (0..48)
        .map(|i| {
            let t = std::f64::consts::TAU * f64::from(i) / 48.0;
            let x = 16.0 * t.sin().powi(3);
            let y = 13.0 * t.cos()
                - 5.0 * (2.0 * t).cos()
                - 2.0 * (3.0 * t).cos()
                - (4.0 * t).cos();
            Point::new(center.x + x / 17.0 * radius, center.y - y / 17.0 * radius)
        })
        .collect()
}
