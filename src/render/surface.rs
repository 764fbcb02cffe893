//! CPU raster target. Pixels are premultiplied RGBA8; premultiplication makes
//! layer compositing a pair of multiply-adds per channel and avoids fringing
//! when semi-transparent strokes overlap. Straight alpha exists only at the
//! boundaries: `Rgba8` colors coming in, `flatten_over` going out.

use crate::foundation::core::{Point, Rgba8};
use crate::foundation::math::mul_div255;

/// How a draw writes into the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-over, the default paint operator.
    Over,
    /// Saturating add; glow layers stack toward white.
    Additive,
    /// Erase: destination alpha is knocked out by source coverage and color
    /// is ignored.
    DestOut,
}

#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Premultiplied source pixel scaled for blending.
#[derive(Clone, Copy)]
struct Premul {
    r: u16,
    g: u16,
    b: u16,
    a: u16,
}

impl Premul {
    fn from_color(color: Rgba8, alpha: f64) -> Self {
        let a = (f64::from(color.a) * alpha.clamp(0.0, 1.0)).round() as u16;
        Self {
            r: mul_div255(u16::from(color.r), a) as u16,
            g: mul_div255(u16::from(color.g), a) as u16,
            b: mul_div255(u16::from(color.b), a) as u16,
            a,
        }
    }

    fn scaled(self, coverage: f64) -> Self {
        let c = coverage.clamp(0.0, 1.0);
        let s = |v: u16| (f64::from(v) * c).round() as u16;
        Self {
            r: s(self.r),
            g: s(self.g),
            b: s(self.b),
            a: s(self.a),
        }
    }
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wrap an existing premultiplied RGBA8 buffer. Length must match.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    fn blend_at(&mut self, x: u32, y: u32, src: Premul, mode: BlendMode) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &mut self.data[i..i + 4];
        match mode {
            BlendMode::Over => {
                let inv = 255 - src.a.min(255);
                px[0] = (src.r + u16::from(mul_div255(u16::from(px[0]), inv))).min(255) as u8;
                px[1] = (src.g + u16::from(mul_div255(u16::from(px[1]), inv))).min(255) as u8;
                px[2] = (src.b + u16::from(mul_div255(u16::from(px[2]), inv))).min(255) as u8;
                px[3] = (src.a + u16::from(mul_div255(u16::from(px[3]), inv))).min(255) as u8;
            }
            BlendMode::Additive => {
                px[0] = (u16::from(px[0]) + src.r).min(255) as u8;
                px[1] = (u16::from(px[1]) + src.g).min(255) as u8;
                px[2] = (u16::from(px[2]) + src.b).min(255) as u8;
                px[3] = (u16::from(px[3]) + src.a).min(255) as u8;
            }
            BlendMode::DestOut => {
                let keep = 255 - src.a.min(255);
                px[0] = mul_div255(u16::from(px[0]), keep);
                px[1] = mul_div255(u16::from(px[1]), keep);
                px[2] = mul_div255(u16::from(px[2]), keep);
                px[3] = mul_div255(u16::from(px[3]), keep);
            }
        }
    }

    fn clip_box(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<(u32, u32, u32, u32)> {
        let x0 = min_x.floor().max(0.0) as i64;
        let y0 = min_y.floor().max(0.0) as i64;
        let x1 = (max_x.ceil() as i64).min(i64::from(self.width) - 1);
        let y1 = (max_y.ceil() as i64).min(i64::from(self.height) - 1);
        if x0 > x1 || y0 > y1 || x1 < 0 || y1 < 0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    /// Antialiased filled disc with a hard edge.
    pub fn fill_disc(
        &mut self,
        center: Point,
        radius: f64,
        color: Rgba8,
        alpha: f64,
        mode: BlendMode,
    ) {
        if radius <= 0.0 || alpha <= 0.0 {
            return;
        }
        let src = Premul::from_color(color, alpha);
        let Some((x0, y0, x1, y1)) = self.clip_box(
            center.x - radius - 1.0,
            center.y - radius - 1.0,
            center.x + radius + 1.0,
            center.y + radius + 1.0,
        ) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5).distance(center);
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_at(x, y, src.scaled(coverage), mode);
                }
            }
        }
    }

    /// Disc whose alpha falls off smoothly from the center, a cheap stand-in
    /// for a radial gradient. Used for flares, sparks and ambient bubbles.
    pub fn fill_glow_disc(
        &mut self,
        center: Point,
        radius: f64,
        color: Rgba8,
        alpha: f64,
        mode: BlendMode,
    ) {
        if radius <= 0.0 || alpha <= 0.0 {
            return;
        }
        let src = Premul::from_color(color, alpha);
        let Some((x0, y0, x1, y1)) = self.clip_box(
            center.x - radius - 1.0,
            center.y - radius - 1.0,
            center.x + radius + 1.0,
            center.y + radius + 1.0,
        ) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5).distance(center);
                if d >= radius {
                    continue;
                }
                let falloff = 1.0 - d / radius;
                self.blend_at(x, y, src.scaled(falloff * falloff), mode);
            }
        }
    }

    /// Stroke an open polyline with round caps and joins.
    ///
    /// Coverage is the max over all capsule segments, so overlapping joints
    /// of a single stroke never double-blend. Semi-transparent strokes read
    /// as one shape, same as a single canvas path fill.
    pub fn stroke_polyline(
        &mut self,
        points: &[Point],
        width: f64,
        color: Rgba8,
        alpha: f64,
        mode: BlendMode,
    ) {
        if points.is_empty() || width <= 0.0 || alpha <= 0.0 {
            return;
        }
        if points.len() == 1 {
            self.fill_disc(points[0], width / 2.0, color, alpha, mode);
            return;
        }
        let half = width / 2.0;
        let src = Premul::from_color(color, alpha);
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let pad = half + 1.0;
        let Some((x0, y0, x1, y1)) =
            self.clip_box(min_x - pad, min_y - pad, max_x + pad, max_y + pad)
        else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let mut dist = f64::INFINITY;
                for seg in points.windows(2) {
                    dist = dist.min(segment_distance(p, seg[0], seg[1]));
                    if dist <= half - 0.5 {
                        break;
                    }
                }
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_at(x, y, src.scaled(coverage), mode);
                }
            }
        }
    }

    /// Stroke a circular arc (angles in radians, drawn counterclockwise from
    /// `start` to `end`) by flattening it into a polyline.
    pub fn stroke_arc(
        &mut self,
        center: Point,
        radius: f64,
        start: f64,
        end: f64,
        width: f64,
        color: Rgba8,
        alpha: f64,
        mode: BlendMode,
    ) {
        if radius <= 0.0 || end <= start {
            return;
        }
        let span = end - start;
        // One segment per ~3 pixels of arc length, min 4.
        let steps = ((span * radius / 3.0).ceil() as usize).max(4);
        let pts: Vec<Point> = (0..=steps)
            .map(|i| {
                let a = start + span * i as f64 / steps as f64;
                Point::new(center.x + a.cos() * radius, center.y + a.sin() * radius)
            })
            .collect();
        self.stroke_polyline(&pts, width, color, alpha, mode);
    }

    /// Fill a simple polygon (even-odd rule), 2x2 supersampled.
    pub fn fill_polygon(
        &mut self,
        points: &[Point],
        color: Rgba8,
        alpha: f64,
        mode: BlendMode,
    ) {
        if points.len() < 3 || alpha <= 0.0 {
            return;
        }
        let src = Premul::from_color(color, alpha);
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let Some((x0, y0, x1, y1)) = self.clip_box(min_x, min_y, max_x, max_y) else {
            return;
        };
        const SUB: [(f64, f64); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];
        for y in y0..=y1 {
            for x in x0..=x1 {
                let mut hits = 0;
                for (dx, dy) in SUB {
                    if point_in_polygon(Point::new(f64::from(x) + dx, f64::from(y) + dy), points) {
                        hits += 1;
                    }
                }
                if hits > 0 {
                    let coverage = f64::from(hits) / SUB.len() as f64;
                    self.blend_at(x, y, src.scaled(coverage), mode);
                }
            }
        }
    }

    /// Draw another surface scaled to `target_width` (height keeps aspect),
    /// rotated around its center, centered at `center`. Nearest sampling.
    pub fn draw_surface(
        &mut self,
        img: &Surface,
        center: Point,
        target_width: f64,
        rotation: f64,
        alpha: f64,
        mode: BlendMode,
    ) {
        if img.width == 0 || img.height == 0 || target_width <= 0.0 || alpha <= 0.0 {
            return;
        }
        let scale = target_width / f64::from(img.width);
        let target_h = f64::from(img.height) * scale;
        let half_diag = (target_width * target_width + target_h * target_h).sqrt() / 2.0;
        let Some((x0, y0, x1, y1)) = self.clip_box(
            center.x - half_diag,
            center.y - half_diag,
            center.x + half_diag,
            center.y + half_diag,
        ) else {
            return;
        };
        let (sin, cos) = rotation.sin_cos();
        let alpha = alpha.clamp(0.0, 1.0);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = f64::from(x) + 0.5 - center.x;
                let dy = f64::from(y) + 0.5 - center.y;
                // Inverse-rotate into image space.
                let ix = (dx * cos + dy * sin) / scale + f64::from(img.width) / 2.0;
                let iy = (-dx * sin + dy * cos) / scale + f64::from(img.height) / 2.0;
                if ix < 0.0 || iy < 0.0 || ix >= f64::from(img.width) || iy >= f64::from(img.height)
                {
                    continue;
                }
                let si = (iy as usize * img.width as usize + ix as usize) * 4;
                let s = &img.data[si..si + 4];
                if s[3] == 0 {
                    continue;
                }
                let scale_a = |v: u8| (f64::from(v) * alpha).round() as u16;
                let src = Premul {
                    r: scale_a(s[0]),
                    g: scale_a(s[1]),
                    b: scale_a(s[2]),
                    a: scale_a(s[3]),
                };
                self.blend_at(x, y, src, mode);
            }
        }
    }

    /// Composite `src` over the whole surface.
    pub fn composite_over(&mut self, src: &Surface) {
        debug_assert_eq!((self.width, self.height), (src.width, src.height));
        for (dst, s) in self.data.chunks_exact_mut(4).zip(src.data.chunks_exact(4)) {
            let inv = 255 - u16::from(s[3]);
            for c in 0..4 {
                dst[c] =
                    (u16::from(s[c]) + u16::from(mul_div255(u16::from(dst[c]), inv))).min(255) as u8;
            }
        }
    }

    /// Composite `src` over the surface, masked to an antialiased circle.
    /// Everything in `src` outside the circle is discarded.
    pub fn composite_over_in_circle(&mut self, src: &Surface, center: Point, radius: f64) {
        debug_assert_eq!((self.width, self.height), (src.width, src.height));
        if radius <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip_box(
            center.x - radius - 1.0,
            center.y - radius - 1.0,
            center.x + radius + 1.0,
            center.y + radius + 1.0,
        ) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5).distance(center);
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage == 0.0 {
                    continue;
                }
                let i = (y as usize * self.width as usize + x as usize) * 4;
                let s = &src.data[i..i + 4];
                if s[3] == 0 {
                    continue;
                }
                let masked = |v: u8| (f64::from(v) * coverage).round() as u16;
                let sp = Premul {
                    r: masked(s[0]),
                    g: masked(s[1]),
                    b: masked(s[2]),
                    a: masked(s[3]),
                };
                self.blend_at(x, y, sp, BlendMode::Over);
            }
        }
    }

    /// Flatten onto an opaque background, returning straight RGBA8 rows for
    /// encoders.
    pub fn flatten_over(&self, bg: Rgba8) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let inv = 255 - u16::from(px[3]);
            out.push((u16::from(px[0]) + u16::from(mul_div255(u16::from(bg.r), inv))).min(255) as u8);
            out.push((u16::from(px[1]) + u16::from(mul_div255(u16::from(bg.g), inv))).min(255) as u8);
            out.push((u16::from(px[2]) + u16::from(mul_div255(u16::from(bg.b), inv))).min(255) as u8);
            out.push(255);
        }
        out
    }

    /// Premultiplied pixel at (x, y); test helper and debugging aid.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (pi, pj) = (poly[i], poly[j]);
        if ((pi.y > p.y) != (pj.y > p.y))
            && p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
