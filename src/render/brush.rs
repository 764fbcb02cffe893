//! Per-stroke renderers. One entry point, `render_stroke`, dispatches on the
//! brush mode; the match is exhaustive so a new mode cannot ship without a
//! renderer.
//!
//! Renderers are pure with respect to the document: they read a `Stroke` and
//! paint pixels. Audio reactivity modulates jitter, glow and particle motion
//! at paint time and never feeds back into the stored points. All randomness
//! comes from `fract_sin` over stable indices, so a frame rendered twice with
//! the same context is bit-identical.

use crate::audio::AudioSnapshot;
use crate::foundation::core::{Point, Rgba8, Vec2};
use crate::foundation::math::fract_sin;
use crate::model::{BrushMode, StampKind, Stroke};

use super::blur::blur_surface;
use super::stamp::{StampAssets, glyph_surface};
use super::surface::{BlendMode, Surface};

/// Everything a stroke renderer needs beyond the stroke itself.
pub struct StrokeCtx<'a> {
    /// Canvas-space position of the drawing origin (stroke points are
    /// relative to it).
    pub origin: Point,
    /// Uniform scale applied to stroke geometry around the origin.
    pub scale: f64,
    /// Animation time in seconds; drives jitter waves, flares and particles.
    pub time_s: f64,
    /// Current audio levels. `AudioSnapshot::neutral()` disables reactivity.
    pub audio: AudioSnapshot,
    /// Extra width multiplier from the scene's audio boost.
    pub width_scale: f64,
    /// Fonts and prepared images for text/image stamps.
    pub assets: Option<&'a StampAssets>,
}

impl StrokeCtx<'_> {
    fn place(&self, x: f64, y: f64) -> Point {
        self.origin + Vec2::new(x, y) * self.scale
    }
}

/// Paint one stroke onto `layer`. Strokes with no points are a no-op; the
/// visibility pass upstream never produces them, but direct callers might.
pub fn render_stroke(layer: &mut Surface, stroke: &Stroke, ctx: &StrokeCtx<'_>) {
    if stroke.points.is_empty() {
        return;
    }
    let points: Vec<Point> = stroke
        .points
        .iter()
        .map(|p| ctx.place(p.x, p.y))
        .collect();
    match stroke.mode {
        BrushMode::Pencil => render_pencil(layer, stroke, &points, ctx),
        BrushMode::Glow => render_glow(layer, stroke, &points, ctx),
        BrushMode::Particles => render_particles(layer, stroke, &points, ctx),
        BrushMode::Stamp => render_stamps(layer, stroke, &points, ctx),
        BrushMode::Eraser => {
            let width = stroke.width * ctx.width_scale;
            layer.stroke_polyline(&points, width, Rgba8::WHITE, stroke.opacity, BlendMode::DestOut);
        }
    }
}

/// Plain line with an audio-driven perpendicular wobble. The wobble is damped
/// by the distance covered since the previous point, so a fast drag (widely
/// spaced points) stays steadier than a slow one.
fn render_pencil(layer: &mut Surface, stroke: &Stroke, points: &[Point], ctx: &StrokeCtx<'_>) {
    let width = stroke.width * ctx.width_scale;
    let strength = (ctx.audio.volume * 0.6 + ctx.audio.treble * 0.9).min(1.0);
    let base_jitter = width * 0.2 * strength;

    let jittered: Vec<Point> = if base_jitter > 0.0 && points.len() > 1 {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let normal = perpendicular(points, i);
                let travelled = if i == 0 { 0.0 } else { p.distance(points[i - 1]) };
                let damping = 1.0 / (1.0 + travelled * 0.35);
                let wave = (ctx.time_s * 6.0 + i as f64 * 0.6).sin();
                p + normal * (base_jitter * damping * wave)
            })
            .collect()
    } else {
        points.to_vec()
    };
    layer.stroke_polyline(&jittered, width, stroke.color, stroke.opacity, BlendMode::Over);
}

/// Four additive passes from wide-and-dim to tight-and-bright, plus pulsing
/// flares and treble-gated sparks along the path.
fn render_glow(layer: &mut Surface, stroke: &Stroke, points: &[Point], ctx: &StrokeCtx<'_>) {
    let width = stroke.width * ctx.width_scale;
    // (blur radius, layer alpha, line width)
    let passes: [(f64, f64, f64); 4] = [
        (width * 2.0, 0.1, width * 3.0),
        (width, 0.2, width * 2.0),
        (width * 0.5, 0.4, width * 1.5),
        (0.0, 1.0, width),
    ];
    for &(blur, alpha, line_width) in &passes {
        let mut scratch = Surface::new(layer.width(), layer.height());
        scratch.stroke_polyline(
            points,
            line_width,
            stroke.color,
            stroke.opacity * alpha,
            BlendMode::Over,
        );
        blur_surface(&mut scratch, blur);
        layer.composite_over(&scratch);
    }

    let path_len = polyline_length(points);
    let fast_lfo = 0.5 + 0.5 * (ctx.time_s * 12.0).sin();

    // Flares: bright pulsing nodes spaced along the path.
    let flare_spacing = (path_len / 18.0).max(width);
    for (i, p) in sample_along(points, flare_spacing).into_iter().enumerate() {
        let r = width * (0.8 + 0.8 * fast_lfo) * (0.7 + 0.6 * fract_sin(i as f64 * 12.9898));
        layer.fill_glow_disc(p, r, stroke.color, stroke.opacity * 0.5, BlendMode::Additive);
        layer.fill_glow_disc(p, r * 0.4, Rgba8::WHITE, stroke.opacity * 0.6, BlendMode::Additive);
    }

    // Sparks: tiny white embers thrown off the path, count rising with treble.
    let spark_spacing = (path_len / 14.0).max(width);
    let sparks_per_node = (2.0 + ctx.audio.treble * 10.0) as usize;
    for (i, p) in sample_along(points, spark_spacing).into_iter().enumerate() {
        for k in 0..sparks_per_node {
            let seed = (i * 31 + k) as f64;
            let angle = fract_sin(seed * 78.233) * std::f64::consts::TAU + ctx.time_s * 2.0;
            let dist = width * (0.8 + 2.2 * fract_sin(seed * 12.9898));
            let pos = p + Vec2::new(angle.cos(), angle.sin()) * dist;
            let alpha = stroke.opacity * (0.3 + 0.5 * fract_sin(seed * 3.7));
            layer.fill_glow_disc(pos, width * 0.25, Rgba8::WHITE, alpha, BlendMode::Additive);
        }
    }
}

/// Drifting motes around each path point. Every particle eases between
/// successive hashed target offsets, so motion is continuous and never snaps
/// when a target is reached. Bass blows the drift radius outward.
fn render_particles(layer: &mut Surface, stroke: &Stroke, points: &[Point], ctx: &StrokeCtx<'_>) {
    let width = stroke.width * ctx.width_scale;
    let slow_time = ctx.time_s * 0.35;
    let bass_boost = ((ctx.audio.volume - 0.35).max(0.0) * 1.6).min(1.0);

    for (i, &anchor) in points.iter().enumerate() {
        for k in 0..3usize {
            let seed = (i * 3 + k) as f64;
            let pr = fract_sin(seed * 12.9898);
            let max_offset = width * 0.9 * (0.7 + pr * 0.3) + width * 1.4 * bass_boost;
            // Each particle walks its own timeline, desynced by pr. The leg
            // ending at target n starts from target n-1's offset, which keeps
            // the path continuous across legs.
            let walk = slow_time + pr;
            let leg = walk.floor();
            let ease = crate::foundation::core::smooth_step(walk - leg);
            let from = target_offset(seed + leg * 101.0);
            let to = target_offset(seed + (leg + 1.0) * 101.0);
            let rel = from + (to - from) * ease;
            let dist = rel.hypot() * max_offset;
            let pos = anchor + rel * max_offset;
            let alpha = (0.25 + (1.0 - dist / max_offset.max(f64::EPSILON)) * 0.6)
                .clamp(0.0, 1.0)
                * stroke.opacity;
            let radius = width * 0.18 * (0.6 + pr * 0.8);
            layer.fill_glow_disc(pos, radius.max(0.75), stroke.color, alpha, BlendMode::Over);
        }
    }
}

/// Hashed offset inside the unit disc a particle drifts toward.
fn target_offset(seed: f64) -> Vec2 {
    let angle = fract_sin(seed * 78.233) * std::f64::consts::TAU;
    let dist = 0.35 + 0.65 * fract_sin(seed * 12.9898);
    Vec2::new(angle.cos(), angle.sin()) * dist
}

/// Repeated artwork along the path: built-in glyphs, rasterized text, or a
/// prepared image mask. Missing assets degrade to drawing nothing.
fn render_stamps(layer: &mut Surface, stroke: &Stroke, points: &[Point], ctx: &StrokeCtx<'_>) {
    let Some(spec) = stroke.stamp.as_ref() else {
        return;
    };
    let width = stroke.width * ctx.width_scale;
    let (artwork, rotation_intensity) = match spec.kind {
        StampKind::Text => {
            let Some(text) = spec.text.as_deref().filter(|t| !t.is_empty()) else {
                return;
            };
            let Some(surface) = ctx
                .assets
                .and_then(|a| a.text_surface(text, (width * 2.0) as f32, stroke.color))
            else {
                return;
            };
            (surface, 0.15)
        }
        StampKind::Image => {
            let Some(surface) = spec
                .image
                .as_deref()
                .and_then(|key| ctx.assets.and_then(|a| a.image_surface(key, stroke.color)))
            else {
                return;
            };
            (surface, 0.2)
        }
        glyph => (glyph_surface(glyph, stroke.color, width * 3.0), 0.3),
    };
    let target_width = match spec.kind {
        StampKind::Image => width * 5.2,
        StampKind::Text => {
            f64::from(artwork.width())
        }
        _ => width * 3.0,
    };

    // A single point is one upright stamp.
    if points.len() == 1 {
        layer.draw_surface(&artwork, points[0], target_width, 0.0, stroke.opacity, BlendMode::Over);
        return;
    }

    let spacing = match spec.kind {
        StampKind::Text | StampKind::Image => (width * 3.75).max(30.0),
        _ => (width * 2.5).max(20.0),
    };
    let mut placed = sample_along(points, spacing);
    // The path endpoints always get a stamp.
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if placed.first() != Some(&first) {
            placed.insert(0, first);
        }
        if placed.last() != Some(&last) {
            placed.push(last);
        }
    }
    for (i, p) in placed.into_iter().enumerate() {
        let rotation =
            (fract_sin(i as f64 * 12.9898) - 0.5) * 2.0 * rotation_intensity * std::f64::consts::PI;
        layer.draw_surface(&artwork, p, target_width, rotation, stroke.opacity, BlendMode::Over);
    }
}

/// Unit normal at point `i`, perpendicular to the local path direction.
fn perpendicular(points: &[Point], i: usize) -> Vec2 {
    let prev = points[i.saturating_sub(1)];
    let next = points[(i + 1).min(points.len() - 1)];
    let d = next - prev;
    let len = d.hypot();
    if len == 0.0 {
        Vec2::new(0.0, 1.0)
    } else {
        Vec2::new(-d.y / len, d.x / len)
    }
}

fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|s| s[0].distance(s[1])).sum()
}

/// Points spaced `spacing` apart along the path, starting at its head.
fn sample_along(points: &[Point], spacing: f64) -> Vec<Point> {
    if points.is_empty() || spacing <= 0.0 {
        return Vec::new();
    }
    let mut out = vec![points[0]];
    let mut carried = 0.0;
    for seg in points.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        let len = a.distance(b);
        if len == 0.0 {
            continue;
        }
        let mut travelled = spacing - carried;
        while travelled <= len {
            let t = travelled / len;
            out.push(a + (b - a) * t);
            travelled += spacing;
        }
        carried = (carried + len) % spacing;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LoopPoint, StampSpec};

    fn ctx<'a>() -> StrokeCtx<'a> {
        StrokeCtx {
            origin: Point::new(64.0, 64.0),
            scale: 1.0,
            time_s: 0.5,
            audio: AudioSnapshot::neutral(),
            width_scale: 1.0,
            assets: None,
        }
    }

    fn stroke(mode: BrushMode) -> Stroke {
        Stroke {
            points: vec![
                LoopPoint::new(-20.0, 0.0, 0.1),
                LoopPoint::new(0.0, 10.0, 0.2),
                LoopPoint::new(20.0, 0.0, 0.3),
            ],
            color: Rgba8::rgb(255, 0, 128),
            width: 6.0,
            opacity: 1.0,
            mode,
            stamp: None,
        }
    }

    fn alpha_sum(s: &Surface) -> u64 {
        s.data().chunks_exact(4).map(|px| u64::from(px[3])).sum()
    }

    fn total_diff(a: &Surface, b: &Surface) -> u64 {
        a.data()
            .iter()
            .zip(b.data())
            .map(|(&x, &y)| (i64::from(x) - i64::from(y)).unsigned_abs())
            .sum()
    }

    fn region_diff(a: &Surface, b: &Surface, x0: u32, x1: u32) -> u64 {
        let mut sum = 0u64;
        for y in 0..a.height() {
            for x in x0..x1 {
                let (pa, pb) = (a.pixel(x, y), b.pixel(x, y));
                for c in 0..4 {
                    sum += (i64::from(pa[c]) - i64::from(pb[c])).unsigned_abs();
                }
            }
        }
        sum
    }

    #[test]
    fn every_mode_is_total() {
        for mode in [
            BrushMode::Pencil,
            BrushMode::Glow,
            BrushMode::Particles,
            BrushMode::Eraser,
        ] {
            let mut layer = Surface::new(128, 128);
            render_stroke(&mut layer, &stroke(mode), &ctx());
        }
        // Stamp without a spec draws nothing but does not panic.
        let mut layer = Surface::new(128, 128);
        render_stroke(&mut layer, &stroke(BrushMode::Stamp), &ctx());
        assert_eq!(alpha_sum(&layer), 0);
    }

    #[test]
    fn empty_stroke_is_noop() {
        let mut layer = Surface::new(32, 32);
        let mut s = stroke(BrushMode::Pencil);
        s.points.clear();
        render_stroke(&mut layer, &s, &ctx());
        assert_eq!(alpha_sum(&layer), 0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let s = stroke(BrushMode::Glow);
        let mut a = Surface::new(128, 128);
        let mut b = Surface::new(128, 128);
        render_stroke(&mut a, &s, &ctx());
        render_stroke(&mut b, &s, &ctx());
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn renderer_never_mutates_the_stroke() {
        let s = stroke(BrushMode::Particles);
        let before = s.clone();
        let mut layer = Surface::new(128, 128);
        render_stroke(&mut layer, &s, &ctx());
        assert_eq!(s, before);
    }

    #[test]
    fn audio_changes_pixels_for_pencil() {
        let s = stroke(BrushMode::Pencil);
        let mut quiet = Surface::new(128, 128);
        render_stroke(&mut quiet, &s, &ctx());
        let mut loud_ctx = ctx();
        loud_ctx.audio.volume = 0.9;
        loud_ctx.audio.treble = 0.9;
        let mut loud = Surface::new(128, 128);
        render_stroke(&mut loud, &s, &loud_ctx);
        assert_ne!(quiet.data(), loud.data());
    }

    #[test]
    fn pencil_jitter_is_uniform_along_a_steady_stroke() {
        // 40 evenly spaced points: every point covers the same distance since
        // its predecessor, so every point gets the same speed damping and the
        // head wobbles about as much as the tail.
        let mut s = stroke(BrushMode::Pencil);
        s.points = (0..40)
            .map(|i| LoopPoint::new(i as f64 * 4.0, 0.0, 0.1))
            .collect();
        let mut c = ctx();
        c.origin = Point::new(20.0, 32.0);
        c.audio.volume = 0.9;
        c.audio.treble = 0.9;

        let mut a = Surface::new(200, 64);
        c.time_s = 0.2;
        render_stroke(&mut a, &s, &c);
        let mut b = Surface::new(200, 64);
        c.time_s = 0.45;
        render_stroke(&mut b, &s, &c);

        let head = region_diff(&a, &b, 16, 52);
        let tail = region_diff(&a, &b, 148, 184);
        assert!(head > 0 && tail > 0);
        assert!(head * 3 > tail, "head {head} tail {tail}");
        assert!(tail * 3 > head, "head {head} tail {tail}");
    }

    #[test]
    fn pencil_jitter_fades_on_fast_strokes() {
        // Same path length drawn with 4x the point spacing wobbles less.
        let render_spaced = |spacing: f64, count: usize, time_s: f64| {
            let mut s = stroke(BrushMode::Pencil);
            s.points = (0..count)
                .map(|i| LoopPoint::new(i as f64 * spacing, 0.0, 0.1))
                .collect();
            let mut c = ctx();
            c.origin = Point::new(20.0, 32.0);
            c.time_s = time_s;
            c.audio.volume = 0.9;
            c.audio.treble = 0.9;
            let mut layer = Surface::new(200, 64);
            render_stroke(&mut layer, &s, &c);
            layer
        };
        let slow = total_diff(&render_spaced(2.0, 61, 0.2), &render_spaced(2.0, 61, 0.45));
        let fast = total_diff(&render_spaced(8.0, 16, 0.2), &render_spaced(8.0, 16, 0.45));
        assert!(fast < slow, "fast {fast} slow {slow}");
    }

    #[test]
    fn particles_drift_smoothly_with_time() {
        let s = stroke(BrushMode::Particles);
        let render_at = |t: f64| {
            let mut c = ctx();
            c.time_s = t;
            let mut layer = Surface::new(128, 128);
            render_stroke(&mut layer, &s, &c);
            layer
        };
        let base = render_at(1.0);
        let small = total_diff(&base, &render_at(1.02));
        let large = total_diff(&base, &render_at(2.4));
        assert!(large > 0);
        // Eased target-to-target motion: a tiny time step barely moves the
        // motes, a large one moves them a lot.
        assert!(small * 4 < large, "small {small} large {large}");
    }

    #[test]
    fn particles_stay_near_their_anchors() {
        // With quiet audio the drift radius tops out at width * 0.9 and the
        // glow discs reach under 2px further.
        let s = stroke(BrushMode::Particles);
        let anchors = [
            Point::new(44.0, 64.0),
            Point::new(64.0, 74.0),
            Point::new(84.0, 64.0),
        ];
        for t in [0.0, 0.7, 1.3, 2.9] {
            let mut c = ctx();
            c.time_s = t;
            let mut layer = Surface::new(128, 128);
            render_stroke(&mut layer, &s, &c);
            for y in 0..layer.height() {
                for x in 0..layer.width() {
                    if layer.pixel(x, y)[3] == 0 {
                        continue;
                    }
                    let p = Point::new(f64::from(x), f64::from(y));
                    let near = anchors.iter().any(|a| a.distance(p) < 8.0);
                    assert!(near, "painted pixel ({x},{y}) far from every anchor at t={t}");
                }
            }
        }
    }

    #[test]
    fn glyph_stamp_paints() {
        let mut s = stroke(BrushMode::Stamp);
        s.stamp = Some(StampSpec::glyph(StampKind::Star));
        let mut layer = Surface::new(128, 128);
        render_stroke(&mut layer, &s, &ctx());
        assert!(alpha_sum(&layer) > 0);
    }

    #[test]
    fn single_point_stamp_is_one_upright_stamp() {
        let mut s = stroke(BrushMode::Stamp);
        s.stamp = Some(StampSpec::glyph(StampKind::Heart));
        s.points.truncate(1);
        let mut layer = Surface::new(128, 128);
        render_stroke(&mut layer, &s, &ctx());
        assert!(alpha_sum(&layer) > 0);
    }

    #[test]
    fn text_stamp_without_font_draws_nothing() {
        let mut s = stroke(BrushMode::Stamp);
        s.stamp = Some(StampSpec {
            kind: StampKind::Text,
            text: Some("hi".into()),
            font: None,
            image: None,
        });
        let mut layer = Surface::new(128, 128);
        render_stroke(&mut layer, &s, &ctx());
        assert_eq!(alpha_sum(&layer), 0);
    }

    #[test]
    fn eraser_knocks_out_layer_alpha() {
        let mut layer = Surface::new(128, 128);
        render_stroke(&mut layer, &stroke(BrushMode::Pencil), &ctx());
        let before = alpha_sum(&layer);
        let mut eraser = stroke(BrushMode::Eraser);
        eraser.width = 20.0;
        render_stroke(&mut layer, &eraser, &ctx());
        assert!(alpha_sum(&layer) < before);
    }

    #[test]
    fn sample_along_spaces_points() {
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let samples = sample_along(&pts, 25.0);
        assert_eq!(samples.len(), 5);
        assert!((samples[2].x - 50.0).abs() < 1e-9);
    }
}
