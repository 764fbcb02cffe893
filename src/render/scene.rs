//! Whole-frame composition: background, stroke layer, bubble chrome.
//!
//! Strokes are painted onto an offscreen layer and composited into the frame
//! through a circular mask. The eraser blends with `DestOut` on that layer,
//! so it punches through ink to the background without ever touching the
//! background itself. Everything here is a pure function of
//! (strokes, progress, time, audio, camera), which is what makes export a
//! straight replay.

use crate::audio::AudioSnapshot;
use crate::foundation::core::{Canvas, Point, Rgba8, Vec2};
use crate::foundation::math::fract_sin;
use crate::model::Stroke;

use super::brush::{StrokeCtx, render_stroke};
use super::stamp::StampAssets;
use super::surface::{BlendMode, Surface};

// Bubble palette.
const BG_EDGE: Rgba8 = Rgba8::rgb(10, 12, 28);
const BG_CENTER: Rgba8 = Rgba8::rgb(34, 38, 72);
const RING_COLOR: Rgba8 = Rgba8::rgb(0x63, 0x66, 0xf1);
const ACCENT_COLOR: Rgba8 = Rgba8::rgb(0x8b, 0x5c, 0xf6);

const MICRO_BUBBLES: usize = 14;
const JETS: usize = 3;

/// Per-frame inputs that vary; the scene geometry itself lives on the
/// renderer.
pub struct FrameParams<'a> {
    /// Normalized loop progress, drives visibility upstream and the arc here.
    pub progress: f64,
    /// Animation clock in seconds.
    pub time_s: f64,
    pub audio: AudioSnapshot,
    /// Camera drift offset in pixels.
    pub camera: Vec2,
    pub assets: Option<&'a StampAssets>,
    /// Draw the loop progress arc around the bubble.
    pub show_progress_arc: bool,
    /// Stamp the corner watermark (exports carry it, the live view does not).
    pub watermark: bool,
}

impl Default for FrameParams<'_> {
    fn default() -> Self {
        Self {
            progress: 0.0,
            time_s: 0.0,
            audio: AudioSnapshot::neutral(),
            camera: Vec2::ZERO,
            assets: None,
            show_progress_arc: true,
            watermark: false,
        }
    }
}

pub struct SceneRenderer {
    canvas: Canvas,
    radius: f64,
    /// Reused stroke layer; cleared every frame.
    layer: Surface,
}

impl SceneRenderer {
    pub fn new(canvas: Canvas, radius: f64) -> Self {
        Self {
            canvas,
            radius,
            layer: Surface::new(canvas.width, canvas.height),
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn new_frame(&self) -> Surface {
        Surface::new(self.canvas.width, self.canvas.height)
    }

    /// Render one frame of already-filtered visible strokes into `out`.
    pub fn render_into(&mut self, out: &mut Surface, visible: &[Stroke], params: &FrameParams<'_>) {
        out.clear();
        let center = Point::new(
            f64::from(self.canvas.width) / 2.0,
            f64::from(self.canvas.height) / 2.0,
        ) + params.camera;

        self.draw_background(out, center);
        self.draw_strokes(visible, center, params);
        out.composite_over_in_circle(&self.layer, center, self.radius);
        self.draw_chrome(out, center, params);
        if params.show_progress_arc {
            self.draw_progress_arc(out, center, params.progress);
        }
        if params.watermark {
            self.draw_watermark(out);
        }
    }

    /// Small bubble mark in the lower-right corner, anchored to the canvas
    /// rather than the (drifting) dome.
    fn draw_watermark(&self, out: &mut Surface) {
        let p = Point::new(
            f64::from(self.canvas.width) - 14.0,
            f64::from(self.canvas.height) - 14.0,
        );
        out.stroke_arc(p, 6.0, 0.0, std::f64::consts::TAU, 1.5, RING_COLOR, 0.5, BlendMode::Over);
        let highlight = Point::new(p.x - 2.0, p.y - 2.0);
        out.fill_disc(highlight, 1.5, Rgba8::WHITE, 0.5, BlendMode::Over);
    }

    fn draw_background(&self, out: &mut Surface, center: Point) {
        out.fill_disc(center, self.radius, BG_EDGE, 1.0, BlendMode::Over);
        // Soft center lift approximates the radial gradient.
        out.fill_glow_disc(center, self.radius, BG_CENTER, 0.6, BlendMode::Over);
    }

    fn draw_strokes(&mut self, visible: &[Stroke], center: Point, params: &FrameParams<'_>) {
        self.layer.clear();
        let audio = params.audio;
        let pulse = (params.time_s * 8.0).sin() * (audio.treble * 5.0 + audio.envelope * 4.0);
        for (idx, stroke) in visible.iter().enumerate() {
            let freq = audio.frequency_for(idx);
            let width_scale = 1.0 + audio.energy * 0.35 + freq * 0.45;
            let scale = (1.0 + freq * 0.1) * (1.0 + audio.bass * 0.15);
            // Each stroke pulses along its own fixed direction so the whole
            // drawing breathes instead of translating as a block.
            let dir = fract_sin(idx as f64 * 0.618) * std::f64::consts::TAU;
            let origin = center + Vec2::new(dir.cos(), dir.sin()) * pulse;
            let ctx = StrokeCtx {
                origin,
                scale,
                time_s: params.time_s,
                audio,
                width_scale,
                assets: params.assets,
            };
            render_stroke(&mut self.layer, stroke, &ctx);
        }
    }

    /// Border glow, reactive ring, ambient micro-bubbles and audio jets.
    fn draw_chrome(&self, out: &mut Surface, center: Point, params: &FrameParams<'_>) {
        let audio = params.audio;
        let tau = std::f64::consts::TAU;

        // Outer glow halo then the crisp rim.
        out.stroke_arc(
            center,
            self.radius,
            0.0,
            tau,
            8.0 + audio.energy * 10.0,
            RING_COLOR,
            0.25,
            BlendMode::Additive,
        );
        out.stroke_arc(
            center,
            self.radius,
            0.0,
            tau,
            2.5 + audio.energy * 2.5,
            RING_COLOR,
            0.9,
            BlendMode::Over,
        );
        // Bass ring floats just outside the rim.
        if audio.bass > 0.01 {
            out.stroke_arc(
                center,
                self.radius * (1.02 + audio.bass * 0.06),
                0.0,
                tau,
                1.5,
                ACCENT_COLOR,
                0.3 + audio.bass * 0.5,
                BlendMode::Additive,
            );
        }

        // Micro-bubbles rising inside the dome.
        for i in 0..MICRO_BUBBLES {
            let pr = fract_sin(i as f64 * 12.9898);
            let pr2 = fract_sin(i as f64 * 78.233);
            let rise = (pr + params.time_s * 0.05 * (0.5 + pr2)).rem_euclid(1.0);
            let x = center.x + (params.time_s * 0.5 + i as f64).sin() * self.radius * 0.4 * pr2;
            let y = center.y + self.radius * (0.85 - 1.7 * rise);
            let r = 1.5 + pr * 3.0;
            let p = Point::new(x, y);
            // Keep fully inside the dome.
            if p.distance(center) < self.radius - r - 2.0 {
                out.fill_glow_disc(p, r, Rgba8::WHITE, (1.0 - rise) * 0.25, BlendMode::Over);
            }
        }

        // Jets: short spouts of dots pushed in from the rim when the
        // envelope is hot.
        if audio.envelope > 0.15 {
            for j in 0..JETS {
                let angle = params.time_s * 0.2 + j as f64 * tau / JETS as f64;
                for k in 0..5 {
                    let depth = 0.92 - 0.07 * k as f64;
                    let p = Point::new(
                        center.x + angle.cos() * self.radius * depth,
                        center.y + angle.sin() * self.radius * depth,
                    );
                    let alpha = audio.envelope * (0.5 - 0.08 * k as f64);
                    out.fill_glow_disc(p, 2.0 + k as f64, ACCENT_COLOR, alpha, BlendMode::Additive);
                }
            }
        }
    }

    /// Loop progress arc, clockwise from twelve o'clock.
    fn draw_progress_arc(&self, out: &mut Surface, center: Point, progress: f64) {
        let progress = progress.clamp(0.0, 1.0);
        if progress <= 0.0 {
            return;
        }
        let start = -std::f64::consts::FRAC_PI_2;
        out.stroke_arc(
            center,
            self.radius + 6.0,
            start,
            start + std::f64::consts::TAU * progress,
            3.0,
            ACCENT_COLOR,
            0.9,
            BlendMode::Over,
        );
    }
}
