//! Deterministic loop export: replay the committed strokes through the same
//! scene renderer the live view uses, one frame per timestamp, and hand the
//! frames to a sink.
//!
//! Every frame is a pure function of its own index, so the frame pass can run
//! on all cores. The document is read-only throughout; exporting twice yields
//! byte-identical frames.

use rayon::prelude::*;
use tracing::info;

use crate::audio::AudioSnapshot;
use crate::encode::{FrameSink, SinkConfig};
use crate::engine::visible_strokes;
use crate::foundation::core::{Fps, Rgba8, Vec2};
use crate::foundation::error::BubbleResult;
use crate::model::Project;
use crate::motion::CameraDrift;
use crate::render::{FrameParams, SceneRenderer, StampAssets, Surface};

/// Fraction of the progress range spent rendering frames; the rest is the
/// encoder finishing up.
const FRAME_PHASE_END: f64 = 0.8;

#[derive(Clone, Copy, Debug)]
pub struct ExportOptions {
    pub fps: Fps,
    /// Opaque page color behind the bubble.
    pub background: Rgba8,
    pub show_progress_arc: bool,
    /// Stamp the corner watermark into every frame.
    pub watermark: bool,
    /// Ambient camera drift strength; zero freezes the camera.
    pub drift_intensity: f64,
    /// Render frames across all cores where the API allows it.
    pub parallel: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fps: Fps { num: 30, den: 1 },
            background: Rgba8::rgb(8, 10, 20),
            show_progress_arc: false,
            watermark: true,
            drift_intensity: 0.0,
            parallel: true,
        }
    }
}

/// Frames of one full loop plus the index of the midpoint thumbnail.
pub struct LoopFrames {
    pub frames: Vec<Surface>,
    pub thumbnail_index: usize,
}

/// Per-frame audio source for export, called with the frame's time in
/// milliseconds. `None` renders every frame with a neutral snapshot. Exports
/// stay byte-deterministic as long as the sampler is a pure function of the
/// time it is given.
pub type AudioSampler = dyn Fn(f64) -> AudioSnapshot + Sync;

/// Frame count for one loop pass: duration at the given rate, floored, and
/// never zero so even a degenerate document exports something.
pub fn total_frames(loop_duration_ms: f64, fps: Fps) -> u64 {
    ((loop_duration_ms / 1000.0 * fps.as_f64()).floor() as u64).max(1)
}

/// Render the single frame at `progress`. The animation clock is derived
/// from progress, so equal progress always means equal pixels.
pub fn render_frame(
    project: &Project,
    assets: Option<&StampAssets>,
    sampler: Option<&AudioSampler>,
    progress: f64,
    opts: &ExportOptions,
) -> BubbleResult<Surface> {
    project.validate()?;
    let mut scene = SceneRenderer::new(project.canvas, project.radius);
    let mut frame = scene.new_frame();
    render_frame_into(&mut scene, &mut frame, project, assets, sampler, progress, opts);
    Ok(frame)
}

fn render_frame_into(
    scene: &mut SceneRenderer,
    frame: &mut Surface,
    project: &Project,
    assets: Option<&StampAssets>,
    sampler: Option<&AudioSampler>,
    progress: f64,
    opts: &ExportOptions,
) {
    let progress = progress.clamp(0.0, 1.0) % 1.0;
    let time_ms = progress * project.loop_duration_ms;
    let camera = if opts.drift_intensity > 0.0 {
        CameraDrift::ambient(opts.drift_intensity, time_ms)
    } else {
        Vec2::ZERO
    };
    let audio = match sampler {
        Some(sample) => sample(time_ms),
        None => AudioSnapshot::neutral(),
    };
    let visible = visible_strokes(&project.strokes, progress);
    let params = FrameParams {
        progress,
        time_s: time_ms / 1000.0,
        audio,
        camera,
        assets,
        show_progress_arc: opts.show_progress_arc,
        watermark: opts.watermark,
    };
    scene.render_into(frame, &visible, &params);
}

/// Render one full loop into memory. The thumbnail index points at the
/// middle frame, which tends to show the drawing half-built.
pub fn render_loop_frames(
    project: &Project,
    assets: Option<&StampAssets>,
    sampler: Option<&AudioSampler>,
    opts: &ExportOptions,
) -> BubbleResult<LoopFrames> {
    project.validate()?;
    let total = total_frames(project.loop_duration_ms, opts.fps);
    info!(total, fps = opts.fps.as_f64(), "rendering loop frames");

    let render_one = |i: u64| -> Surface {
        let mut scene = SceneRenderer::new(project.canvas, project.radius);
        let mut frame = scene.new_frame();
        let progress = i as f64 / total as f64;
        render_frame_into(&mut scene, &mut frame, project, assets, sampler, progress, opts);
        frame
    };
    let frames: Vec<Surface> = if opts.parallel {
        (0..total).into_par_iter().map(render_one).collect()
    } else {
        (0..total).map(render_one).collect()
    };
    Ok(LoopFrames {
        frames,
        thumbnail_index: (total / 2) as usize,
    })
}

/// Stream one full loop into `sink`, reporting progress in `[0,1]`.
///
/// The frame pass maps onto `[0, 0.8]` and finalizing the sink onto
/// `(0.8, 1.0]`, mirroring how long each phase actually takes for video
/// targets. A failure mid-stream aborts the sink so it releases whatever it
/// acquired. Returns the number of frames pushed.
pub fn export_loop(
    project: &Project,
    assets: Option<&StampAssets>,
    sampler: Option<&AudioSampler>,
    opts: &ExportOptions,
    sink: &mut dyn FrameSink,
    mut on_progress: impl FnMut(f64),
) -> BubbleResult<u64> {
    project.validate()?;
    let total = total_frames(project.loop_duration_ms, opts.fps);
    let config = SinkConfig {
        canvas: project.canvas,
        fps: opts.fps,
        background: opts.background,
    };
    sink.begin(&config)?;
    on_progress(0.0);

    let mut scene = SceneRenderer::new(project.canvas, project.radius);
    let mut frame = scene.new_frame();
    for i in 0..total {
        let progress = i as f64 / total as f64;
        render_frame_into(&mut scene, &mut frame, project, assets, sampler, progress, opts);
        if let Err(err) = sink.push_frame(i, &frame) {
            sink.abort();
            return Err(err);
        }
        on_progress((i + 1) as f64 / total as f64 * FRAME_PHASE_END);
    }
    if let Err(err) = sink.end() {
        sink.abort();
        return Err(err);
    }
    on_progress(1.0);
    info!(total, "export finished");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_frames_floors_and_clamps() {
        let fps30 = Fps { num: 30, den: 1 };
        assert_eq!(total_frames(1000.0, fps30), 30);
        assert_eq!(total_frames(999.0, fps30), 29);
        // Never zero.
        assert_eq!(total_frames(1.0, Fps { num: 1, den: 1 }), 1);
    }
}
