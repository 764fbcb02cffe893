#![forbid(unsafe_code)]

//! bubbleloop: a looping drawing toy.
//!
//! Strokes are recorded against normalized loop time instead of wall time,
//! so a drawing replays itself forever inside a circular "bubble". The crate
//! splits into:
//!
//! - [`engine`]: the loop clock, stroke lifecycle, undo history and the
//!   time-based visibility rule.
//! - [`render`]: CPU rasterization of brushes, stamps and the bubble scene
//!   onto premultiplied RGBA8 surfaces.
//! - [`audio`]: FFT analysis of a microphone or WAV source into per-frame
//!   level snapshots that modulate rendering, never geometry.
//! - [`playback`]: the live session facade, one `tick(now_ms)` per frame.
//! - [`export`] and [`encode`]: deterministic replay of one loop into PNG
//!   sequences, in-memory frames, or MP4 via ffmpeg.
//!
//! Nothing in the crate reads a wall clock; hosts pass timestamps in, which
//! is what makes replay, export and the test suite deterministic.

pub mod audio;
pub mod encode;
pub mod engine;
pub mod export;
pub mod foundation;
pub mod model;
pub mod motion;
pub mod playback;
pub mod render;

pub use audio::{AudioCapture, AudioSnapshot, SpectrumAnalyzer};
pub use engine::{Brush, LoopClock, LoopEngine, LoopMode, Playhead, visible_strokes};
pub use export::{
    AudioSampler, ExportOptions, LoopFrames, export_loop, render_frame, render_loop_frames,
    total_frames,
};
pub use foundation::core::{Canvas, Fps, Point, Rgba8, Vec2};
pub use foundation::error::{BubbleError, BubbleResult};
pub use model::{BrushMode, LoopPoint, Project, StampKind, StampSpec, Stroke};
pub use motion::CameraDrift;
pub use playback::LivePlayback;
pub use render::{FrameParams, SceneRenderer, StampAssets, Surface};
