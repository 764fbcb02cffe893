mod clock;
mod history;
mod visibility;

pub use clock::{LoopClock, LoopMode, Playhead};
pub use history::History;
pub use visibility::visible_strokes;

use crate::model::{BrushMode, LoopPoint, StampSpec, Stroke};
use crate::foundation::core::Rgba8;

/// Brush settings applied to the next stroke.
#[derive(Clone, Debug)]
pub struct Brush {
    pub color: Rgba8,
    pub width: f64,
    pub opacity: f64,
    pub mode: BrushMode,
    pub stamp: Option<StampSpec>,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: Rgba8::rgb(0x63, 0x66, 0xf1),
            width: 8.0,
            opacity: 1.0,
            mode: BrushMode::Pencil,
            stamp: None,
        }
    }
}

/// System of record for drawing state: the committed stroke collection, the
/// in-progress stroke, undo history and the loop clock.
///
/// Every operation is a total function over the engine state: misuse (ending a
/// stroke that was never started, undoing past the first snapshot, seeking out
/// of range) degrades to a no-op instead of failing. Time never comes from a
/// global clock; callers pass the host timestamp `now_ms` so replay and tests
/// are deterministic.
pub struct LoopEngine {
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
    history: History,
    clock: LoopClock,
    playing: bool,
}

/// Fixed seek increment for step_forward/step_backward: 2% of the loop.
const STEP_FRACTION: f64 = 0.02;

impl LoopEngine {
    pub fn new(now_ms: f64, loop_duration_ms: f64) -> Self {
        Self {
            strokes: Vec::new(),
            current: None,
            history: History::new(),
            clock: LoopClock::new(now_ms, loop_duration_ms),
            playing: true,
        }
    }

    /// Rehydrate an engine from a persisted stroke collection.
    pub fn with_strokes(now_ms: f64, loop_duration_ms: f64, strokes: Vec<Stroke>) -> Self {
        let mut engine = Self::new(now_ms, loop_duration_ms);
        engine.history.push(strokes.clone());
        engine.strokes = strokes;
        engine
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn current_stroke(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    pub fn clock(&self) -> &LoopClock {
        &self.clock
    }

    pub fn loop_duration_ms(&self) -> f64 {
        self.clock.duration_ms()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Normalized loop time in `[0,1)` (or `[0,1]` in ping-pong) at `now_ms`.
    pub fn normalized_time(&self, now_ms: f64) -> f64 {
        self.clock.playhead(now_ms).progress
    }

    /// Begin a new in-progress stroke with a single point timestamped at the
    /// current loop time. `pressure` is the stylus pressure from the host
    /// pointer event, recorded verbatim. Returns the stroke so one-shot
    /// callers (stamp clicks) can commit it immediately.
    pub fn start_stroke(
        &mut self,
        now_ms: f64,
        x: f64,
        y: f64,
        pressure: Option<f64>,
        brush: &Brush,
    ) -> &Stroke {
        let t = self.normalized_time(now_ms);
        self.current.insert(Stroke {
            points: vec![LoopPoint::with_pressure(x, y, t, pressure)],
            color: brush.color,
            width: brush.width,
            opacity: brush.opacity,
            mode: brush.mode,
            stamp: brush.stamp.clone(),
        })
    }

    /// Append a point to the in-progress stroke; no-op when none is active.
    /// Safe to call at pointer-move rate: one amortized push per call.
    pub fn add_point(&mut self, now_ms: f64, x: f64, y: f64, pressure: Option<f64>) {
        let t = self.clock.playhead(now_ms).progress;
        if let Some(stroke) = self.current.as_mut() {
            stroke.points.push(LoopPoint::with_pressure(x, y, t, pressure));
        }
    }

    /// Commit the in-progress stroke. Committing with no active stroke, or an
    /// active stroke with zero points, is a silent no-op.
    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.current.take() {
            self.commit(stroke);
        }
    }

    /// Commit an explicitly supplied stroke, bypassing the drag lifecycle
    /// (single-click stamps). Any in-progress stroke is discarded.
    pub fn end_stroke_with(&mut self, stroke: Stroke) {
        self.current = None;
        self.commit(stroke);
    }

    fn commit(&mut self, stroke: Stroke) {
        if stroke.points.is_empty() {
            return;
        }
        self.strokes.push(stroke);
        self.history.push(self.strokes.clone());
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo() {
            self.strokes = snapshot.to_vec();
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo() {
            self.strokes = snapshot.to_vec();
        }
    }

    /// Drop all strokes and restart the loop so a fresh cycle begins now.
    pub fn clear(&mut self, now_ms: f64) {
        self.strokes.clear();
        self.current = None;
        self.clock.restart(now_ms);
        self.history.push(Vec::new());
    }

    /// Pause (freezing the exact playhead) or resume (resynchronizing the
    /// clock epoch so playback continues from the frozen playhead without a
    /// visible jump).
    pub fn toggle_playback(&mut self, now_ms: f64) {
        if self.playing {
            self.clock.pause(now_ms);
        } else {
            self.clock.resume(now_ms);
        }
        self.playing = !self.playing;
    }

    pub fn seek_to(&mut self, now_ms: f64, progress: f64) {
        self.clock.seek(now_ms, progress);
    }

    pub fn step_forward(&mut self, now_ms: f64) {
        self.step(now_ms, STEP_FRACTION);
    }

    pub fn step_backward(&mut self, now_ms: f64) {
        self.step(now_ms, -STEP_FRACTION);
    }

    fn step(&mut self, now_ms: f64, delta: f64) {
        let progress = (self.normalized_time(now_ms) + delta).rem_euclid(1.0);
        self.clock.seek(now_ms, progress);
    }

    pub fn set_loop_mode(&mut self, now_ms: f64, mode: LoopMode) {
        self.clock.set_mode(now_ms, mode);
    }

    /// Partial stroke geometry visible at `progress`. Pure with respect to the
    /// engine: the committed collection is never touched.
    pub fn visible_strokes(&self, progress: f64) -> Vec<Stroke> {
        visible_strokes(&self.strokes, progress)
    }
}
