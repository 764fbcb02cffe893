use std::path::PathBuf;

use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::foundation::error::{BubbleError, BubbleResult};
use crate::render::Surface;

/// Stream parameters handed to a sink at `begin`.
#[derive(Clone, Copy, Debug)]
pub struct SinkConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    /// Opaque background the premultiplied frames are flattened onto.
    pub background: Rgba8,
}

/// Receives rendered frames in order and materializes the export.
///
/// Contract: `begin` once, then `push_frame` with strictly increasing
/// indices, then `end` exactly once. Frames arrive premultiplied; flattening
/// is the sink's job so different targets can pick their own background
/// handling.
pub trait FrameSink {
    fn begin(&mut self, config: &SinkConfig) -> BubbleResult<()>;
    fn push_frame(&mut self, index: u64, frame: &Surface) -> BubbleResult<()>;
    fn end(&mut self) -> BubbleResult<()>;
    /// Tear down after a failed export. Sinks holding external resources
    /// (child processes, open files) release them here; the default is a
    /// no-op.
    fn abort(&mut self) {}
}

/// Collects flattened frames in memory. Used by tests and by hosts that do
/// their own packaging.
#[derive(Default)]
pub struct InMemorySink {
    config: Option<SinkConfig>,
    last_index: Option<u64>,
    pub frames: Vec<Vec<u8>>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, config: &SinkConfig) -> BubbleResult<()> {
        self.config = Some(*config);
        self.frames.clear();
        self.last_index = None;
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &Surface) -> BubbleResult<()> {
        let config = self
            .config
            .ok_or_else(|| BubbleError::export("sink not started"))?;
        if self.finished {
            return Err(BubbleError::export("sink is already finalized"));
        }
        check_frame(&config, self.last_index, index, frame)?;
        self.last_index = Some(index);
        self.frames.push(frame.flatten_over(config.background));
        Ok(())
    }

    fn end(&mut self) -> BubbleResult<()> {
        if self.config.is_none() {
            return Err(BubbleError::export("sink not started"));
        }
        self.finished = true;
        Ok(())
    }
}

/// Writes each frame as `frame_00000.png` under a directory.
pub struct PngSequenceSink {
    dir: PathBuf,
    config: Option<SinkConfig>,
    last_index: Option<u64>,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            config: None,
            last_index: None,
        }
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, config: &SinkConfig) -> BubbleResult<()> {
        use anyhow::Context as _;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create '{}'", self.dir.display()))?;
        self.config = Some(*config);
        self.last_index = None;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &Surface) -> BubbleResult<()> {
        let config = self
            .config
            .ok_or_else(|| BubbleError::export("sink not started"))?;
        check_frame(&config, self.last_index, index, frame)?;
        self.last_index = Some(index);

        let flat = frame.flatten_over(config.background);
        let path = self.dir.join(format!("frame_{index:05}.png"));
        image::save_buffer(
            &path,
            &flat,
            config.canvas.width,
            config.canvas.height,
            image::ColorType::Rgba8,
        )
        .map_err(|e| BubbleError::export(format!("png write '{}': {e}", path.display())))?;
        Ok(())
    }

    fn end(&mut self) -> BubbleResult<()> {
        if self.config.is_none() {
            return Err(BubbleError::export("sink not started"));
        }
        Ok(())
    }
}

pub(crate) fn check_frame(
    config: &SinkConfig,
    last_index: Option<u64>,
    index: u64,
    frame: &Surface,
) -> BubbleResult<()> {
    if let Some(last) = last_index {
        if index <= last {
            return Err(BubbleError::export(format!(
                "out-of-order frame index {index} after {last}"
            )));
        }
    }
    if frame.width() != config.canvas.width || frame.height() != config.canvas.height {
        return Err(BubbleError::export(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            config.canvas.width,
            config.canvas.height
        )));
    }
    Ok(())
}
