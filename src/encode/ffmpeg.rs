//! MP4 export through the system `ffmpeg` binary. Frames are flattened to
//! opaque RGBA and streamed to ffmpeg's stdin as rawvideo; stderr is drained
//! on a thread so a chatty encoder can never deadlock the pipe.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::debug;

use crate::foundation::error::{BubbleError, BubbleResult};
use crate::render::Surface;

use super::sink::{FrameSink, SinkConfig, check_frame};

#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    config: Option<SinkConfig>,
    last_index: Option<u64>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            config: None,
            last_index: None,
        }
    }

    /// Kill and reap the encoder, closing the pipe first. Safe at any point;
    /// a sink that already finished cleanly has nothing left to do.
    fn teardown(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.config = None;
        self.last_index = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, config: &SinkConfig) -> BubbleResult<()> {
        let (w, h) = (config.canvas.width, config.canvas.height);
        if w == 0 || h == 0 {
            return Err(BubbleError::validation("output width/height must be non-zero"));
        }
        // yuv420p subsampling needs even dimensions.
        if w % 2 != 0 || h % 2 != 0 {
            return Err(BubbleError::validation(
                "output width/height must be even for yuv420p mp4",
            ));
        }
        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(BubbleError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(BubbleError::export(
                "ffmpeg is required for MP4 export, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{w}x{h}"),
            "-r",
            &format!("{}/{}", config.fps.num, config.fps.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.opts.out_path);
        debug!(out = %self.opts.out_path.display(), "spawning ffmpeg");

        let mut child = cmd.spawn().map_err(|e| {
            BubbleError::export(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BubbleError::export("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| BubbleError::export("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.config = Some(*config);
        self.last_index = None;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &Surface) -> BubbleResult<()> {
        let config = self
            .config
            .ok_or_else(|| BubbleError::export("ffmpeg sink not started"))?;
        check_frame(&config, self.last_index, index, frame)?;
        self.last_index = Some(index);

        let flat = frame.flatten_over(config.background);
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| BubbleError::export("ffmpeg sink is already finalized"))?;
        use std::io::Write as _;
        stdin
            .write_all(&flat)
            .map_err(|e| BubbleError::export(format!("write frame to ffmpeg: {e}")))?;
        Ok(())
    }

    fn end(&mut self) -> BubbleResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| BubbleError::export("ffmpeg sink not started"))?;
        let status = child
            .wait()
            .map_err(|e| BubbleError::export(format!("wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BubbleError::export("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| BubbleError::export(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(BubbleError::export(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }
        self.config = None;
        Ok(())
    }

    fn abort(&mut self) {
        debug!(out = %self.opts.out_path.display(), "aborting ffmpeg export");
        self.teardown();
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> BubbleResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Canvas, Fps, Rgba8};

    #[test]
    fn odd_dimensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(dir.path().join("out.mp4")));
        let config = SinkConfig {
            canvas: Canvas {
                width: 601,
                height: 600,
            },
            fps: Fps { num: 30, den: 1 },
            background: Rgba8::rgb(0, 0, 0),
        };
        assert!(sink.begin(&config).is_err());
    }

    #[test]
    fn push_before_begin_fails() {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
        assert!(sink.push_frame(0, &Surface::new(2, 2)).is_err());
        assert!(sink.end().is_err());
    }

    #[test]
    fn abort_is_idempotent_and_fine_before_begin() {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
        sink.abort();
        sink.abort();
        // Dropped without a running child: nothing to reap.
    }
}
