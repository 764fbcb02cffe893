mod ffmpeg;
mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
pub use sink::{FrameSink, InMemorySink, PngSequenceSink, SinkConfig};
