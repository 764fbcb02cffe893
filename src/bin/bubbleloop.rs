use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use bubbleloop::encode::{FfmpegSink, FfmpegSinkOpts, PngSequenceSink};
use bubbleloop::{ExportOptions, Fps, Project};

#[derive(Parser, Debug)]
#[command(name = "bubbleloop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of the loop as a PNG.
    Frame(FrameArgs),
    /// Export one full loop as an MP4 (requires `ffmpeg` on PATH) or a PNG
    /// sequence.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Loop progress in [0,1].
    #[arg(long, default_value_t = 0.0)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the frames as PNGs into this directory instead of encoding.
    #[arg(long)]
    png_dir: Option<PathBuf>,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Draw the loop progress arc into the exported frames.
    #[arg(long, default_value_t = false)]
    progress_arc: bool,

    /// Ambient camera drift strength (0 disables).
    #[arg(long, default_value_t = 0.0)]
    drift: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let project = Project::from_path(&args.in_path)?;
    let opts = ExportOptions {
        show_progress_arc: true,
        ..ExportOptions::default()
    };
    let frame = bubbleloop::render_frame(&project, None, None, args.progress, &opts)?;
    let flat = frame.flatten_over(opts.background);
    image::save_buffer(
        &args.out,
        &flat,
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("failed to write '{}'", args.out.display()))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let project = Project::from_path(&args.in_path)?;
    let opts = ExportOptions {
        fps: Fps::new(args.fps, 1)?,
        show_progress_arc: args.progress_arc,
        drift_intensity: args.drift,
        ..ExportOptions::default()
    };

    let report = |p: f64| {
        eprint!("\rexporting... {:>3.0}%", p * 100.0);
        if p >= 1.0 {
            eprintln!();
        }
    };

    let frames = match (&args.out, &args.png_dir) {
        (Some(out), _) => {
            let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out));
            bubbleloop::export_loop(&project, None, None, &opts, &mut sink, report)?
        }
        (None, Some(dir)) => {
            let mut sink = PngSequenceSink::new(dir);
            bubbleloop::export_loop(&project, None, None, &opts, &mut sink, report)?
        }
        (None, None) => anyhow::bail!("pass --out <file.mp4> or --png-dir <dir>"),
    };
    println!("exported {frames} frames");
    Ok(())
}
