use bubbleloop::encode::{FrameSink, InMemorySink, PngSequenceSink, SinkConfig};
use bubbleloop::{
    AudioSnapshot, BrushMode, BubbleError, BubbleResult, Canvas, ExportOptions, Fps, LoopPoint,
    Project, Rgba8, Stroke, Surface, export_loop, render_frame, render_loop_frames, total_frames,
};

fn project() -> Project {
    Project {
        canvas: Canvas {
            width: 64,
            height: 64,
        },
        radius: 26.0,
        loop_duration_ms: 2000.0,
        strokes: vec![
            Stroke {
                points: vec![
                    LoopPoint::new(-15.0, -5.0, 0.1),
                    LoopPoint::new(0.0, 5.0, 0.3),
                    LoopPoint::new(15.0, -5.0, 0.6),
                ],
                color: Rgba8::rgb(255, 80, 180),
                width: 5.0,
                opacity: 1.0,
                mode: BrushMode::Pencil,
                stamp: None,
            },
            Stroke {
                points: vec![
                    LoopPoint::new(0.0, -12.0, 0.85),
                    LoopPoint::new(0.0, 12.0, 0.05),
                ],
                color: Rgba8::rgb(80, 255, 180),
                width: 4.0,
                opacity: 0.8,
                mode: BrushMode::Glow,
                stamp: None,
            },
        ],
    }
}

fn opts(fps: u32) -> ExportOptions {
    ExportOptions {
        fps: Fps::new(fps, 1).unwrap(),
        parallel: false,
        ..ExportOptions::default()
    }
}

#[test]
fn frame_count_is_duration_times_fps_floored() {
    assert_eq!(total_frames(2000.0, Fps::new(10, 1).unwrap()), 20);
    assert_eq!(total_frames(2500.0, Fps::new(10, 1).unwrap()), 25);
    assert_eq!(total_frames(1999.0, Fps::new(10, 1).unwrap()), 19);

    let mut sink = InMemorySink::new();
    let frames = export_loop(&project(), None, None, &opts(10), &mut sink, |_| {}).unwrap();
    assert_eq!(frames, 20);
    assert_eq!(sink.frames.len(), 20);
}

#[test]
fn last_frame_stops_short_of_the_loop_boundary() {
    // 20 frames: the last is at progress 19/20 = 0.95, never 1.0, so the
    // exported loop tiles seamlessly when played back to back.
    let p = project();
    let loop_frames = render_loop_frames(&p, None, None, &opts(10)).unwrap();
    assert_eq!(loop_frames.frames.len(), 20);

    let last = render_frame(&p, None, None, 0.95, &opts(10)).unwrap();
    assert_eq!(
        loop_frames.frames[19].data(),
        last.data(),
        "frame 19 must equal the frame at progress 0.95"
    );
}

#[test]
fn export_is_deterministic() {
    let p = project();
    let mut a = InMemorySink::new();
    let mut b = InMemorySink::new();
    export_loop(&p, None, None, &opts(10), &mut a, |_| {}).unwrap();
    export_loop(&p, None, None, &opts(10), &mut b, |_| {}).unwrap();
    assert_eq!(a.frames, b.frames);
}

#[test]
fn parallel_and_sequential_render_identically() {
    let p = project();
    let sequential = render_loop_frames(&p, None, None, &opts(10)).unwrap();
    let parallel = render_loop_frames(
        &p,
        None,
        None,
        &ExportOptions {
            parallel: true,
            ..opts(10)
        },
    )
    .unwrap();
    for (a, b) in sequential.frames.iter().zip(parallel.frames.iter()) {
        assert_eq!(a.data(), b.data());
    }
}

#[test]
fn thumbnail_is_the_middle_frame() {
    let loop_frames = render_loop_frames(&project(), None, None, &opts(10)).unwrap();
    assert_eq!(loop_frames.thumbnail_index, 10);
}

#[test]
fn progress_reports_frames_then_encoding() {
    let mut sink = InMemorySink::new();
    let mut reports = Vec::new();
    export_loop(&project(), None, None, &opts(10), &mut sink, |p| reports.push(p)).unwrap();

    assert_eq!(reports.first().copied(), Some(0.0));
    assert_eq!(reports.last().copied(), Some(1.0));
    // Monotonically non-decreasing.
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    // The frame phase tops out at 0.8; only finalization reaches beyond.
    let below_end = &reports[..reports.len() - 1];
    assert!(below_end.iter().all(|&p| p <= 0.8 + 1e-9));
}

#[test]
fn export_does_not_mutate_the_project() {
    let p = project();
    let before = serde_json::to_string(&p).unwrap();
    let mut sink = InMemorySink::new();
    export_loop(&p, None, None, &opts(10), &mut sink, |_| {}).unwrap();
    assert_eq!(serde_json::to_string(&p).unwrap(), before);
}

#[test]
fn invalid_project_is_rejected_before_any_frame() {
    let mut bad = project();
    bad.strokes[0].opacity = 2.0;
    let mut sink = InMemorySink::new();
    assert!(export_loop(&bad, None, None, &opts(10), &mut sink, |_| {}).is_err());
    assert!(sink.frames.is_empty());
}

#[test]
fn png_sequence_export_writes_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = PngSequenceSink::new(dir.path());
    let frames = export_loop(&project(), None, None, &opts(5), &mut sink, |_| {}).unwrap();
    assert_eq!(frames, 10);
    for i in 0..frames {
        assert!(dir.path().join(format!("frame_{i:05}.png")).exists());
    }
}

#[test]
fn audio_sampler_feeds_every_exported_frame() {
    let p = project();
    let loud = |_time_ms: f64| {
        let mut snap = AudioSnapshot::neutral();
        snap.volume = 0.8;
        snap.bass = 0.6;
        snap.treble = 0.6;
        snap.energy = 0.8;
        snap.envelope = 0.7;
        snap
    };

    let neutral = render_loop_frames(&p, None, None, &opts(10)).unwrap();
    let reactive = render_loop_frames(&p, None, Some(&loud), &opts(10)).unwrap();
    assert_ne!(neutral.frames[0].data(), reactive.frames[0].data());
    assert_ne!(neutral.frames[5].data(), reactive.frames[5].data());

    // A pure sampler keeps the export deterministic.
    let again = render_loop_frames(&p, None, Some(&loud), &opts(10)).unwrap();
    for (a, b) in reactive.frames.iter().zip(again.frames.iter()) {
        assert_eq!(a.data(), b.data());
    }
}

struct FailingSink {
    pushed: u64,
    fail_at: u64,
    aborted: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _config: &SinkConfig) -> BubbleResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, index: u64, _frame: &Surface) -> BubbleResult<()> {
        if index >= self.fail_at {
            return Err(BubbleError::export("disk full"));
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> BubbleResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[test]
fn failed_export_aborts_the_sink() {
    let mut sink = FailingSink {
        pushed: 0,
        fail_at: 3,
        aborted: false,
    };
    let result = export_loop(&project(), None, None, &opts(10), &mut sink, |_| {});
    assert!(result.is_err());
    assert_eq!(sink.pushed, 3);
    // The sink got its teardown call and can release what it acquired.
    assert!(sink.aborted);
}

#[test]
fn sink_contract_rejects_out_of_order_pushes() {
    let mut sink = InMemorySink::new();
    let config = SinkConfig {
        canvas: Canvas {
            width: 8,
            height: 8,
        },
        fps: Fps::new(10, 1).unwrap(),
        background: Rgba8::rgb(0, 0, 0),
    };
    sink.begin(&config).unwrap();
    sink.push_frame(3, &Surface::new(8, 8)).unwrap();
    assert!(sink.push_frame(2, &Surface::new(8, 8)).is_err());
}
