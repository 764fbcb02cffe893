use bubbleloop::{
    AudioSnapshot, Brush, BrushMode, Canvas, LivePlayback, Rgba8, StampKind, StampSpec,
};

fn session() -> LivePlayback {
    let mut s = LivePlayback::new(
        0.0,
        Canvas {
            width: 96,
            height: 96,
        },
        40.0,
        10_000.0,
    );
    // Freeze ambient motion so frames compare exactly.
    s.set_drift_intensity(0.0);
    s.toggle_playback(0.0);
    s
}

fn draw_line(s: &mut LivePlayback, mode: BrushMode, width: f64) {
    s.set_brush(Brush {
        mode,
        width,
        ..Brush::default()
    });
    s.pointer_down(0.0, -15.0, 0.0, None);
    s.pointer_move(10.0, 0.0, 0.0, None);
    s.pointer_move(20.0, 15.0, 0.0, None);
    s.pointer_up();
}

#[test]
fn eraser_reveals_background_and_undo_restores_ink() {
    let mut s = session();
    s.seek_to(0.0, 0.99);

    let bare = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();

    draw_line(&mut s, BrushMode::Pencil, 6.0);
    let inked = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    assert_ne!(bare, inked);

    draw_line(&mut s, BrushMode::Eraser, 30.0);
    let erased = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    // The wide eraser removed the ink, leaving the bubble background.
    assert_eq!(erased, bare);

    // Erasing is non-destructive: undoing the eraser brings the ink back.
    s.undo();
    let restored = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    assert_eq!(restored, inked);
}

#[test]
fn audio_changes_pixels_but_never_the_document() {
    let mut s = session();
    draw_line(&mut s, BrushMode::Glow, 5.0);
    let strokes_before = s.engine().strokes().to_vec();

    let quiet = s.tick(100.0, AudioSnapshot::neutral()).data().to_vec();
    let mut loud = AudioSnapshot::neutral();
    loud.volume = 0.8;
    loud.bass = 0.7;
    loud.treble = 0.7;
    loud.energy = 0.8;
    loud.envelope = 0.7;
    loud.frequencies = [0.6; bubbleloop::audio::COARSE_BINS];
    let reactive = s.tick(100.0, loud).data().to_vec();

    assert_ne!(quiet, reactive);
    assert_eq!(s.engine().strokes(), &strokes_before[..]);
}

#[test]
fn stamp_brush_paints_along_the_drag() {
    let mut s = session();
    s.seek_to(0.0, 0.99);
    let bare = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();

    s.set_brush(Brush {
        mode: BrushMode::Stamp,
        stamp: Some(StampSpec::glyph(StampKind::Star)),
        width: 6.0,
        color: Rgba8::rgb(255, 220, 80),
        ..Brush::default()
    });
    s.pointer_down(0.0, -10.0, 0.0, None);
    s.pointer_move(10.0, 10.0, 0.0, None);
    s.pointer_up();

    let stamped = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    assert_ne!(bare, stamped);
}

#[test]
fn strokes_replay_only_after_their_loop_time() {
    let mut s = session();
    // Draw at loop time 0.5 (paused there).
    s.seek_to(0.0, 0.5);
    draw_line(&mut s, BrushMode::Pencil, 6.0);

    // Early in the loop the stroke has not started yet.
    s.seek_to(0.0, 0.1);
    let early = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    s.seek_to(0.0, 0.9);
    let late = s.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    assert_ne!(early, late);

    let mut empty = session();
    empty.seek_to(0.0, 0.1);
    let bare = empty.tick(0.0, AudioSnapshot::neutral()).data().to_vec();
    assert_eq!(early, bare);
}
