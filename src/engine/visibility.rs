use crate::model::Stroke;

// Strokes started in the last 20% of the loop and observed in the first 20%
// are treated as wrapping across the boundary.
const WRAP_START_MIN: f64 = 0.8;
const WRAP_PROGRESS_MAX: f64 = 0.2;

/// Compute the partial strokes visible at normalized loop time `progress`.
///
/// Each stroke replays from its first point's time: points with `t <=
/// progress` are visible. The exception is the wrap window above; a stroke
/// that straddles the loop boundary stays visible both at the tail of the
/// loop (its late points, `t >= start_t`) and at the head (its wrapped
/// points, `t <= progress`). Without the window a boundary stroke would
/// vanish the instant the loop restarted.
///
/// Strokes with no currently visible point are omitted entirely, so
/// downstream renderers never see an empty point list. Pure function; the
/// input collection is never mutated.
pub fn visible_strokes(strokes: &[Stroke], progress: f64) -> Vec<Stroke> {
    strokes
        .iter()
        .filter_map(|stroke| {
            let start_t = stroke.start_t();
            let wraps = start_t > WRAP_START_MIN && progress < WRAP_PROGRESS_MAX;
            let points: Vec<_> = stroke
                .points
                .iter()
                .copied()
                .filter(|p| {
                    if wraps {
                        p.t >= start_t || p.t <= progress
                    } else {
                        p.t <= progress
                    }
                })
                .collect();
            if points.is_empty() {
                None
            } else {
                Some(Stroke {
                    points,
                    ..stroke.clone()
                })
            }
        })
        .collect()
}
