use crate::model::Stroke;

/// Linear undo history over full stroke-collection snapshots.
///
/// Snapshot granularity is one committed stroke (or clear), so the memory cost
/// is quadratic in stroke count but trivial at hand-drawing scale, and undo
/// stays O(1). Pushing after an undo truncates the redo tail, standard linear
/// history.
#[derive(Clone, Debug)]
pub struct History {
    snapshots: Vec<Vec<Stroke>>,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Starts with a single empty snapshot so the first undo target is "no
    /// strokes" rather than nothing.
    pub fn new() -> Self {
        Self {
            snapshots: vec![Vec::new()],
            cursor: 0,
        }
    }

    pub fn push(&mut self, strokes: Vec<Stroke>) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(strokes);
        self.cursor = self.snapshots.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn undo(&mut self) -> Option<&[Stroke]> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn redo(&mut self) -> Option<&[Stroke]> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;
    use crate::model::{BrushMode, LoopPoint};

    fn stroke(x: f64) -> Stroke {
        Stroke {
            points: vec![LoopPoint::new(x, 0.0, 0.0)],
            color: Rgba8::WHITE,
            width: 4.0,
            opacity: 1.0,
            mode: BrushMode::Pencil,
            stamp: None,
        }
    }

    #[test]
    fn undo_at_bottom_is_noop() {
        let mut h = History::new();
        assert!(!h.can_undo());
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
    }

    #[test]
    fn undo_redo_roundtrip() {
        let mut h = History::new();
        h.push(vec![stroke(1.0)]);
        h.push(vec![stroke(1.0), stroke(2.0)]);
        assert_eq!(h.undo().unwrap().len(), 1);
        assert_eq!(h.undo().unwrap().len(), 0);
        assert!(h.undo().is_none());
        assert_eq!(h.redo().unwrap().len(), 1);
        assert_eq!(h.redo().unwrap().len(), 2);
        assert!(h.redo().is_none());
    }

    #[test]
    fn push_after_undo_truncates_redo_tail() {
        let mut h = History::new();
        h.push(vec![stroke(1.0)]);
        h.push(vec![stroke(1.0), stroke(2.0)]);
        h.undo();
        h.push(vec![stroke(1.0), stroke(3.0)]);
        assert!(!h.can_redo());
        assert_eq!(h.undo().unwrap().len(), 1);
    }
}
