use crate::foundation::{
    core::{Canvas, Rgba8},
    error::{BubbleError, BubbleResult},
};

/// A point captured while drawing.
///
/// `x`/`y` are offsets from the canvas center; `t` is the normalized loop time
/// (fraction of the loop duration) at which the point was recorded, independent
/// of which physical loop iteration it was drawn in. Within one stroke the
/// points are in capture order but `t` may wrap: a stroke begun near the end of
/// the loop keeps collecting points past the boundary with small `t` values.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopPoint {
    pub x: f64,
    pub y: f64,
    pub t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl LoopPoint {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self::with_pressure(x, y, t, None)
    }

    /// Point carrying the stylus pressure reported by the host, when any.
    pub fn with_pressure(x: f64, y: f64, t: f64, pressure: Option<f64>) -> Self {
        Self { x, y, t, pressure }
    }
}

/// Closed set of rendering variants. Adding a mode is a compiler-checked
/// change: every renderer matches exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    Pencil,
    Glow,
    Particles,
    Stamp,
    Eraser,
}

/// Built-in stamp glyphs plus the custom text and image variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampKind {
    Star,
    Heart,
    Bubble,
    Sparkle,
    Flower,
    Moon,
    Text,
    Image,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StampSpec {
    pub kind: StampKind,
    /// Custom text for `StampKind::Text`; a text stamp without text draws nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font key for text stamps, resolved by the host through `StampAssets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Prepared image reference for `StampKind::Image`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl StampSpec {
    pub fn glyph(kind: StampKind) -> Self {
        Self {
            kind,
            text: None,
            font: None,
            image: None,
        }
    }
}

/// One committed (or in-progress) stroke. Immutable once committed: the engine
/// only appends points while the stroke is in progress and never mutates it
/// afterwards. Eraser strokes keep their geometry too; erasing is a compositing
/// effect, not data removal.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub points: Vec<LoopPoint>,
    pub color: Rgba8,
    pub width: f64,
    pub opacity: f64,
    pub mode: BrushMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<StampSpec>,
}

impl Stroke {
    pub fn start_t(&self) -> f64 {
        self.points.first().map(|p| p.t).unwrap_or(0.0)
    }
}

/// Serializable session document: everything a gallery needs to rehydrate a
/// drawing. Persistence itself (where the JSON goes) is the host's concern.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub canvas: Canvas,
    /// Radius of the circular drawing area, in pixels.
    pub radius: f64,
    /// Loop duration in milliseconds.
    pub loop_duration_ms: f64,
    pub strokes: Vec<Stroke>,
}

impl Project {
    pub fn validate(&self) -> BubbleResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(BubbleError::validation("canvas width/height must be > 0"));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(BubbleError::validation("radius must be > 0"));
        }
        if !self.loop_duration_ms.is_finite() || self.loop_duration_ms <= 0.0 {
            return Err(BubbleError::validation("loop duration must be > 0 ms"));
        }
        for (i, stroke) in self.strokes.iter().enumerate() {
            if !(stroke.width.is_finite() && stroke.width > 0.0) {
                return Err(BubbleError::validation(format!(
                    "stroke {i} has non-positive width"
                )));
            }
            if !(0.0..=1.0).contains(&stroke.opacity) {
                return Err(BubbleError::validation(format!(
                    "stroke {i} opacity must be in [0,1]"
                )));
            }
            for p in &stroke.points {
                if !(0.0..1.0).contains(&p.t) {
                    return Err(BubbleError::validation(format!(
                        "stroke {i} has point time outside [0,1)"
                    )));
                }
            }
            if stroke.mode == BrushMode::Stamp && stroke.stamp.is_none() {
                return Err(BubbleError::validation(format!(
                    "stroke {i} is a stamp stroke without a stamp spec"
                )));
            }
        }
        Ok(())
    }

    pub fn from_path(path: &std::path::Path) -> BubbleResult<Self> {
        use anyhow::Context as _;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read project '{}'", path.display()))?;
        let project: Self = serde_json::from_slice(&bytes)
            .map_err(|e| BubbleError::serde(format!("invalid project json: {e}")))?;
        project.validate()?;
        Ok(project)
    }
}
