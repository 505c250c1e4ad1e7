//! Shape-tree objects: primitives, styles, modifiers and transforms.

use kurbo::{Affine, BezPath, Ellipse, Point, Shape, Vec2};

use crate::foundation::core::Rgb8;
use crate::foundation::math::{equal, zero};
use crate::model::gradient::Gradient;
use crate::model::group::Group;
use crate::model::property::Property;
use crate::model::text::TextObject;

/// Type tag of an [`Object`]. `Layer` tags the root group of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ObjectKind {
    Group,
    Layer,
    Rect,
    Ellipse,
    Path,
    Polystar,
    Image,
    Text,
    SolidFill,
    SolidStroke,
    GradientFill,
    GradientStroke,
    Trimpath,
    Transform,
}

/// One node of a shape tree.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum Object {
    Group(Group),
    Rect(RectShape),
    Ellipse(EllipseShape),
    Path(PathShape),
    Polystar(Polystar),
    Image(ImageObject),
    Text(Box<TextObject>),
    SolidFill(SolidFill),
    SolidStroke(SolidStroke),
    GradientFill(GradientFill),
    GradientStroke(GradientStroke),
    Trimpath(Trimpath),
    Transform(Transform),
}

impl Object {
    /// Type tag.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Group(g) => g.kind(),
            Self::Rect(_) => ObjectKind::Rect,
            Self::Ellipse(_) => ObjectKind::Ellipse,
            Self::Path(_) => ObjectKind::Path,
            Self::Polystar(_) => ObjectKind::Polystar,
            Self::Image(_) => ObjectKind::Image,
            Self::Text(_) => ObjectKind::Text,
            Self::SolidFill(_) => ObjectKind::SolidFill,
            Self::SolidStroke(_) => ObjectKind::SolidStroke,
            Self::GradientFill(_) => ObjectKind::GradientFill,
            Self::GradientStroke(_) => ObjectKind::GradientStroke,
            Self::Trimpath(_) => ObjectKind::Trimpath,
            Self::Transform(_) => ObjectKind::Transform,
        }
    }

    /// `true` when this object can share its parent's drawing context.
    pub fn mergeable(&self) -> bool {
        match self {
            Self::Rect(_) | Self::Ellipse(_) | Self::Path(_) | Self::Polystar(_) => true,
            Self::Transform(t) => t.opacity.is_static() && equal(t.opacity.value, 100.0),
            Self::Trimpath(t) => t.is_identity(),
            Self::Group(g) => g.allow_merge(),
            _ => false,
        }
    }

    /// `true` for groups and layer roots.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Display name carried by the document, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Group(g) => g.name.as_deref(),
            Self::SolidFill(f) => f.name.as_deref(),
            Self::SolidStroke(s) => s.name.as_deref(),
            _ => None,
        }
    }
}

/// Layer position: a combined 2D property or separate x/y channels.
#[derive(Clone, Debug, PartialEq)]
pub enum Position {
    /// One animated point.
    Combined(Property<Vec2>),
    /// Independently animated axes.
    Split {
        /// X channel.
        x: Property<f32>,
        /// Y channel.
        y: Property<f32>,
    },
}

impl Default for Position {
    fn default() -> Self {
        Self::Combined(Property::constant(Vec2::ZERO))
    }
}

impl Position {
    /// Position at `frame`.
    pub fn at(&self, frame: f32) -> Vec2 {
        match self {
            Self::Combined(p) => p.at(frame),
            Self::Split { x, y } => Vec2::new(f64::from(x.at(frame)), f64::from(y.at(frame))),
        }
    }

    fn is_static(&self) -> bool {
        match self {
            Self::Combined(p) => p.is_static(),
            Self::Split { x, y } => x.is_static() && y.is_static(),
        }
    }
}

/// Anchor/position/scale/rotation/skew/opacity transform of a layer or group.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    /// Pivot point in local space.
    pub anchor: Property<Vec2>,
    /// Placement of the anchor in parent space.
    pub position: Position,
    /// Scale in percent.
    pub scale: Property<Vec2>,
    /// Clockwise rotation in degrees.
    pub rotation: Property<f32>,
    /// Skew angle in degrees.
    pub skew: Property<f32>,
    /// Direction of the skew in degrees.
    pub skew_axis: Property<f32>,
    /// Opacity in percent.
    pub opacity: Property<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            anchor: Property::constant(Vec2::ZERO),
            position: Position::default(),
            scale: Property::constant(Vec2::new(100.0, 100.0)),
            rotation: Property::constant(0.0),
            skew: Property::constant(0.0),
            skew_axis: Property::constant(0.0),
            opacity: Property::constant(100.0),
        }
    }
}

impl Transform {
    /// Local-to-parent matrix at `frame`.
    pub fn matrix(&self, frame: f32) -> Affine {
        let pos = self.position.at(frame);
        let anchor = self.anchor.at(frame);
        let scale = self.scale.at(frame) * 0.01;
        let rotation = f64::from(self.rotation.at(frame)).to_radians();

        let mut m = Affine::translate(pos) * Affine::rotate(rotation);
        let skew = self.skew.at(frame);
        if !zero(skew) {
            let axis = f64::from(self.skew_axis.at(frame)).to_radians();
            let k = (-f64::from(skew).to_radians()).tan();
            m = m * Affine::rotate(axis) * Affine::skew(k, 0.0) * Affine::rotate(-axis);
        }
        m * Affine::scale_non_uniform(scale.x, scale.y) * Affine::translate(-anchor)
    }

    /// Opacity at `frame` as `0..=255`.
    pub fn opacity(&self, frame: f32) -> u8 {
        percent_to_u8(self.opacity.at(frame))
    }

    /// `true` when nothing in the transform is animated.
    pub fn is_static(&self) -> bool {
        self.anchor.is_static()
            && self.position.is_static()
            && self.scale.is_static()
            && self.rotation.is_static()
            && self.skew.is_static()
            && self.opacity.is_static()
    }
}

/// `0..=100` percent to `0..=255`, rounding half to even.
pub(crate) fn percent_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 100.0) * 2.55).round_ties_even() as u8
}

/// Axis-aligned rectangle centered at `position`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RectShape {
    /// Center.
    pub position: Property<Vec2>,
    /// Width/height.
    pub size: Property<Vec2>,
    /// Corner radius.
    pub roundness: Property<f32>,
    /// Counter-clockwise winding when `false`.
    pub clockwise: bool,
}

impl RectShape {
    /// Outline at `frame`, starting at the top-right corner.
    pub fn path(&self, frame: f32) -> BezPath {
        let c = self.position.at(frame).to_point();
        let s = self.size.at(frame);
        let (hw, hh) = (s.x * 0.5, s.y * 0.5);
        let r = f64::from(self.roundness.at(frame)).min(hw).min(hh).max(0.0);
        let (x0, y0, x1, y1) = (c.x - hw, c.y - hh, c.x + hw, c.y + hh);

        let mut p = BezPath::new();
        if r <= 0.0 {
            p.move_to((x1, y0));
            p.line_to((x1, y1));
            p.line_to((x0, y1));
            p.line_to((x0, y0));
            p.close_path();
        } else {
            let k = r * (1.0 - KAPPA);
            p.move_to((x1, y0 + r));
            p.line_to((x1, y1 - r));
            p.curve_to((x1, y1 - k), (x1 - k, y1), (x1 - r, y1));
            p.line_to((x0 + r, y1));
            p.curve_to((x0 + k, y1), (x0, y1 - k), (x0, y1 - r));
            p.line_to((x0, y0 + r));
            p.curve_to((x0, y0 + k), (x0 + k, y0), (x0 + r, y0));
            p.line_to((x1 - r, y0));
            p.curve_to((x1 - k, y0), (x1, y0 + k), (x1, y0 + r));
            p.close_path();
        }
        wind(p, self.clockwise)
    }
}

const KAPPA: f64 = 0.552_284_75;

/// Ellipse centered at `position`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EllipseShape {
    /// Center.
    pub position: Property<Vec2>,
    /// Diameters.
    pub size: Property<Vec2>,
    /// Counter-clockwise winding when `false`.
    pub clockwise: bool,
}

impl EllipseShape {
    /// Outline at `frame`.
    pub fn path(&self, frame: f32) -> BezPath {
        let c = self.position.at(frame).to_point();
        let s = self.size.at(frame);
        let e = Ellipse::new(c, (s.x * 0.5, s.y * 0.5), 0.0);
        wind(e.to_path(0.1), self.clockwise)
    }
}

/// Free-form bezier path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathShape {
    /// Outline keyframes.
    pub path: Property<BezPath>,
    /// Counter-clockwise winding when `false`.
    pub clockwise: bool,
}

impl PathShape {
    /// Outline at `frame`.
    pub fn path(&self, frame: f32) -> BezPath {
        wind(self.path.at(frame), self.clockwise)
    }
}

/// Star or regular polygon.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polystar {
    /// Star (`true`) or polygon.
    pub star: bool,
    /// Center.
    pub position: Property<Vec2>,
    /// Number of points (or sides).
    pub points: Property<f32>,
    /// Rotation in degrees.
    pub rotation: Property<f32>,
    /// Inner radius (stars only).
    pub inner_radius: Property<f32>,
    /// Outer radius.
    pub outer_radius: Property<f32>,
    /// Counter-clockwise winding when `false`.
    pub clockwise: bool,
}

impl Polystar {
    /// Outline at `frame`. Fractional point counts are truncated.
    pub fn path(&self, frame: f32) -> BezPath {
        let c = self.position.at(frame).to_point();
        let n = self.points.at(frame).floor().max(0.0) as usize;
        let mut p = BezPath::new();
        if n < 2 {
            return p;
        }
        let outer = f64::from(self.outer_radius.at(frame));
        let inner = f64::from(self.inner_radius.at(frame));
        let rot = f64::from(self.rotation.at(frame)).to_radians() - std::f64::consts::FRAC_PI_2;
        let verts = if self.star { n * 2 } else { n };
        let step = std::f64::consts::TAU / verts as f64;
        for i in 0..verts {
            let r = if self.star && i % 2 == 1 { inner } else { outer };
            let a = rot + step * i as f64;
            let pt = Point::new(c.x + r * a.cos(), c.y + r * a.sin());
            if i == 0 {
                p.move_to(pt);
            } else {
                p.line_to(pt);
            }
        }
        p.close_path();
        wind(p, self.clockwise)
    }
}

fn wind(p: BezPath, clockwise: bool) -> BezPath {
    if clockwise { p } else { p.reverse_subpaths() }
}

/// Embedded or referenced bitmap payload.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageData {
    /// Path, URL or `data:` URI.
    pub path: String,
    /// Intrinsic width.
    pub width: f32,
    /// Intrinsic height.
    pub height: f32,
}

/// Image primitive of an image layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageObject {
    /// Payload; replaceable through image slots.
    pub data: ImageData,
    /// Slot id bound to the image payload.
    pub sid: Option<String>,
}

/// Fill rule for solid and gradient fills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// Solid color fill.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolidFill {
    /// Document name; `[|name|]` tags select registry colors.
    pub name: Option<String>,
    /// Fill color.
    pub color: Property<Rgb8>,
    /// Opacity in percent.
    pub opacity: Property<f32>,
    /// Winding rule.
    pub rule: FillRule,
}

/// Line cap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Line join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Dash pattern entry.
#[derive(Clone, Debug, PartialEq)]
pub enum DashEntry {
    /// Dash length.
    Dash(Property<f32>),
    /// Gap length.
    Gap(Property<f32>),
    /// Pattern offset.
    Offset(Property<f32>),
}

/// Stroke geometry shared by solid and gradient strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    /// Line width.
    pub width: Property<f32>,
    /// Cap style.
    pub cap: LineCap,
    /// Join style.
    pub join: LineJoin,
    /// Miter limit.
    pub miter_limit: f32,
    /// Dash pattern.
    pub dash: Vec<DashEntry>,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: Property::constant(1.0),
            cap: LineCap::default(),
            join: LineJoin::default(),
            miter_limit: 4.0,
            dash: Vec::new(),
        }
    }
}

impl StrokeStyle {
    /// Dash pattern and offset at `frame`. An all-zero pattern yields `None`.
    pub fn dash_at(&self, frame: f32) -> Option<(Vec<f64>, f64)> {
        let mut pattern = Vec::new();
        let mut offset = 0.0;
        for d in &self.dash {
            match d {
                DashEntry::Dash(v) | DashEntry::Gap(v) => pattern.push(f64::from(v.at(frame))),
                DashEntry::Offset(v) => offset = f64::from(v.at(frame)),
            }
        }
        if pattern.len() % 2 == 1 {
            let repeated = pattern.clone();
            pattern.extend(repeated);
        }
        if pattern.iter().all(|v| *v <= 0.0) {
            return None;
        }
        Some((pattern, offset))
    }
}

/// Solid color stroke.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolidStroke {
    /// Document name; `[|name|]` tags select registry colors.
    pub name: Option<String>,
    /// Stroke color.
    pub color: Property<Rgb8>,
    /// Opacity in percent.
    pub opacity: Property<f32>,
    /// Geometry.
    pub style: StrokeStyle,
}

/// Gradient fill.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientFill {
    /// Gradient definition.
    pub gradient: Gradient,
    /// Winding rule.
    pub rule: FillRule,
}

/// Gradient stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientStroke {
    /// Gradient definition.
    pub gradient: Gradient,
    /// Geometry.
    pub style: StrokeStyle,
}

/// How a trim applies to several paths in one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrimMode {
    /// Every path is trimmed with the same range.
    #[default]
    Simultaneous,
    /// The paths are trimmed one after another, as if joined end to end.
    Individual,
}

/// Trim-path modifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Trimpath {
    /// Start in percent.
    pub start: Property<f32>,
    /// End in percent.
    pub end: Property<f32>,
    /// Offset in degrees (360 is one full length).
    pub offset: Property<f32>,
    /// Multi-path mode.
    pub mode: TrimMode,
}

impl Default for Trimpath {
    fn default() -> Self {
        Self {
            start: Property::constant(0.0),
            end: Property::constant(100.0),
            offset: Property::constant(0.0),
            mode: TrimMode::default(),
        }
    }
}

impl Trimpath {
    /// `true` for a static `0..100` trim with no offset.
    pub fn is_identity(&self) -> bool {
        self.start.frames.is_none()
            && self.start.value == 0.0
            && self.end.frames.is_none()
            && self.end.value == 100.0
            && self.offset.frames.is_none()
            && self.offset.value == 0.0
    }

    /// Normalized `(start, end)` at `frame`.
    ///
    /// Both values are fractions of the path length. `end` may exceed `1.0` once the offset
    /// is applied; callers wrap around. An empty trim yields `(0, 0)`.
    pub fn segment(&self, frame: f32) -> (f32, f32) {
        let mut start = (self.start.at(frame) * 0.01).clamp(0.0, 1.0);
        let mut end = (self.end.at(frame) * 0.01).clamp(0.0, 1.0);

        let diff = (start - end).abs();
        if zero(diff) {
            return (0.0, 0.0);
        }

        let o = (self.offset.at(frame) % 360.0) / 360.0;
        if zero(o) && diff >= 1.0 {
            return (0.0, 1.0);
        }

        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        (start + o, end + o)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/object.rs"]
mod tests;
