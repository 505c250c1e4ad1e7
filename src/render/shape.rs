//! Shape paints and their worker-side geometry preparation.

use kurbo::{
    Affine, BezPath, Cap, Join, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Rect, Shape as _, Stroke,
    StrokeOpts,
};
use smallvec::SmallVec;

use crate::foundation::core::{RenderRegion, Rgba8};
use crate::model::gradient::GradientPaint;
use crate::model::object::{FillRule, LineCap, LineJoin};
use crate::render::paint::PaintState;
use crate::scheduler::{TaskHandle, TaskScheduler};

const ARCLEN_ACCURACY: f64 = 1e-3;

/// Paint source of a fill or stroke.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeFill {
    /// Flat color.
    Solid(Rgba8),
    /// Gradient in the shape's local space.
    Gradient(GradientPaint),
}

/// Stroke parameters in local units.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeSpec {
    /// Line width.
    pub width: f64,
    /// Cap style.
    pub cap: LineCap,
    /// Join style.
    pub join: LineJoin,
    /// Miter limit.
    pub miter_limit: f64,
    /// Dash pattern and offset.
    pub dash: Option<(Vec<f64>, f64)>,
    /// Stroke paint.
    pub paint: ShapeFill,
}

/// Normalized trim range. `end` may exceed `1.0`; the excess wraps to the path start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimSpec {
    /// Start fraction.
    pub start: f32,
    /// End fraction.
    pub end: f32,
    /// Trim each subpath on its own instead of the path as a whole.
    pub simultaneous: bool,
}

/// Device-space geometry ready for rasterization.
#[derive(Clone, Debug, Default)]
pub struct PreparedShape {
    /// Fill outline, paint and winding rule.
    pub fill: Option<(BezPath, ShapeFill, FillRule)>,
    /// Stroke outline (filled non-zero) and paint.
    pub stroke: Option<(BezPath, ShapeFill)>,
    /// Local-to-device transform for gradient paints.
    pub paint_transform: Affine,
    /// Device bounds of everything drawn.
    pub bounds: RenderRegion,
    /// Effective opacity.
    pub opacity: u8,
    /// Draw the stroke beneath the fill.
    pub stroke_first: bool,
}

enum Prepared {
    Empty,
    Pending(TaskHandle<PreparedShape>),
    Ready(PreparedShape),
}

impl std::fmt::Debug for Prepared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Pending(_) => f.write_str("Pending"),
            Self::Ready(p) => f.debug_tuple("Ready").field(&p.bounds).finish(),
        }
    }
}

/// Vector path with an optional fill and stroke.
#[derive(Debug)]
pub struct Shape {
    pub(crate) state: PaintState,
    /// Outline in local units.
    pub path: BezPath,
    /// Winding rule for the fill.
    pub rule: FillRule,
    /// Fill paint.
    pub fill: Option<ShapeFill>,
    /// Stroke.
    pub stroke: Option<StrokeSpec>,
    /// Draw the stroke beneath the fill.
    pub stroke_first: bool,
    /// Trims applied in order before filling and stroking.
    pub trims: SmallVec<[TrimSpec; 1]>,
    prepared: Prepared,
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(BezPath::new())
    }
}

impl Shape {
    /// Unstyled shape.
    pub fn new(path: BezPath) -> Self {
        Self {
            state: PaintState::default(),
            path,
            rule: FillRule::NonZero,
            fill: None,
            stroke: None,
            stroke_first: false,
            trims: SmallVec::new(),
            prepared: Prepared::Empty,
        }
    }

    /// Filled shape.
    pub fn filled(path: BezPath, fill: ShapeFill, rule: FillRule) -> Self {
        Self {
            fill: Some(fill),
            rule,
            ..Self::new(path)
        }
    }

    /// Paint state (transform, opacity, blend, mask, clipper).
    pub fn state(&self) -> &PaintState {
        &self.state
    }

    /// Mutable paint state.
    pub fn state_mut(&mut self) -> &mut PaintState {
        &mut self.state
    }

    pub(crate) fn update(&mut self, scheduler: &TaskScheduler, transform: Affine, opacity: u8) {
        let job = GeometryJob {
            path: self.path.clone(),
            rule: self.rule,
            fill: self.fill.clone(),
            stroke: self.stroke.clone(),
            trims: self.trims.clone(),
            transform,
            opacity,
            stroke_first: self.stroke_first,
        };
        self.prepared = Prepared::Pending(scheduler.request(move |_| prepare_geometry(job)));
    }

    /// Prepared geometry, waiting for the worker if needed.
    pub(crate) fn prepared(&mut self) -> Option<&PreparedShape> {
        if let Prepared::Pending(_) = self.prepared {
            let Prepared::Pending(handle) = std::mem::replace(&mut self.prepared, Prepared::Empty)
            else {
                return None;
            };
            match handle.join() {
                Some(p) => self.prepared = Prepared::Ready(p),
                None => tracing::warn!("shape geometry job panicked"),
            }
        }
        match &self.prepared {
            Prepared::Ready(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn render(&mut self, renderer: &mut dyn crate::render::method::RenderMethod) -> bool {
        match self.prepared() {
            Some(p) if p.opacity > 0 => renderer.render_shape(p),
            _ => true,
        }
    }

    pub(crate) fn bounds(&mut self) -> RenderRegion {
        self.prepared().map_or(RenderRegion::ZERO, |p| p.bounds)
    }

    /// Local bounds, stroke width included.
    pub(crate) fn local_bounds(&self) -> Option<Rect> {
        if self.path.elements().is_empty() {
            return None;
        }
        let bb = self.path.bounding_box();
        let half = self.stroke.as_ref().map_or(0.0, |s| s.width * 0.5);
        Some(bb.inflate(half, half))
    }

    /// Device fill outline for use as a clip path.
    pub(crate) fn clip_path(&mut self) -> Option<BezPath> {
        let p = self.prepared()?;
        Some(p.fill.as_ref().map_or_else(BezPath::new, |(path, _, _)| path.clone()))
    }
}

struct GeometryJob {
    path: BezPath,
    rule: FillRule,
    fill: Option<ShapeFill>,
    stroke: Option<StrokeSpec>,
    trims: SmallVec<[TrimSpec; 1]>,
    transform: Affine,
    opacity: u8,
    stroke_first: bool,
}

fn prepare_geometry(job: GeometryJob) -> PreparedShape {
    let mut path = job.path;
    for t in &job.trims {
        path = trim_path(&path, *t);
    }

    let scale = job.transform.determinant().abs().sqrt().max(1e-6);
    let mut bounds: Option<Rect> = None;
    let mut grow = |r: Rect| bounds = Some(bounds.map_or(r, |b| b.union(r)));

    let fill = job.fill.map(|paint| {
        let device = job.transform * path.clone();
        if !device.elements().is_empty() {
            grow(device.bounding_box());
        }
        (device, paint, job.rule)
    });

    let stroke = job.stroke.and_then(|s| {
        if s.width <= 0.0 {
            return None;
        }
        let mut style = Stroke::new(s.width)
            .with_caps(match s.cap {
                LineCap::Butt => Cap::Butt,
                LineCap::Round => Cap::Round,
                LineCap::Square => Cap::Square,
            })
            .with_join(match s.join {
                LineJoin::Miter => Join::Miter,
                LineJoin::Round => Join::Round,
                LineJoin::Bevel => Join::Bevel,
            })
            .with_miter_limit(s.miter_limit);
        if let Some((pattern, offset)) = &s.dash {
            style = style.with_dashes(*offset, pattern.iter().copied());
        }
        let outline = kurbo::stroke(path.iter(), &style, &StrokeOpts::default(), 0.1 / scale);
        let device = job.transform * outline;
        if !device.elements().is_empty() {
            grow(device.bounding_box());
        }
        Some((device, s.paint))
    });

    PreparedShape {
        fill,
        stroke,
        paint_transform: job.transform,
        bounds: bounds.map_or(RenderRegion::ZERO, RenderRegion::from_rect),
        opacity: job.opacity,
        stroke_first: job.stroke_first,
    }
}

/// Cut `path` down to the `spec` range, measured along its arc length.
pub fn trim_path(path: &BezPath, spec: TrimSpec) -> BezPath {
    let (mut start, mut end) = (f64::from(spec.start), f64::from(spec.end));
    if end - start <= 0.0 {
        return BezPath::new();
    }
    let shift = start.floor();
    start -= shift;
    end -= shift;
    if start <= 0.0 && end >= 1.0 {
        return path.clone();
    }

    let subpaths = split_subpaths(path);
    let mut out = BezPath::new();
    if spec.simultaneous {
        for segs in &subpaths {
            let lens: Vec<f64> = segs.iter().map(|s| s.arclen(ARCLEN_ACCURACY)).collect();
            emit_range(&mut out, segs, &lens, start, end);
        }
    } else {
        let segs: Vec<PathSeg> = subpaths.into_iter().flatten().collect();
        let lens: Vec<f64> = segs.iter().map(|s| s.arclen(ARCLEN_ACCURACY)).collect();
        emit_range(&mut out, &segs, &lens, start, end);
    }
    out
}

fn split_subpaths(path: &BezPath) -> Vec<Vec<PathSeg>> {
    let mut out = Vec::new();
    let mut sub = BezPath::new();
    for &el in path.elements() {
        if matches!(el, PathEl::MoveTo(_)) && !sub.elements().is_empty() {
            out.push(sub.segments().collect());
            sub = BezPath::new();
        }
        sub.push(el);
    }
    if !sub.elements().is_empty() {
        out.push(sub.segments().collect());
    }
    out
}

fn emit_range(out: &mut BezPath, segs: &[PathSeg], lens: &[f64], start: f64, end: f64) {
    let total: f64 = lens.iter().sum();
    if total <= 0.0 {
        return;
    }
    if end > 1.0 {
        emit_span(out, segs, lens, start * total, total);
        emit_span(out, segs, lens, 0.0, (end - 1.0) * total);
    } else {
        emit_span(out, segs, lens, start * total, end * total);
    }
}

fn emit_span(out: &mut BezPath, segs: &[PathSeg], lens: &[f64], from: f64, to: f64) {
    if to <= from {
        return;
    }
    let mut pos = 0.0;
    let mut pen = None;
    for (seg, &len) in segs.iter().zip(lens) {
        let (s0, s1) = (pos, pos + len);
        pos = s1;
        if s1 <= from || len <= 0.0 {
            continue;
        }
        if s0 >= to {
            break;
        }
        let t0 = if from > s0 {
            seg.inv_arclen(from - s0, ARCLEN_ACCURACY)
        } else {
            0.0
        };
        let t1 = if to < s1 {
            seg.inv_arclen(to - s0, ARCLEN_ACCURACY)
        } else {
            1.0
        };
        let piece = seg.subsegment(t0..t1);
        if pen != Some(piece.start()) {
            out.move_to(piece.start());
        }
        match piece {
            PathSeg::Line(l) => out.line_to(l.p1),
            PathSeg::Quad(q) => out.quad_to(q.p1, q.p2),
            PathSeg::Cubic(c) => out.curve_to(c.p1, c.p2, c.p3),
        }
        pen = Some(piece.end());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/shape.rs"]
mod tests;
