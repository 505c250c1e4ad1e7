//! Shape groups: paths, the fills and strokes they feed, trims and nested groups.
//!
//! Children are walked bottom to top. A fill or stroke becomes one shape at its own z
//! position and collects every path drawn above it, including paths of nested groups
//! (mapped back into the style's space).

use kurbo::{Affine, BezPath};
use smallvec::SmallVec;

use crate::builder::layer::SceneBuilder;
use crate::foundation::core::{Rgb8, Rgba8};
use crate::model::group::Group;
use crate::model::object::{
    GradientFill, GradientStroke, ImageObject, Object, SolidFill, SolidStroke, StrokeStyle,
    TrimMode, Trimpath, percent_to_u8,
};
use crate::model::property::Property;
use crate::render::paint::{Paint, PaintRef};
use crate::render::picture::Picture;
use crate::render::scene::Scene;
use crate::render::shape::{Shape, ShapeFill, StrokeSpec, TrimSpec, trim_path};

type Trims = SmallVec<[TrimSpec; 1]>;

/// A fill or stroke that is still collecting paths.
struct Style {
    shape: PaintRef,
    /// Current group space to the space of the group holding the style.
    to_owner: Affine,
    seen: bool,
    /// Paths are trimmed here instead of on the worker.
    eager: bool,
}

impl Style {
    fn add(&mut self, path: &BezPath, trims: &[TrimSpec]) {
        let mut paint = self.shape.lock();
        let Paint::Shape(shape) = &mut *paint else {
            return;
        };
        if !self.seen {
            self.seen = true;
            shape.trims = SmallVec::from_slice(trims);
        } else if !self.eager && shape.trims.as_slice() != trims {
            // Paths under different trims cannot share one worker-side pass.
            self.eager = true;
            let done = shape
                .trims
                .drain(..)
                .fold(std::mem::take(&mut shape.path), |p, t| trim_path(&p, t));
            shape.path = done;
        }
        let mut path = self.to_owner * path.clone();
        if self.eager {
            path = trims.iter().fold(path, |p, t| trim_path(&p, *t));
        }
        shape.path.extend(path.iter());
    }
}

impl SceneBuilder<'_, '_> {
    /// Build `group`'s children at `frame` into `out`.
    pub(crate) fn group_content(&self, group: &Group, frame: f32, out: &mut Scene) {
        let mut styles = Vec::new();
        self.children(group, frame, &mut styles, &[], out);
    }

    fn children(
        &self,
        group: &Group,
        frame: f32,
        styles: &mut Vec<Style>,
        inherited: &[TrimSpec],
        out: &mut Scene,
    ) {
        let base = styles.len();
        let mut trims = Trims::from_slice(inherited);

        for child in group.children.iter().rev() {
            match child {
                Object::Rect(r) => add_path(styles, &r.path(frame), &trims),
                Object::Ellipse(e) => add_path(styles, &e.path(frame), &trims),
                Object::Path(p) => add_path(styles, &p.path(frame), &trims),
                Object::Polystar(p) => add_path(styles, &p.path(frame), &trims),
                Object::SolidFill(f) => self.push_style(self.solid_fill(f, frame), styles, out),
                Object::SolidStroke(s) => {
                    self.push_style(self.solid_stroke(s, frame), styles, out)
                }
                Object::GradientFill(g) => {
                    self.push_style(self.gradient_fill(g, frame), styles, out)
                }
                Object::GradientStroke(g) => {
                    self.push_style(self.gradient_stroke(g, frame), styles, out)
                }
                Object::Trimpath(t) => {
                    if !t.is_identity() {
                        trims.push(trim_spec(t, frame));
                    }
                }
                Object::Image(img) => {
                    if let Some(p) = self.picture(img) {
                        out.push(p);
                    }
                }
                Object::Text(t) => match self.text(t, frame) {
                    Ok(scene) if !scene.paints().is_empty() => out.push(PaintRef::new(scene)),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%err, "text skipped"),
                },
                Object::Group(g) => self.nested(g, frame, styles, &trims, out),
                // Applied by whoever draws this group.
                Object::Transform(_) => {}
            }
        }

        for style in styles.drain(base..) {
            // Nothing above it: draws nothing.
            if !style.seen {
                let _ = out.remove(&style.shape);
            }
        }
    }

    fn nested(
        &self,
        group: &Group,
        frame: f32,
        styles: &mut Vec<Style>,
        trims: &[TrimSpec],
        out: &mut Scene,
    ) {
        if group.hidden || !group.visible() {
            return;
        }
        let (m, opacity) = group
            .transform()
            .map_or((Affine::IDENTITY, 255), |t| (t.matrix(frame), t.opacity(frame)));
        let saved: Vec<Affine> = styles.iter().map(|s| s.to_owner).collect();
        for s in styles.iter_mut() {
            s.to_owner = s.to_owner * m;
        }

        if group.allow_merge() {
            // Bare paths under a static transform: they only feed the styles above.
            self.children(group, frame, styles, trims, out);
        } else {
            let mut scene = Scene::new();
            self.children(group, frame, styles, trims, &mut scene);
            if !scene.paints().is_empty() {
                let state = scene.state_mut();
                state.transform = m;
                state.opacity = opacity;
                state.blend = group.blend;
                out.push(PaintRef::new(scene));
            }
        }

        for (s, m) in styles.iter_mut().zip(saved) {
            s.to_owner = m;
        }
    }

    fn push_style(&self, shape: Option<Shape>, styles: &mut Vec<Style>, out: &mut Scene) {
        let Some(shape) = shape else {
            return;
        };
        let shape = PaintRef::new(shape);
        out.push(shape.clone());
        styles.push(Style {
            shape,
            to_owner: Affine::IDENTITY,
            seen: false,
            eager: false,
        });
    }

    /// Registry color for a `[|name|]` tagged style, else the remapped document color.
    fn color(&self, name: Option<&str>, color: &Property<Rgb8>, frame: f32) -> Rgb8 {
        name.and_then(|n| self.cx.registry.resolve_tag(n))
            .unwrap_or_else(|| self.cx.remap.apply(color.at(frame)))
    }

    fn solid_fill(&self, f: &SolidFill, frame: f32) -> Option<Shape> {
        let alpha = percent_to_u8(f.opacity.at(frame));
        if alpha == 0 {
            return None;
        }
        let c = self.color(f.name.as_deref(), &f.color, frame);
        Some(Shape::filled(
            BezPath::new(),
            ShapeFill::Solid(Rgba8::new(c.r, c.g, c.b, alpha)),
            f.rule,
        ))
    }

    fn solid_stroke(&self, s: &SolidStroke, frame: f32) -> Option<Shape> {
        let alpha = percent_to_u8(s.opacity.at(frame));
        if alpha == 0 {
            return None;
        }
        let c = self.color(s.name.as_deref(), &s.color, frame);
        stroke_shape(&s.style, ShapeFill::Solid(Rgba8::new(c.r, c.g, c.b, alpha)), frame)
    }

    fn gradient_fill(&self, g: &GradientFill, frame: f32) -> Option<Shape> {
        let opacity = percent_to_u8(g.gradient.opacity.at(frame));
        let paint = g.gradient.fill(frame, opacity, self.cx.remap)?;
        Some(Shape::filled(BezPath::new(), ShapeFill::Gradient(paint), g.rule))
    }

    fn gradient_stroke(&self, g: &GradientStroke, frame: f32) -> Option<Shape> {
        let opacity = percent_to_u8(g.gradient.opacity.at(frame));
        let paint = g.gradient.fill(frame, opacity, self.cx.remap)?;
        stroke_shape(&g.style, ShapeFill::Gradient(paint), frame)
    }

    fn picture(&self, img: &ImageObject) -> Option<PaintRef> {
        let decoded = self.cx.images.get(&img.data)?;
        let (w, h) = if img.data.width > 0.0 && img.data.height > 0.0 {
            (f64::from(img.data.width), f64::from(img.data.height))
        } else {
            (f64::from(decoded.width()), f64::from(decoded.height()))
        };
        Some(PaintRef::new(Picture::new(decoded, w, h)))
    }
}

fn add_path(styles: &mut [Style], path: &BezPath, trims: &[TrimSpec]) {
    for s in styles {
        s.add(path, trims);
    }
}

fn stroke_shape(style: &StrokeStyle, paint: ShapeFill, frame: f32) -> Option<Shape> {
    let width = f64::from(style.width.at(frame));
    if width <= 0.0 {
        return None;
    }
    let mut shape = Shape::new(BezPath::new());
    shape.stroke = Some(StrokeSpec {
        width,
        cap: style.cap,
        join: style.join,
        miter_limit: f64::from(style.miter_limit),
        dash: style.dash_at(frame),
        paint,
    });
    Some(shape)
}

fn trim_spec(t: &Trimpath, frame: f32) -> TrimSpec {
    let (start, end) = t.segment(frame);
    TrimSpec {
        start,
        end,
        simultaneous: t.mode == TrimMode::Simultaneous,
    }
}
