//! Raw document items to model objects.

use std::collections::HashMap;

use kurbo::{BezPath, Vec2};
use serde::Deserialize;
use serde_json::Value;

use crate::assets::decode::is_data_uri;
use crate::color::remap::ColorRemap;
use crate::foundation::core::{BlendMode, Rgb8};
use crate::foundation::math::Fnv1a64;
use crate::loader::raw::{
    RawAsset, RawChar, RawDash, RawEffect, RawGradientShape, RawGradientStops, RawLayer, RawMask,
    RawProp, RawShape, RawText, RawTextAnimator, RawTransform,
};
use crate::loader::value::{FromJson, PropReader, parse_hex_color};
use crate::model::composition::{Glyph, InterpolatorTable};
use crate::model::gradient::{ColorStops, Gradient, GradientKind};
use crate::model::group::Group;
use crate::model::layer::{Layer, LayerEffect, LayerKind, Mask, MaskMode, MatteMode};
use crate::model::object::{
    DashEntry, EllipseShape, FillRule, GradientFill, GradientStroke, ImageData, ImageObject,
    LineCap, LineJoin, Object, PathShape, Polystar, RectShape, SolidFill, SolidStroke, StrokeStyle,
    Transform, TrimMode, Trimpath,
};
use crate::model::property::Property;
use crate::model::slot::{PropertyKind, PropertyValue};
use crate::model::text::{
    RangeBased, RangeShape, RangeStyle, RangeUnit, TextDocument, TextObject, TextRange,
};

/// Payload of an image asset, with the asset's slot id.
pub(crate) fn image_asset(raw: &RawAsset) -> ImageObject {
    let path = match (&raw.u, &raw.p) {
        (_, Some(p)) if raw.e || is_data_uri(p) => p.clone(),
        (Some(dir), Some(p)) => format!("{dir}{p}"),
        (None, Some(p)) => p.clone(),
        (_, None) => String::new(),
    };
    ImageObject {
        data: ImageData {
            path,
            width: raw.w.unwrap_or(0.0),
            height: raw.h.unwrap_or(0.0),
        },
        sid: raw.sid.clone(),
    }
}

pub(crate) struct Converter<'a> {
    reader: PropReader<'a>,
    remap: &'a ColorRemap,
    images: &'a HashMap<String, ImageObject>,
}

impl<'a> Converter<'a> {
    pub(crate) fn new(
        interpolators: &'a mut InterpolatorTable,
        remap: &'a ColorRemap,
        images: &'a HashMap<String, ImageObject>,
    ) -> Self {
        Self {
            reader: PropReader::new(interpolators),
            remap,
            images,
        }
    }

    fn prop<T: FromJson>(&mut self, raw: Option<&RawProp>, fallback: T) -> Property<T> {
        self.reader.prop(raw, fallback)
    }

    pub(crate) fn layers(&mut self, raw: &[RawLayer]) -> Vec<Layer> {
        raw.iter().map(|l| self.layer(l)).collect()
    }

    fn layer(&mut self, raw: &RawLayer) -> Layer {
        let kind = LayerKind::from_code(raw.ty).unwrap_or_else(|| {
            tracing::debug!(ty = raw.ty, name = ?raw.nm, "unsupported layer type kept as null");
            LayerKind::Null
        });

        let mut layer = Layer::default();
        layer.name = raw.nm.clone();
        layer.kind = kind;
        layer.index = raw.ind.map(|v| v as i64);
        layer.parent = raw.parent.map(|v| v as i64);
        layer.transform = self.transform(&raw.ks);
        layer.in_frame = raw.ip;
        layer.out_frame = raw.op;
        layer.start_frame = raw.st;
        layer.time_stretch = raw.sr;
        layer.time_remap = raw.tm.as_ref().map(|tm| self.prop(Some(tm), 0.0));
        layer.hidden = raw.hd;
        layer.masks = raw.masks.iter().map(|m| self.mask(m)).collect();
        layer.matte = raw.tt.and_then(MatteMode::from_code);
        layer.matte_source = raw.td;
        layer.blend = BlendMode::from_code(raw.bm);
        layer.effects = raw
            .ef
            .iter()
            .filter(|e| e.en)
            .filter_map(|e| self.effect(e))
            .collect();
        layer.ref_id = raw.ref_id.clone();

        let mut children = Vec::new();
        match kind {
            LayerKind::Shape => children = self.shapes(&raw.shapes),
            LayerKind::Precomp => {
                layer.width = raw.w.unwrap_or(0.0);
                layer.height = raw.h.unwrap_or(0.0);
            }
            LayerKind::Solid => {
                layer.width = raw.sw.unwrap_or(0.0);
                layer.height = raw.sh.unwrap_or(0.0);
                layer.solid_color = raw.sc.as_deref().and_then(parse_hex_color);
            }
            LayerKind::Image => match raw.ref_id.as_ref().and_then(|id| self.images.get(id)) {
                Some(img) => {
                    layer.width = img.data.width;
                    layer.height = img.data.height;
                    children.push(Object::Image(img.clone()));
                }
                None => tracing::warn!(ref_id = ?raw.ref_id, "image layer references no image asset"),
            },
            LayerKind::Text => {
                if let Some(t) = &raw.t {
                    let seed = text_seed(raw.nm.as_deref().unwrap_or_default(), raw.ind);
                    children.push(Object::Text(Box::new(self.text(t, seed))));
                }
            }
            LayerKind::Null => {}
        }
        let mut group = Group::new(children);
        group.name = raw.nm.clone();
        layer.group = group;
        layer
    }

    pub(crate) fn transform(&mut self, raw: &RawTransform) -> Transform {
        Transform {
            anchor: self.prop(raw.a.as_ref(), Vec2::ZERO),
            position: self.reader.position(raw.p.as_ref()),
            scale: self.prop(raw.s.as_ref(), Vec2::new(100.0, 100.0)),
            rotation: self.prop(raw.r.as_ref().or(raw.rz.as_ref()), 0.0),
            skew: self.prop(raw.sk.as_ref(), 0.0),
            skew_axis: self.prop(raw.sa.as_ref(), 0.0),
            opacity: self.prop(raw.o.as_ref(), 100.0),
        }
    }

    fn mask(&mut self, raw: &RawMask) -> Mask {
        Mask {
            path: self.prop(Some(&raw.pt), BezPath::new()),
            opacity: self.prop(raw.o.as_ref(), 100.0),
            mode: MaskMode::from_code(raw.mode.as_deref().unwrap_or("a")),
            inverted: raw.inv,
        }
    }

    fn effect(&mut self, raw: &RawEffect) -> Option<LayerEffect> {
        let v = |i: usize| raw.ef.get(i).and_then(|e| e.v.as_ref());
        Some(match raw.ty {
            20 => LayerEffect::Tint {
                black: self.prop(v(0), Rgb8::BLACK),
                white: self.prop(v(1), Rgb8::WHITE),
                intensity: self.prop(v(2), 100.0),
            },
            21 => LayerEffect::Fill {
                color: self.prop(v(2), Rgb8::new(255, 0, 0)),
                opacity: self.reader.scaled(v(6), 100.0, 100.0),
            },
            23 => LayerEffect::Tritone {
                bright: self.prop(v(0), Rgb8::WHITE),
                midtone: self.prop(v(1), Rgb8::new(128, 128, 128)),
                dark: self.prop(v(2), Rgb8::BLACK),
                blend: self.prop(v(3), 0.0),
            },
            25 => LayerEffect::DropShadow {
                color: self.prop(v(0), Rgb8::BLACK),
                opacity: self.prop(v(1), 128.0),
                angle: self.prop(v(2), 135.0),
                distance: self.prop(v(3), 5.0),
                softness: self.prop(v(4), 0.0),
            },
            29 => LayerEffect::GaussianBlur {
                blurriness: self.prop(v(0), 0.0),
                direction: self.prop(v(1), 1.0).value as i64,
                wrap: self.prop(v(2), 0.0).value != 0.0,
            },
            ty => {
                tracing::warn!(ty, name = ?raw.nm, "unsupported layer effect skipped");
                return None;
            }
        })
    }

    pub(crate) fn shapes(&mut self, raw: &[RawShape]) -> Vec<Object> {
        raw.iter().filter_map(|s| self.shape(s)).collect()
    }

    fn shape(&mut self, raw: &RawShape) -> Option<Object> {
        if hidden(raw) {
            return None;
        }
        Some(match raw {
            RawShape::Group(g) => {
                let mut group = Group::new(self.shapes(&g.it));
                group.name = g.nm.clone();
                group.blend = BlendMode::from_code(g.bm);
                group.hidden = g.hd;
                Object::Group(group)
            }
            RawShape::Rect(r) => Object::Rect(RectShape {
                position: self.prop(r.p.as_ref(), Vec2::ZERO),
                size: self.prop(r.s.as_ref(), Vec2::ZERO),
                roundness: self.prop(r.r.as_ref(), 0.0),
                clockwise: clockwise(r.d),
            }),
            RawShape::Ellipse(e) => Object::Ellipse(EllipseShape {
                position: self.prop(e.p.as_ref(), Vec2::ZERO),
                size: self.prop(e.s.as_ref(), Vec2::ZERO),
                clockwise: clockwise(e.d),
            }),
            RawShape::Path(p) => Object::Path(PathShape {
                path: self.prop(Some(&p.ks), BezPath::new()),
                clockwise: clockwise(p.d),
            }),
            RawShape::Polystar(s) => Object::Polystar(Polystar {
                star: s.sy != 2,
                position: self.prop(s.p.as_ref(), Vec2::ZERO),
                points: self.prop(s.pt.as_ref(), 5.0),
                rotation: self.prop(s.r.as_ref(), 0.0),
                inner_radius: self.prop(s.ir.as_ref(), 0.0),
                outer_radius: self.prop(s.or.as_ref(), 0.0),
                clockwise: clockwise(s.d),
            }),
            RawShape::Fill(f) => Object::SolidFill(SolidFill {
                name: f.nm.clone(),
                color: self.prop(f.c.as_ref(), Rgb8::BLACK),
                opacity: self.prop(f.o.as_ref(), 100.0),
                rule: fill_rule(f.r),
            }),
            RawShape::Stroke(s) => Object::SolidStroke(SolidStroke {
                name: s.nm.clone(),
                color: self.prop(s.c.as_ref(), Rgb8::BLACK),
                opacity: self.prop(s.o.as_ref(), 100.0),
                style: self.stroke_style(s.w.as_ref(), s.lc, s.lj, s.ml, &s.d),
            }),
            RawShape::GradientFill(g) => Object::GradientFill(GradientFill {
                gradient: self.gradient(g),
                rule: fill_rule(g.r),
            }),
            RawShape::GradientStroke(g) => Object::GradientStroke(GradientStroke {
                gradient: self.gradient(g),
                style: self.stroke_style(g.w.as_ref(), g.lc, g.lj, g.ml, &g.d),
            }),
            RawShape::Trim(t) => Object::Trimpath(Trimpath {
                start: self.prop(t.s.as_ref(), 0.0),
                end: self.prop(t.e.as_ref(), 100.0),
                offset: self.prop(t.o.as_ref(), 0.0),
                mode: if t.m == Some(2) {
                    TrimMode::Individual
                } else {
                    TrimMode::Simultaneous
                },
            }),
            RawShape::Transform(t) => Object::Transform(self.transform(t)),
            RawShape::Unsupported => {
                tracing::debug!("unsupported shape item skipped");
                return None;
            }
        })
    }

    fn stroke_style(
        &mut self,
        width: Option<&RawProp>,
        cap: Option<i64>,
        join: Option<i64>,
        miter_limit: Option<f32>,
        dash: &[RawDash],
    ) -> StrokeStyle {
        let dash = dash
            .iter()
            .filter_map(|d| {
                let v = self.prop(d.v.as_ref(), 0.0);
                match d.n.as_str() {
                    "d" => Some(DashEntry::Dash(v)),
                    "g" => Some(DashEntry::Gap(v)),
                    "o" => Some(DashEntry::Offset(v)),
                    _ => None,
                }
            })
            .collect();
        StrokeStyle {
            width: self.prop(width, 1.0),
            cap: match cap {
                Some(2) => LineCap::Round,
                Some(3) => LineCap::Square,
                _ => LineCap::Butt,
            },
            join: match join {
                Some(2) => LineJoin::Round,
                Some(3) => LineJoin::Bevel,
                _ => LineJoin::Miter,
            },
            miter_limit: miter_limit.unwrap_or(4.0),
            dash,
        }
    }

    fn color_stops(&mut self, raw: &RawGradientStops) -> ColorStops {
        ColorStops {
            count: raw.p,
            input: self.prop(Some(&raw.k), Vec::new()),
        }
    }

    fn gradient(&mut self, raw: &RawGradientShape) -> Gradient {
        let kind = if raw.t == 2 {
            GradientKind::Radial
        } else {
            GradientKind::Linear
        };
        let stops = self.color_stops(&raw.g);
        let mut g = Gradient::new(kind, stops, self.remap);
        g.start = self.prop(raw.s.as_ref(), Vec2::ZERO);
        g.end = self.prop(raw.e.as_ref(), Vec2::ZERO);
        g.height = self.prop(raw.h.as_ref(), 0.0);
        g.angle = self.prop(raw.a.as_ref(), 0.0);
        g.opacity = self.prop(raw.o.as_ref(), 100.0);
        g
    }

    fn text(&mut self, raw: &RawText, seed: u32) -> TextObject {
        TextObject {
            doc: self.prop(Some(&raw.d), TextDocument::default()),
            ranges: raw
                .a
                .iter()
                .enumerate()
                .map(|(i, a)| self.text_range(a, seed.wrapping_add(i as u32)))
                .collect(),
        }
    }

    fn text_range(&mut self, raw: &RawTextAnimator, seed: u32) -> TextRange {
        let sel = raw.s.as_ref();
        let style = &raw.a;
        TextRange {
            start: self.prop(sel.and_then(|s| s.s.as_ref()), 0.0),
            end: self.prop(sel.and_then(|s| s.e.as_ref()), 100.0),
            offset: self.prop(sel.and_then(|s| s.o.as_ref()), 0.0),
            min_ease: self.prop(sel.and_then(|s| s.ne.as_ref()), 0.0),
            max_ease: self.prop(sel.and_then(|s| s.xe.as_ref()), 0.0),
            max_amount: self.prop(sel.and_then(|s| s.a.as_ref()), 100.0),
            smoothness: self.prop(sel.and_then(|s| s.sm.as_ref()), 100.0),
            shape: RangeShape::from_code(sel.and_then(|s| s.sh).unwrap_or(1)),
            unit: if sel.and_then(|s| s.r) == Some(2) {
                RangeUnit::Index
            } else {
                RangeUnit::Percent
            },
            based: RangeBased::from_code(sel.and_then(|s| s.b).unwrap_or(1)),
            random: if sel.is_some_and(|s| s.rn) { seed.max(1) } else { 0 },
            style: RangeStyle {
                position: style.p.as_ref().map(|p| self.prop(Some(p), Vec2::ZERO)),
                scale: style.s.as_ref().map(|p| self.prop(Some(p), Vec2::new(100.0, 100.0))),
                rotation: style.r.as_ref().map(|p| self.prop(Some(p), 0.0)),
                opacity: style.o.as_ref().map(|p| self.prop(Some(p), 100.0)),
                fill_color: style.fc.as_ref().map(|p| self.prop(Some(p), Rgb8::BLACK)),
                stroke_color: style.sc.as_ref().map(|p| self.prop(Some(p), Rgb8::BLACK)),
                tracking: style.t.as_ref().map(|p| self.prop(Some(p), 0.0)),
            },
        }
    }

    /// Glyph outline from the static paths of a `chars` entry.
    ///
    /// Outlines and advances are authored at size 100 whatever the entry's `size` says.
    pub(crate) fn glyph(&mut self, raw: &RawChar) -> Glyph {
        let mut outline = BezPath::new();
        if let Some(data) = &raw.data {
            self.collect_outline(&data.shapes, &mut outline);
        }
        Glyph {
            ch: raw.ch.clone(),
            family: raw.family.clone(),
            style: raw.style.clone(),
            size: 100.0,
            advance: raw.w,
            outline,
        }
    }

    fn collect_outline(&mut self, shapes: &[RawShape], out: &mut BezPath) {
        for s in shapes {
            match s {
                RawShape::Group(g) => self.collect_outline(&g.it, out),
                RawShape::Path(p) => {
                    let path = self.prop(Some(&p.ks), BezPath::new()).at(0.0);
                    out.extend(path.iter());
                }
                _ => {}
            }
        }
    }

    /// Slot payload `p` read as a value of `kind`. `None` when it does not fit.
    pub(crate) fn slot_value(&mut self, kind: PropertyKind, p: &Value) -> Option<PropertyValue> {
        let raw = || RawProp::deserialize(p).ok();
        Some(match kind {
            PropertyKind::Position => PropertyValue::Position(self.reader.strict_position(p)?),
            PropertyKind::Scale => PropertyValue::Scale(self.reader.strict(&raw()?)?),
            PropertyKind::Rotation => PropertyValue::Rotation(self.reader.strict(&raw()?)?),
            PropertyKind::Opacity => PropertyValue::Opacity(self.reader.strict(&raw()?)?),
            PropertyKind::Color => PropertyValue::Color(self.reader.strict(&raw()?)?),
            PropertyKind::ColorStop => {
                let raw = RawGradientStops::deserialize(p).ok()?;
                PropertyValue::ColorStop(ColorStops {
                    count: raw.p,
                    input: self.reader.strict(&raw.k)?,
                })
            }
            PropertyKind::TextDoc => PropertyValue::TextDoc(self.reader.strict(&raw()?)?),
            PropertyKind::Image => {
                let raw = RawAsset::deserialize(p).ok()?;
                PropertyValue::Image(image_asset(&raw).data)
            }
        })
    }
}

fn hidden(raw: &RawShape) -> bool {
    match raw {
        RawShape::Rect(r) => r.hd,
        RawShape::Ellipse(e) => e.hd,
        RawShape::Path(p) => p.hd,
        RawShape::Polystar(s) => s.hd,
        RawShape::Fill(f) => f.hd,
        RawShape::Stroke(s) => s.hd,
        RawShape::GradientFill(g) | RawShape::GradientStroke(g) => g.hd,
        RawShape::Trim(t) => t.hd,
        RawShape::Group(_) | RawShape::Transform(_) | RawShape::Unsupported => false,
    }
}

/// Direction `3` winds counter-clockwise.
fn clockwise(d: Option<i64>) -> bool {
    d != Some(3)
}

fn fill_rule(r: Option<i64>) -> FillRule {
    if r == Some(2) {
        FillRule::EvenOdd
    } else {
        FillRule::NonZero
    }
}

/// Stable per-layer seed for randomized text ranges.
fn text_seed(name: &str, index: Option<f64>) -> u32 {
    let mut h = Fnv1a64::new_default();
    h.write_bytes(name.as_bytes());
    h.write_u32(index.map_or(0, |i| i as u32));
    h.finish() as u32
}
