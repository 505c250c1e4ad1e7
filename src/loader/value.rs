//! Decoding of animatable property values and their keyframes.

use kurbo::{BezPath, Point, Vec2};
use serde::Deserialize;
use serde_json::Value;

use crate::foundation::core::Rgb8;
use crate::loader::raw::{RawKeyframe, RawProp, RawTangent, RawTextDocument, flag};
use crate::model::composition::InterpolatorTable;
use crate::model::object::Position;
use crate::model::property::{Keyframe, Lerp, Property};
use crate::model::text::{Justify, TextDocument};

/// A property value type that can be read from its JSON form.
pub(crate) trait FromJson: Lerp {
    fn from_json(v: &Value) -> Option<Self>;
}

fn number(v: &Value) -> Option<f32> {
    match v {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::Array(items) => items.first().and_then(number),
        _ => None,
    }
}

fn numbers(v: &Value) -> Option<Vec<f32>> {
    match v {
        Value::Array(items) => items.iter().map(number).collect(),
        Value::Number(_) => number(v).map(|n| vec![n]),
        _ => None,
    }
}

impl FromJson for f32 {
    fn from_json(v: &Value) -> Option<Self> {
        number(v)
    }
}

impl FromJson for Vec2 {
    fn from_json(v: &Value) -> Option<Self> {
        let n = numbers(v)?;
        match n.as_slice() {
            [x, y, ..] => Some(Vec2::new(f64::from(*x), f64::from(*y))),
            [s] => Some(Vec2::new(f64::from(*s), f64::from(*s))),
            [] => None,
        }
    }
}

impl FromJson for Rgb8 {
    fn from_json(v: &Value) -> Option<Self> {
        if let Value::String(hex) = v {
            return parse_hex_color(hex);
        }
        let n = numbers(v)?;
        let [r, g, b, ..] = n.as_slice() else {
            return None;
        };
        // Some exporters write 0..255 channels instead of 0..1.
        let scale = if r.max(*g).max(*b) > 1.0 { 1.0 / 255.0 } else { 1.0 };
        Some(Rgb8::from_unit(r * scale, g * scale, b * scale))
    }
}

impl FromJson for Vec<f32> {
    fn from_json(v: &Value) -> Option<Self> {
        numbers(v)
    }
}

impl FromJson for BezPath {
    fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Array(items) => items.first().and_then(Self::from_json),
            Value::Object(_) => {
                let raw = RawBezier::deserialize(v).ok()?;
                Some(raw.to_path())
            }
            _ => None,
        }
    }
}

impl FromJson for TextDocument {
    fn from_json(v: &Value) -> Option<Self> {
        let raw = RawTextDocument::deserialize(v).ok()?;
        let defaults = TextDocument::default();
        let size = raw.s.unwrap_or(defaults.size);
        Some(TextDocument {
            text: raw.t,
            font: raw.f,
            size,
            fill: raw.fc.as_ref().and_then(Rgb8::from_json),
            stroke: raw.sc.as_ref().and_then(Rgb8::from_json),
            stroke_width: raw.sw,
            justify: Justify::from_code(raw.j),
            tracking: raw.tr,
            line_height: raw.lh.unwrap_or(size * 1.2),
            baseline_shift: raw.ls,
            box_size: raw.sz.map(|[w, h]| Vec2::new(f64::from(w), f64::from(h))),
            box_position: raw
                .ps
                .map_or(Vec2::ZERO, |[x, y]| Vec2::new(f64::from(x), f64::from(y))),
        })
    }
}

/// `#rrggbb` (or `#rgb`) to a color.
pub(crate) fn parse_hex_color(s: &str) -> Option<Rgb8> {
    let hex = s.trim().trim_start_matches('#');
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 | 8 => Some(Rgb8::new(channel(0)?, channel(2)?, channel(4)?)),
        3 => {
            let short = |i: usize| {
                let c = u8::from_str_radix(hex.get(i..=i)?, 16).ok()?;
                Some(c * 17)
            };
            Some(Rgb8::new(short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

#[derive(Deserialize)]
struct RawBezier {
    #[serde(default, deserialize_with = "flag")]
    c: bool,
    #[serde(default)]
    i: Vec<[f64; 2]>,
    #[serde(default)]
    o: Vec<[f64; 2]>,
    #[serde(default)]
    v: Vec<[f64; 2]>,
}

impl RawBezier {
    /// Vertices with in/out tangents relative to each vertex.
    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let n = self.v.len();
        if n == 0 {
            return path;
        }
        let pt = |a: [f64; 2]| Point::new(a[0], a[1]);
        let tangent = |list: &[[f64; 2]], i: usize| list.get(i).copied().unwrap_or([0.0, 0.0]);

        path.move_to(pt(self.v[0]));
        let segments = if self.c { n } else { n - 1 };
        for i in 0..segments {
            let next = (i + 1) % n;
            let (p0, p1) = (self.v[i], self.v[next]);
            let out = tangent(&self.o, i);
            let inc = tangent(&self.i, next);
            if out == [0.0, 0.0] && inc == [0.0, 0.0] {
                path.line_to(pt(p1));
            } else {
                path.curve_to(
                    pt([p0[0] + out[0], p0[1] + out[1]]),
                    pt([p1[0] + inc[0], p1[1] + inc[1]]),
                    pt(p1),
                );
            }
        }
        if self.c {
            path.close_path();
        }
        path
    }
}

fn tangent_point(t: &RawTangent) -> Option<(f32, f32)> {
    Some((number(&t.x)?, number(&t.y)?))
}

/// Reads properties, interning every easing curve into one shared table.
pub(crate) struct PropReader<'a> {
    interpolators: &'a mut InterpolatorTable,
}

impl<'a> PropReader<'a> {
    pub(crate) fn new(interpolators: &'a mut InterpolatorTable) -> Self {
        Self { interpolators }
    }

    /// Property from `raw`, or a constant `fallback` when absent or unreadable.
    pub(crate) fn prop<T: FromJson>(&mut self, raw: Option<&RawProp>, fallback: T) -> Property<T> {
        let Some(raw) = raw else {
            return Property::constant(fallback);
        };
        if raw.x.is_some() {
            tracing::debug!("property expressions are not evaluated");
        }
        let mut prop = match keyframe_items(raw) {
            Some(items) => {
                let frames = self.keyframes(items);
                Property::animated(frames, fallback)
            }
            None => Property::constant(T::from_json(&raw.k).unwrap_or(fallback)),
        };
        prop.sid = raw.sid.clone();
        prop
    }

    /// Property from `raw` with no fallback: `None` when the static value or any keyframe
    /// start value does not read as `T`.
    pub(crate) fn strict<T: FromJson>(&mut self, raw: &RawProp) -> Option<Property<T>> {
        let mut prop = match keyframe_items(raw) {
            Some(items) => {
                for item in items {
                    let key = RawKeyframe::deserialize(item).ok()?;
                    if let Some(s) = &key.s {
                        T::from_json(s)?;
                    }
                }
                let frames = self.keyframes::<T>(items);
                let first = frames.first()?.value.clone();
                Property::animated(frames, first)
            }
            None => Property::constant(T::from_json(&raw.k)?),
        };
        prop.sid = raw.sid.clone();
        Some(prop)
    }

    /// Strict counterpart of [`PropReader::position`].
    pub(crate) fn strict_position(&mut self, v: &Value) -> Option<Position> {
        let split = v.get("s").is_some_and(|s| matches!(s, Value::Bool(true)) || s.as_f64() == Some(1.0));
        let mut axis = |key: &str| {
            let raw = RawProp::deserialize(v.get(key)?).ok()?;
            self.strict(&raw)
        };
        if split {
            let x = axis("x")?;
            let y = axis("y")?;
            return Some(Position::Split { x, y });
        }
        let raw = RawProp::deserialize(v).ok()?;
        self.strict(&raw).map(Position::Combined)
    }

    /// Like [`PropReader::prop`], with every value multiplied by `factor`.
    pub(crate) fn scaled(&mut self, raw: Option<&RawProp>, fallback: f32, factor: f32) -> Property<f32> {
        let mut p = self.prop(raw, fallback / factor);
        p.value *= factor;
        for k in p.frames.iter_mut().flatten() {
            k.value *= factor;
        }
        p
    }

    /// Layer or group position: a combined point or split `x`/`y` channels.
    pub(crate) fn position(&mut self, raw: Option<&Value>) -> Position {
        let Some(v) = raw else {
            return Position::default();
        };
        let split = v.get("s").is_some_and(|s| matches!(s, Value::Bool(true)) || s.as_f64() == Some(1.0));
        if split {
            let axis = |key: &str| v.get(key).and_then(|a| RawProp::deserialize(a).ok());
            let (x, y) = (axis("x"), axis("y"));
            return Position::Split {
                x: self.prop(x.as_ref(), 0.0),
                y: self.prop(y.as_ref(), 0.0),
            };
        }
        let raw = RawProp::deserialize(v).ok();
        Position::Combined(self.prop(raw.as_ref(), Vec2::ZERO))
    }

    fn keyframes<T: FromJson>(&mut self, items: &[Value]) -> Vec<Keyframe<T>> {
        let mut out: Vec<Keyframe<T>> = Vec::with_capacity(items.len());
        let mut carried: Option<T> = None;
        for item in items {
            let Ok(raw) = RawKeyframe::deserialize(item) else {
                tracing::debug!("malformed keyframe skipped");
                continue;
            };
            // Legacy documents leave the last start value out and carry it in the previous
            // keyframe's end value.
            let value = match raw.s.as_ref().and_then(T::from_json) {
                Some(v) => v,
                None => match carried.take() {
                    Some(v) => v,
                    None => continue,
                },
            };
            carried = raw.e.as_ref().and_then(T::from_json);
            let interpolator = match (raw.o.as_ref(), raw.i.as_ref()) {
                (Some(o), Some(i)) => match (tangent_point(o), tangent_point(i)) {
                    (Some(o), Some(i)) => Some(self.interpolators.intern(o, i)),
                    _ => None,
                },
                _ => None,
            };
            out.push(Keyframe {
                time: raw.t,
                value,
                hold: raw.h,
                interpolator,
            });
        }
        out
    }
}

/// Keyframe list of an animated property, `None` for static values.
///
/// The `a` flag is not trusted on its own: a keyframe list is recognized by its shape.
fn keyframe_items(raw: &RawProp) -> Option<&[Value]> {
    let Value::Array(items) = &raw.k else {
        return None;
    };
    let keyed = items
        .first()
        .is_some_and(|first| first.as_object().is_some_and(|o| o.contains_key("t")));
    keyed.then_some(items.as_slice())
}

#[cfg(test)]
#[path = "../../tests/unit/loader/value.rs"]
mod tests;
