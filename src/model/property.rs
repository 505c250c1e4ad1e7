use std::sync::Arc;

use kurbo::{BezPath, PathEl, Point, Vec2};

use crate::foundation::core::Rgb8;
use crate::foundation::math::{lerp, lerp_u8};
use crate::model::interpolator::Interpolator;

/// Values that can be blended between two keyframes.
pub trait Lerp: Clone {
    /// Value at fraction `t` between `self` (`t == 0`) and `to` (`t == 1`).
    fn lerp(&self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        lerp(*self, *to, t)
    }
}

impl Lerp for Vec2 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *to, f64::from(t))
    }
}

impl Lerp for Rgb8 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Rgb8::new(
            lerp_u8(self.r, to.r, t),
            lerp_u8(self.g, to.g, t),
            lerp_u8(self.b, to.b, t),
        )
    }
}

impl Lerp for Vec<f32> {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        if self.len() != to.len() {
            return if t < 1.0 { self.clone() } else { to.clone() };
        }
        self.iter().zip(to).map(|(a, b)| lerp(*a, *b, t)).collect()
    }
}

impl Lerp for BezPath {
    /// Point-wise blend. Paths with a different element structure hold the start value.
    fn lerp(&self, to: &Self, t: f32) -> Self {
        let (a, b) = (self.elements(), to.elements());
        if a.len() != b.len() {
            return if t < 1.0 { self.clone() } else { to.clone() };
        }
        let t = f64::from(t);
        let p = |p0: Point, p1: Point| p0.lerp(p1, t);
        let mut out = BezPath::new();
        for (ea, eb) in a.iter().zip(b) {
            match (*ea, *eb) {
                (PathEl::MoveTo(a0), PathEl::MoveTo(b0)) => out.move_to(p(a0, b0)),
                (PathEl::LineTo(a0), PathEl::LineTo(b0)) => out.line_to(p(a0, b0)),
                (PathEl::QuadTo(a0, a1), PathEl::QuadTo(b0, b1)) => {
                    out.quad_to(p(a0, b0), p(a1, b1))
                }
                (PathEl::CurveTo(a0, a1, a2), PathEl::CurveTo(b0, b1, b2)) => {
                    out.curve_to(p(a0, b0), p(a1, b1), p(a2, b2))
                }
                (PathEl::ClosePath, PathEl::ClosePath) => out.close_path(),
                _ => return if t < 1.0 { self.clone() } else { to.clone() },
            }
        }
        out
    }
}

/// One keyframe. The segment toward the next keyframe uses this frame's easing.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe<T> {
    /// Frame number.
    pub time: f32,
    /// Value at `time`.
    pub value: T,
    /// Hold the value until the next keyframe instead of interpolating.
    pub hold: bool,
    /// Easing toward the next keyframe. `None` means linear.
    pub interpolator: Option<Arc<Interpolator>>,
}

impl<T> Keyframe<T> {
    /// Linear keyframe.
    pub fn new(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            hold: false,
            interpolator: None,
        }
    }
}

/// Static or keyframed value, optionally bound to a slot id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Property<T> {
    /// Static value, or the first keyframe's value for animated properties.
    pub value: T,
    /// Keyframes, sorted by time. `None` for static properties.
    pub frames: Option<Vec<Keyframe<T>>>,
    /// Slot id this property is bound to.
    pub sid: Option<String>,
}

impl<T: Lerp> Property<T> {
    /// Static property.
    pub fn constant(value: T) -> Self {
        Self {
            value,
            frames: None,
            sid: None,
        }
    }

    /// Animated property. An empty keyframe list falls back to `fallback`.
    pub fn animated(frames: Vec<Keyframe<T>>, fallback: T) -> Self {
        match frames.first() {
            None => Self::constant(fallback),
            Some(first) => Self {
                value: first.value.clone(),
                frames: Some(frames),
                sid: None,
            },
        }
    }

    /// Attach a slot id.
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// `true` when the value does not change over time.
    pub fn is_static(&self) -> bool {
        self.frames.as_ref().is_none_or(|f| f.len() < 2)
    }

    /// Value at `frame`. Outside the keyframe range the first/last value is held.
    pub fn at(&self, frame: f32) -> T {
        let Some(frames) = self.frames.as_deref() else {
            return self.value.clone();
        };
        let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
            return self.value.clone();
        };
        if frame <= first.time {
            return first.value.clone();
        }
        if frame >= last.time {
            return last.value.clone();
        }

        let i = frames.partition_point(|k| k.time <= frame).saturating_sub(1);
        let (cur, next) = (&frames[i], &frames[(i + 1).min(frames.len() - 1)]);
        let span = next.time - cur.time;
        if cur.hold || span <= 0.0 {
            return cur.value.clone();
        }
        let t = (frame - cur.time) / span;
        let t = match &cur.interpolator {
            Some(ease) => ease.progress(t),
            None => t,
        };
        cur.value.lerp(&next.value, t)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/property.rs"]
mod tests;
