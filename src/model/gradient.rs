//! Gradient stop merging and fill resolution.
//!
//! Documents store a gradient as one flat float array: `count` color samples
//! `(offset, r, g, b)` followed by alpha samples `(offset, a)`. The two halves are sampled
//! independently and rarely share offsets, so rendering needs a merged stop list with both
//! color and alpha at every offset.

use kurbo::{Point, Vec2};
use smallvec::SmallVec;

use crate::color::remap::ColorRemap;
use crate::foundation::core::{Rgb8, Rgba8};
use crate::foundation::math::{EPSILON, equal, lerp_u8, mul_div255_u8, unit_to_u8, zero};
use crate::model::property::Property;

/// Inline capacity for merged stop lists.
pub type StopList = SmallVec<[GradientStop; 8]>;

/// One merged gradient stop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient, `0.0..=1.0`.
    pub offset: f32,
    /// Straight-alpha color.
    pub color: Rgba8,
}

/// Output of [`merge_stops`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedStops {
    /// Stops with non-decreasing offsets.
    pub stops: StopList,
    /// `false` once any emitted alpha is below 255.
    pub opaque: bool,
}

/// Merge interleaved color and alpha samples into one stop list.
///
/// `count` is the number of color samples at the head of `input`; the remainder holds alpha
/// samples. Every emitted color goes through `remap`.
pub fn merge_stops(input: &[f32], count: usize, remap: &ColorRemap) -> MergedStops {
    let n = input.len();
    let clast = (count * 4).min(n) / 4 * 4;
    let alpha_end = clast + (n - clast) / 2 * 2;

    let channel = |i: usize| unit_to_u8(input[i]);
    let rgb_at = |i: usize| Rgb8::new(channel(i + 1), channel(i + 2), channel(i + 3));

    let mut out = MergedStops {
        stops: StopList::new(),
        opaque: true,
    };
    let emit = |out: &mut MergedStops, offset: f32, rgb: Rgb8, a: u8| {
        if a < 255 {
            out.opaque = false;
        }
        let rgb = remap.apply(rgb);
        out.stops.push(GradientStop {
            offset,
            color: Rgba8::new(rgb.r, rgb.g, rgb.b, a),
        });
    };

    let (mut cidx, mut aidx) = (0, clast);
    while cidx < clast && aidx < alpha_end {
        let (coff, aoff) = (input[cidx], input[aidx]);
        if coff == aoff {
            emit(&mut out, coff, rgb_at(cidx), channel(aidx + 1));
            cidx += 4;
            aidx += 2;
        } else if coff < aoff {
            let next_a = channel(aidx + 1);
            let a = match out.stops.last() {
                Some(last) => lerp_u8(last.color.a, next_a, fraction(last.offset, coff, aoff)),
                None => next_a,
            };
            emit(&mut out, coff, rgb_at(cidx), a);
            cidx += 4;
        } else {
            let next = rgb_at(cidx);
            let rgb = match out.stops.last() {
                Some(last) => {
                    let p = fraction(last.offset, aoff, coff);
                    Rgb8::new(
                        lerp_u8(last.color.r, next.r, p),
                        lerp_u8(last.color.g, next.g, p),
                        lerp_u8(last.color.b, next.b, p),
                    )
                }
                None => next,
            };
            emit(&mut out, aoff, rgb, channel(aidx + 1));
            aidx += 2;
        }
    }

    while cidx < clast {
        let a = out.stops.last().map_or(255, |s| s.color.a);
        emit(&mut out, input[cidx], rgb_at(cidx), a);
        cidx += 4;
    }

    while aidx < alpha_end {
        let rgb = out.stops.last().map_or(Rgb8::WHITE, |s| s.color.rgb());
        emit(&mut out, input[aidx], rgb, channel(aidx + 1));
        aidx += 2;
    }

    out
}

/// Position of `cur` between `from` and `to`.
fn fraction(from: f32, cur: f32, to: f32) -> f32 {
    let span = to - from;
    if span.abs() <= EPSILON {
        return 1.0;
    }
    ((cur - from) / span).clamp(0.0, 1.0)
}

/// Flat stop samples plus the number of color samples at their head.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorStops {
    /// Number of `(offset, r, g, b)` samples.
    pub count: usize,
    /// Raw samples, keyframed.
    pub input: Property<Vec<f32>>,
}

/// Linear or radial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
}

/// Gradient definition shared by gradient fills and strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    /// Linear or radial.
    pub kind: GradientKind,
    /// Start point (radial: center).
    pub start: Property<Vec2>,
    /// End point (radial: defines the radius and highlight direction).
    pub end: Property<Vec2>,
    /// Highlight length in percent (radial only).
    pub height: Property<f32>,
    /// Highlight angle in degrees (radial only).
    pub angle: Property<f32>,
    /// Opacity in percent.
    pub opacity: Property<f32>,
    /// Stop samples.
    pub stops: ColorStops,
    opaque: bool,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            kind: GradientKind::default(),
            start: Property::constant(Vec2::ZERO),
            end: Property::constant(Vec2::ZERO),
            height: Property::constant(0.0),
            angle: Property::constant(0.0),
            opacity: Property::constant(100.0),
            stops: ColorStops::default(),
            opaque: true,
        }
    }
}

/// Resolved gradient geometry in local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientGeometry {
    /// Axis from `start` to `end`.
    Linear {
        /// Offset 0.
        start: Point,
        /// Offset 1.
        end: Point,
    },
    /// Circle at `center` with a focal point of radius zero.
    Radial {
        /// End circle center.
        center: Point,
        /// End circle radius.
        radius: f64,
        /// Start point (highlight).
        focal: Point,
    },
}

/// Gradient resolved at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientPaint {
    /// Geometry.
    pub geometry: GradientGeometry,
    /// Merged stops with fill opacity applied.
    pub stops: StopList,
}

impl Gradient {
    /// Build a gradient and run [`Gradient::prepare`] on it.
    pub fn new(kind: GradientKind, stops: ColorStops, remap: &ColorRemap) -> Self {
        let mut g = Self {
            kind,
            stops,
            ..Self::default()
        };
        g.prepare(remap);
        g
    }

    /// Merge every stored sample set once to settle the `opaque` flag.
    ///
    /// The flag only ever clears; replacing the stops later cannot make a gradient opaque
    /// again.
    pub fn prepare(&mut self, remap: &ColorRemap) {
        let count = self.stops.count;
        let mut opaque = merge_stops(&self.stops.input.value, count, remap).opaque;
        for k in self.stops.input.frames.iter().flatten() {
            opaque &= merge_stops(&k.value, count, remap).opaque;
        }
        self.opaque &= opaque;
    }

    /// `true` while no stop has ever been translucent.
    pub fn opaque(&self) -> bool {
        self.opaque
    }

    /// Merged stops at `frame`.
    pub fn stops_at(&self, frame: f32, remap: &ColorRemap) -> StopList {
        merge_stops(&self.stops.input.at(frame), self.stops.count, remap).stops
    }

    /// Resolve the gradient at `frame`. `opacity == 0` yields `None`.
    pub fn fill(&self, frame: f32, opacity: u8, remap: &ColorRemap) -> Option<GradientPaint> {
        if opacity == 0 {
            return None;
        }
        let s = self.start.at(frame).to_point();
        let e = self.end.at(frame).to_point();

        let geometry = match self.kind {
            GradientKind::Linear => GradientGeometry::Linear { start: s, end: e },
            GradientKind::Radial => {
                let w = (e.x - s.x).abs();
                let h = (e.y - s.y).abs();
                let radius = if w > h { w + 0.375 * h } else { h + 0.375 * w };
                let mut progress = self.height.at(frame) * 0.01;
                let focal = if zero(progress) {
                    s
                } else {
                    if equal(progress, 1.0) {
                        progress = 0.99;
                    }
                    let start_angle = (e.y - s.y).atan2(e.x - s.x).to_degrees();
                    let angle = (start_angle + f64::from(self.angle.at(frame))).to_radians();
                    let d = f64::from(progress) * radius;
                    Point::new(s.x + angle.cos() * d, s.y + angle.sin() * d)
                };
                GradientGeometry::Radial {
                    center: s,
                    radius,
                    focal,
                }
            }
        };

        let mut stops = self.stops_at(frame, remap);
        if opacity < 255 {
            for stop in &mut stops {
                stop.color.a = mul_div255_u8(u16::from(stop.color.a), u16::from(opacity));
            }
        }
        Some(GradientPaint { geometry, stops })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/gradient.rs"]
mod tests;
