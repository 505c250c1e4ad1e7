//! Color substitution applied while resolving fills, strokes and gradient stops.
//!
//! Two modes:
//!
//! - **exact**: a color equal to a registered source is replaced by its target;
//! - **offset**: the hue/saturation/value delta between the first registered pair is applied
//!   to every color, shifting whole palettes at once.

use std::collections::BTreeMap;

use crate::foundation::core::Rgb8;

/// Hue/saturation/value triple. `h` in degrees, `s` and `v` in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hsv {
    /// Hue in degrees `0.0..360.0`.
    pub h: f32,
    /// Saturation.
    pub s: f32,
    /// Value.
    pub v: f32,
}

impl Hsv {
    /// Convert an 8-bit RGB color.
    pub fn from_rgb(c: Rgb8) -> Self {
        let (r, g, b) = (f32::from(c.r), f32::from(c.g), f32::from(c.b));
        let min = r.min(g).min(b);
        let max = r.max(g).max(b);
        let mut out = Self {
            h: 0.0,
            s: 0.0,
            v: max / 255.0,
        };
        let delta = max - min;
        if delta < 0.00001 {
            return out;
        }
        out.s = delta / max;
        out.h = if r >= max {
            (g - b) / delta
        } else if g >= max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        } * 60.0;
        if out.h < 0.0 {
            out.h += 360.0;
        }
        out
    }
}

/// Rotate hue by `hue` degrees, scaling chroma by `sat` and brightness by `val`.
///
/// Uses the luminance-preserving rotation about the gray axis, so `sat == 1` and
/// `val == 1` with `hue == 0` is the identity.
pub fn shift_hsv(c: Rgb8, hue: f32, sat: f32, val: f32) -> Rgb8 {
    let rad = hue.to_radians();
    let cos_a = sat * rad.cos();
    let sin_a = sat * rad.sin();

    let third = 1.0f32 / 3.0;
    let root_third = third.sqrt();
    let one_minus_cos = 1.0 - cos_a;
    let third_of_one_minus_cos = third * one_minus_cos;
    let root_third_sin = root_third * sin_a;
    let plus = third_of_one_minus_cos + root_third_sin;
    let minus = third_of_one_minus_cos - root_third_sin;

    let m = [
        [cos_a + one_minus_cos / 3.0, minus, plus],
        [plus, cos_a + third_of_one_minus_cos, minus],
        [minus, plus, cos_a + third_of_one_minus_cos],
    ];
    let (r, g, b) = (f32::from(c.r), f32::from(c.g), f32::from(c.b));
    let channel = |row: [f32; 3]| clamp_channel((r * row[0] + g * row[1] + b * row[2]) * val);
    Rgb8::new(channel(m[0]), channel(m[1]), channel(m[2]))
}

fn clamp_channel(v: f32) -> u8 {
    if v < 0.0 {
        0
    } else if v > 255.0 {
        255
    } else {
        v as u8
    }
}

/// Little-endian `r | g << 8 | b << 16` packing used as the table key.
fn key(c: Rgb8) -> u32 {
    u32::from(c.r) | (u32::from(c.g) << 8) | (u32::from(c.b) << 16)
}

fn from_key(k: u32) -> Rgb8 {
    Rgb8::new((k & 0xff) as u8, ((k >> 8) & 0xff) as u8, ((k >> 16) & 0xff) as u8)
}

/// Color substitution table.
///
/// Stateless during rendering: once built at load time it is only read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorRemap {
    table: BTreeMap<u32, u32>,
    offset_mode: bool,
}

impl ColorRemap {
    /// Empty table in exact-match mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(source, replacement)` pairs of `0xAARRGGBB` colors. Alpha is ignored.
    pub fn from_pairs(pairs: &[(u32, u32)], offset_mode: bool) -> Self {
        let mut out = Self {
            table: BTreeMap::new(),
            offset_mode,
        };
        for &(from, to) in pairs {
            out.register(from, to);
        }
        out
    }

    /// Add or replace one substitution. Later registrations of the same source win.
    pub fn register(&mut self, from_argb: u32, to_argb: u32) -> &mut Self {
        self.table
            .insert(key(Rgb8::from_argb(from_argb)), key(Rgb8::from_argb(to_argb)));
        self
    }

    /// Switch between exact-match and offset mode.
    pub fn set_offset_mode(&mut self, on: bool) -> &mut Self {
        self.offset_mode = on;
        self
    }

    /// `true` when offset mode is active.
    pub fn offset_mode(&self) -> bool {
        self.offset_mode
    }

    /// `true` when no substitutions are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Substitute one color. Unmatched colors (and every color of an empty table) pass through.
    pub fn apply(&self, c: Rgb8) -> Rgb8 {
        if self.offset_mode {
            return match self.table.iter().next() {
                Some((&from, &to)) => shift_toward(c, from_key(from), from_key(to)),
                None => c,
            };
        }
        match self.table.get(&key(c)) {
            Some(&to) => from_key(to),
            None => c,
        }
    }
}

fn shift_toward(c: Rgb8, from: Rgb8, to: Rgb8) -> Rgb8 {
    let from = Hsv::from_rgb(from);
    let to = Hsv::from_rgb(to);
    let cur = Hsv::from_rgb(c);
    shift_hsv(
        c,
        to.h - from.h,
        (cur.s + (to.s - from.s)).clamp(0.0, 1.0),
        (cur.v + (to.v - from.v)).clamp(0.0, 1.0),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/color/remap.rs"]
mod tests;
