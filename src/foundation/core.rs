pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Integer device-space region, `x/y` origin plus `w/h` extent.
///
/// Regions are half-open: a region covers pixels `x..x + w` by `y..y + h`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderRegion {
    /// Left edge in device pixels.
    pub x: i32,
    /// Top edge in device pixels.
    pub y: i32,
    /// Width in device pixels.
    pub w: i32,
    /// Height in device pixels.
    pub h: i32,
}

impl RenderRegion {
    /// The zero-area region at the origin.
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        w: 0,
        h: 0,
    };

    /// Build a region from origin and extent.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Smallest pixel-aligned region covering `rect`.
    pub fn from_rect(rect: Rect) -> Self {
        if !rect.is_finite() {
            return Self::ZERO;
        }
        let x0 = rect.x0.min(rect.x1).floor();
        let y0 = rect.y0.min(rect.y1).floor();
        let x1 = rect.x0.max(rect.x1).ceil();
        let y1 = rect.y0.max(rect.y1).ceil();
        let clamp = |v: f64| v.clamp(i32::MIN as f64 / 2.0, i32::MAX as f64 / 2.0) as i32;
        let (x0, y0, x1, y1) = (clamp(x0), clamp(y0), clamp(x1), clamp(y1));
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Right edge (exclusive).
    pub fn x2(self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// Bottom edge (exclusive).
    pub fn y2(self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// `true` when the region covers no pixels.
    pub fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Overlap of two regions; disjoint inputs collapse to a zero-extent region.
    pub fn intersect(self, other: Self) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());
        Self::new(x, y, (x2 - x).max(0), (y2 - y).max(0))
    }

    /// Bounding union of two regions. Empty operands are ignored.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let x2 = self.x2().max(other.x2());
        let y2 = self.y2().max(other.y2());
        Self::new(x, y, x2 - x, y2 - y)
    }

    /// Float rectangle with the same extent.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x2()),
            f64::from(self.y2()),
        )
    }
}

/// Straight (non-premultiplied) 8-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Black.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Build a color from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Decode the RGB part of a `0xAARRGGBB` value.
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            r: ((argb >> 16) & 0xff) as u8,
            g: ((argb >> 8) & 0xff) as u8,
            b: (argb & 0xff) as u8,
        }
    }

    /// Encode as `0xAARRGGBB` with the given alpha.
    pub const fn to_argb(self, a: u8) -> u32 {
        ((a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Build from unit-range float channels (`0.0..=1.0`), rounding half to even.
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: crate::foundation::math::unit_to_u8(r),
            g: crate::foundation::math::unit_to_u8(g),
            b: crate::foundation::math::unit_to_u8(b),
        }
    }
}

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Build a color from channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Decode a `0xAARRGGBB` value.
    pub const fn from_argb(argb: u32) -> Self {
        let c = Rgb8::from_argb(argb);
        Self::new(c.r, c.g, c.b, (argb >> 24) as u8)
    }

    /// RGB part of this color.
    pub const fn rgb(self) -> Rgb8 {
        Rgb8::new(self.r, self.g, self.b)
    }

    /// Premultiplied channel values.
    pub fn premultiplied(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let premul = |c: u8| crate::foundation::math::mul_div255_u8(u16::from(c), a);
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

/// Pixel layout of a caller-provided 32-bit frame buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ColorSpace {
    /// `0xAABBGGRR` words (RGBA bytes on little-endian), premultiplied.
    #[default]
    Abgr8888,
    /// `0xAARRGGBB` words, premultiplied.
    Argb8888,
    /// `0xAABBGGRR` words, straight alpha.
    Abgr8888S,
    /// `0xAARRGGBB` words, straight alpha.
    Argb8888S,
}

impl ColorSpace {
    /// Pack one premultiplied RGBA8 pixel into a buffer word.
    pub fn pack(self, px: [u8; 4]) -> u32 {
        let [r, g, b, a] = match self {
            Self::Abgr8888 | Self::Argb8888 => px,
            Self::Abgr8888S | Self::Argb8888S => unpremultiply(px),
        };
        let (r, g, b, a) = (u32::from(r), u32::from(g), u32::from(b), u32::from(a));
        match self {
            Self::Abgr8888 | Self::Abgr8888S => (a << 24) | (b << 16) | (g << 8) | r,
            Self::Argb8888 | Self::Argb8888S => (a << 24) | (r << 16) | (g << 8) | b,
        }
    }

    /// Inverse of [`ColorSpace::pack`], producing premultiplied RGBA8.
    pub fn unpack(self, word: u32) -> [u8; 4] {
        let a = (word >> 24) as u8;
        let hi = ((word >> 16) & 0xff) as u8;
        let mid = ((word >> 8) & 0xff) as u8;
        let lo = (word & 0xff) as u8;
        let straight_or_premul = match self {
            Self::Abgr8888 | Self::Abgr8888S => [lo, mid, hi, a],
            Self::Argb8888 | Self::Argb8888S => [hi, mid, lo, a],
        };
        match self {
            Self::Abgr8888 | Self::Argb8888 => straight_or_premul,
            Self::Abgr8888S | Self::Argb8888S => {
                let [r, g, b, a] = straight_or_premul;
                Rgba8::new(r, g, b, a).premultiplied()
            }
        }
    }
}

/// Layer and paint blend modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Add,
}

impl BlendMode {
    /// Decode the numeric `bm` code used by layer documents. Unknown codes map to `Normal`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Multiply,
            2 => Self::Screen,
            3 => Self::Overlay,
            4 => Self::Darken,
            5 => Self::Lighten,
            6 => Self::ColorDodge,
            7 => Self::ColorBurn,
            8 => Self::HardLight,
            9 => Self::SoftLight,
            10 => Self::Difference,
            11 => Self::Exclusion,
            12 => Self::Hue,
            13 => Self::Saturation,
            14 => Self::Color,
            15 => Self::Luminosity,
            16 => Self::Add,
            _ => Self::Normal,
        }
    }
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a16 = u32::from(a);
    let un = |c: u8| ((u32::from(c) * 255 + a16 / 2) / a16).min(255) as u8;
    [un(r), un(g), un(b), a]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
