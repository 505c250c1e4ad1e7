//! Post-processing effects attached to scenes.

use kurbo::Affine;

use crate::foundation::core::{RenderRegion, Rgb8};

/// Axis a Gaussian blur runs along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlurDirection {
    #[default]
    Both,
    Horizontal,
    Vertical,
}

impl BlurDirection {
    /// Decode the document's dimension code (`1` both, `2` horizontal, `3` vertical).
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::Horizontal,
            3 => Self::Vertical,
            _ => Self::Both,
        }
    }
}

/// Gaussian blur.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianBlur {
    /// Standard deviation in local units.
    pub sigma: f32,
    /// Axis.
    pub direction: BlurDirection,
    /// Sample across the opposite edge instead of clamping.
    pub wrap: bool,
    device_sigma: f32,
}

impl GaussianBlur {
    /// Blur with `sigma` in local units.
    pub fn new(sigma: f32, direction: BlurDirection, wrap: bool) -> Self {
        Self {
            sigma,
            direction,
            wrap,
            device_sigma: 0.0,
        }
    }

    /// Standard deviation in device pixels, available after prepare.
    pub fn device_sigma(&self) -> f32 {
        self.device_sigma
    }

    pub(crate) fn radius(&self) -> u32 {
        kernel_radius(self.device_sigma)
    }
}

/// Blurred, offset copy of the content's alpha drawn beneath it.
#[derive(Clone, Debug, PartialEq)]
pub struct DropShadow {
    /// Shadow color.
    pub color: Rgb8,
    /// Shadow opacity.
    pub opacity: u8,
    /// Direction in degrees, clockwise from up.
    pub angle: f32,
    /// Offset length in local units.
    pub distance: f32,
    /// Blur standard deviation in local units.
    pub sigma: f32,
    device: Option<ShadowGeometry>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ShadowGeometry {
    pub(crate) dx: i32,
    pub(crate) dy: i32,
    pub(crate) sigma: f32,
}

impl DropShadow {
    /// Shadow with local-space parameters.
    pub fn new(color: Rgb8, opacity: u8, angle: f32, distance: f32, sigma: f32) -> Self {
        Self {
            color,
            opacity,
            angle,
            distance,
            sigma,
            device: None,
        }
    }

    pub(crate) fn geometry(&self) -> Option<ShadowGeometry> {
        self.device
    }
}

/// Replace every color with one color, keeping coverage.
#[derive(Clone, Debug, PartialEq)]
pub struct FillEffect {
    /// Fill color.
    pub color: Rgb8,
    /// Opacity of the replacement.
    pub opacity: u8,
}

/// Map luminance onto a black→white color ramp.
#[derive(Clone, Debug, PartialEq)]
pub struct Tint {
    /// Color for black.
    pub black: Rgb8,
    /// Color for white.
    pub white: Rgb8,
    /// Amount in `0.0..=1.0`.
    pub intensity: f32,
}

/// Map luminance onto a shadow→midtone→highlight ramp.
#[derive(Clone, Debug, PartialEq)]
pub struct Tritone {
    /// Color for black.
    pub shadow: Rgb8,
    /// Color for mid grey.
    pub midtone: Rgb8,
    /// Color for white.
    pub highlight: Rgb8,
    /// Share of the original kept, `0.0..=1.0`.
    pub blend: f32,
}

/// Effect applied to a scene's flattened content.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum SceneEffect {
    GaussianBlur(GaussianBlur),
    DropShadow(DropShadow),
    Fill(FillEffect),
    Tint(Tint),
    Tritone(Tritone),
    /// Pushing this drops every effect attached so far.
    ClearAll,
}

impl SceneEffect {
    /// `true` when applying the effect would change anything.
    pub fn valid(&self) -> bool {
        match self {
            Self::GaussianBlur(b) => b.radius() > 0,
            Self::DropShadow(s) => s.opacity > 0 && s.device.is_some(),
            Self::Fill(f) => f.opacity > 0,
            Self::Tint(t) => t.intensity > 0.0,
            Self::Tritone(t) => t.blend < 1.0,
            Self::ClearAll => false,
        }
    }

    /// Resolve device-space parameters under `transform`.
    pub fn prepare(&mut self, transform: Affine) {
        let scale = transform.determinant().abs().sqrt() as f32;
        match self {
            Self::GaussianBlur(b) => b.device_sigma = (b.sigma * scale).max(0.0),
            Self::DropShadow(s) => {
                let angle = f64::from(s.angle).to_radians();
                let d = f64::from(s.distance * scale);
                s.device = Some(ShadowGeometry {
                    dx: (d * angle.sin()).round() as i32,
                    dy: (-d * angle.cos()).round() as i32,
                    sigma: (s.sigma * scale).max(0.0),
                });
            }
            _ => {}
        }
    }

    /// Bounds growth as an offset (`x`, `y`) plus extra extent (`w`, `h`).
    pub fn extent(&self) -> Option<RenderRegion> {
        match self {
            Self::GaussianBlur(b) => {
                let r = b.radius() as i32;
                if r == 0 {
                    return None;
                }
                Some(match b.direction {
                    BlurDirection::Both => RenderRegion::new(-r, -r, 2 * r, 2 * r),
                    BlurDirection::Horizontal => RenderRegion::new(-r, 0, 2 * r, 0),
                    BlurDirection::Vertical => RenderRegion::new(0, -r, 0, 2 * r),
                })
            }
            Self::DropShadow(s) => {
                let g = s.device?;
                let r = kernel_radius(g.sigma) as i32;
                Some(RenderRegion::new(
                    g.dx.min(0) - r,
                    g.dy.min(0) - r,
                    g.dx.abs() + 2 * r,
                    g.dy.abs() + 2 * r,
                ))
            }
            _ => None,
        }
    }
}

pub(crate) fn kernel_radius(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}
