//! Layers: timing, transform, masks, mattes, effects and the root shape group.

use kurbo::{BezPath, Rect, Shape};

use crate::foundation::core::{BlendMode, Rgb8};
use crate::model::group::Group;
use crate::model::object::{ObjectKind, Transform};
use crate::model::property::Property;

/// Layer variant, as numbered by the `ty` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LayerKind {
    Precomp,
    Solid,
    Image,
    #[default]
    Null,
    Shape,
    Text,
}

impl LayerKind {
    /// Decode `ty`. Unsupported codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Precomp,
            1 => Self::Solid,
            2 => Self::Image,
            3 => Self::Null,
            4 => Self::Shape,
            5 => Self::Text,
            _ => return None,
        })
    }
}

/// How a mask combines with the masks before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MaskMode {
    None,
    #[default]
    Add,
    Subtract,
    Intersect,
    Lighten,
    Darken,
    Difference,
}

impl MaskMode {
    /// Decode the `mode` letter.
    pub fn from_code(code: &str) -> Self {
        match code {
            "n" => Self::None,
            "s" => Self::Subtract,
            "i" => Self::Intersect,
            "l" => Self::Lighten,
            "d" => Self::Darken,
            "f" => Self::Difference,
            _ => Self::Add,
        }
    }
}

/// One layer mask.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    /// Outline in layer space.
    pub path: Property<BezPath>,
    /// Opacity in percent.
    pub opacity: Property<f32>,
    /// Combination mode.
    pub mode: MaskMode,
    /// Invert coverage.
    pub inverted: bool,
}

/// Track matte mode of the layer drawn below its matte source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MatteMode {
    Alpha,
    AlphaInverted,
    Luma,
    LumaInverted,
}

impl MatteMode {
    /// Decode `tt`. Zero and unknown codes mean no matte.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Alpha),
            2 => Some(Self::AlphaInverted),
            3 => Some(Self::Luma),
            4 => Some(Self::LumaInverted),
            _ => None,
        }
    }
}

/// Layer effect parameters, resolved per frame into scene effects.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerEffect {
    /// Maps luminance between two colors.
    Tint {
        /// Color for black.
        black: Property<Rgb8>,
        /// Color for white.
        white: Property<Rgb8>,
        /// Blend amount in percent.
        intensity: Property<f32>,
    },
    /// Replaces color, keeping coverage.
    Fill {
        /// Fill color.
        color: Property<Rgb8>,
        /// Opacity in percent (0-1 in documents, stored as percent).
        opacity: Property<f32>,
    },
    /// Maps luminance across three colors.
    Tritone {
        /// Color for highlights.
        bright: Property<Rgb8>,
        /// Color for midtones.
        midtone: Property<Rgb8>,
        /// Color for shadows.
        dark: Property<Rgb8>,
        /// Blend with the original in percent.
        blend: Property<f32>,
    },
    /// Offset blurred shadow under the content.
    DropShadow {
        /// Shadow color.
        color: Property<Rgb8>,
        /// Opacity `0..=255`.
        opacity: Property<f32>,
        /// Direction in degrees, clockwise from up.
        angle: Property<f32>,
        /// Offset distance.
        distance: Property<f32>,
        /// Blur amount.
        softness: Property<f32>,
    },
    /// Gaussian blur.
    GaussianBlur {
        /// Blur amount.
        blurriness: Property<f32>,
        /// 1 both, 2 horizontal, 3 vertical.
        direction: i64,
        /// Repeat edge pixels.
        wrap: bool,
    },
}

/// Geometry built once at prepare time and reused for every frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerStatics {
    /// Viewport clip of a precomp layer.
    pub clipper: Option<BezPath>,
    /// Pre-built solid layer rectangle and its color.
    pub solid: Option<(BezPath, Rgb8)>,
}

/// One layer of a composition.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Document name.
    pub name: Option<String>,
    /// Variant.
    pub kind: LayerKind,
    /// `ind`, used by `parent` references and mattes.
    pub index: Option<i64>,
    /// `ind` of the parent layer.
    pub parent: Option<i64>,
    /// Layer transform.
    pub transform: Transform,
    /// Root shape group.
    pub group: Group,
    /// First visible frame (inclusive).
    pub in_frame: f32,
    /// Last visible frame (exclusive).
    pub out_frame: f32,
    /// Local time origin.
    pub start_frame: f32,
    /// Time stretch factor.
    pub time_stretch: f32,
    /// Time remap in seconds.
    pub time_remap: Option<Property<f32>>,
    /// Hidden layers keep only their transform (for children that parent to them).
    pub hidden: bool,
    /// Masks, applied in order.
    pub masks: Vec<Mask>,
    /// Matte mode when the previous layer is this layer's matte source.
    pub matte: Option<MatteMode>,
    /// This layer only serves as the matte of the next layer.
    pub matte_source: bool,
    /// Blend mode.
    pub blend: BlendMode,
    /// Effects, applied in order.
    pub effects: Vec<LayerEffect>,
    /// Referenced asset id (precomp and image layers).
    pub ref_id: Option<String>,
    /// Precomp viewport or solid size.
    pub width: f32,
    /// Precomp viewport or solid size.
    pub height: f32,
    /// Solid color.
    pub solid_color: Option<Rgb8>,
    statics: LayerStatics,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            name: None,
            kind: LayerKind::Null,
            index: None,
            parent: None,
            transform: Transform::default(),
            group: Group::default(),
            in_frame: 0.0,
            out_frame: f32::MAX,
            start_frame: 0.0,
            time_stretch: 1.0,
            time_remap: None,
            hidden: false,
            masks: Vec::new(),
            matte: None,
            matte_source: false,
            blend: BlendMode::Normal,
            effects: Vec::new(),
            ref_id: None,
            width: 0.0,
            height: 0.0,
            solid_color: None,
            statics: LayerStatics::default(),
        }
    }
}

impl Layer {
    /// One-time preparation after loading.
    ///
    /// A hidden layer becomes a `Null` layer and drops its content for good. Precomp layers
    /// get their viewport clipper and solid layers their fill rectangle. Finally the root
    /// group is classified.
    pub fn prepare(&mut self) {
        if self.hidden {
            self.kind = LayerKind::Null;
            self.group.children.clear();
            self.masks.clear();
            self.effects.clear();
            return;
        }

        let rect = Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height));
        match (self.kind, self.solid_color) {
            (LayerKind::Precomp, _) => self.statics.clipper = Some(rect.to_path(0.1)),
            (LayerKind::Solid, Some(color)) => self.statics.solid = Some((rect.to_path(0.1), color)),
            _ => {}
        }

        self.group.prepare(ObjectKind::Layer);
    }

    /// Prebuilt geometry.
    pub fn statics(&self) -> &LayerStatics {
        &self.statics
    }

    /// `true` when the layer is drawn at `frame` (in parent time).
    pub fn is_active(&self, frame: f32) -> bool {
        frame >= self.in_frame && frame < self.out_frame
    }

    /// Map a parent-time frame into the layer's content time.
    ///
    /// With a time remap the remapped seconds are converted at `frame_rate` and clamped at
    /// zero; otherwise the start frame is subtracted. The result is divided by the stretch.
    pub fn remap(&self, frame: f32, frame_rate: f32) -> f32 {
        let local = match &self.time_remap {
            Some(tm) => (tm.at(frame) * frame_rate).max(0.0),
            None => frame - self.start_frame,
        };
        let stretch = if self.time_stretch == 0.0 {
            1.0
        } else {
            self.time_stretch
        };
        local / stretch
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/layer.rs"]
mod tests;
