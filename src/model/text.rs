//! Text documents and range selectors.

use kurbo::Vec2;

use crate::foundation::core::Rgb8;
use crate::foundation::math::{equal, zero};
use crate::model::interpolator::Interpolator;
use crate::model::property::{Lerp, Property};

/// Horizontal alignment of text lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum Justify {
    #[default]
    Left,
    Right,
    Center,
}

impl Justify {
    /// Decode the numeric `j` code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Right,
            2 => Self::Center,
            _ => Self::Left,
        }
    }
}

/// One text document keyframe value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextDocument {
    /// Content. `\r` and `\n` break lines.
    pub text: String,
    /// Font name, resolved against the composition font table.
    pub font: String,
    /// Font size in pixels.
    pub size: f32,
    /// Fill color.
    pub fill: Option<Rgb8>,
    /// Stroke color.
    pub stroke: Option<Rgb8>,
    /// Stroke width.
    pub stroke_width: f32,
    /// Line alignment.
    pub justify: Justify,
    /// Extra advance per glyph, in thousandths of an em.
    pub tracking: f32,
    /// Distance between baselines.
    pub line_height: f32,
    /// Vertical baseline offset.
    pub baseline_shift: f32,
    /// Paragraph box size, when the text is boxed.
    pub box_size: Option<Vec2>,
    /// Paragraph box origin.
    pub box_position: Vec2,
}

impl Default for TextDocument {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: String::new(),
            size: 12.0,
            fill: Some(Rgb8::BLACK),
            stroke: None,
            stroke_width: 0.0,
            justify: Justify::Left,
            tracking: 0.0,
            line_height: 14.4,
            baseline_shift: 0.0,
            box_size: None,
            box_position: Vec2::ZERO,
        }
    }
}

impl Lerp for TextDocument {
    /// Documents never blend; the start value holds until the next keyframe.
    fn lerp(&self, to: &Self, t: f32) -> Self {
        if t < 1.0 { self.clone() } else { to.clone() }
    }
}

/// Selector shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RangeShape {
    #[default]
    Square,
    RampUp,
    RampDown,
    Triangle,
    Round,
    Smooth,
}

impl RangeShape {
    /// Decode the numeric `sh` code (1-based).
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::RampUp,
            3 => Self::RampDown,
            4 => Self::Triangle,
            5 => Self::Round,
            6 => Self::Smooth,
            _ => Self::Square,
        }
    }
}

/// Units of `start`, `end` and `offset`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RangeUnit {
    /// Percent of the text length.
    #[default]
    Percent,
    /// Glyph index.
    Index,
}

/// What a selector index counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RangeBased {
    #[default]
    Chars,
    CharsExcludingSpaces,
    Words,
    Lines,
}

impl RangeBased {
    /// Decode the numeric `b` code (1-based).
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::CharsExcludingSpaces,
            3 => Self::Words,
            4 => Self::Lines,
            _ => Self::Chars,
        }
    }
}

/// Per-glyph properties a range selector blends in by its factor.
#[derive(Clone, Debug, Default, PartialEq)]
#[allow(missing_docs)]
pub struct RangeStyle {
    pub position: Option<Property<Vec2>>,
    pub scale: Option<Property<Vec2>>,
    pub rotation: Option<Property<f32>>,
    pub opacity: Option<Property<f32>>,
    pub fill_color: Option<Property<Rgb8>>,
    pub stroke_color: Option<Property<Rgb8>>,
    pub tracking: Option<Property<f32>>,
}

/// Text animator range.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRange {
    /// Range start.
    pub start: Property<f32>,
    /// Range end.
    pub end: Property<f32>,
    /// Shift applied to both ends.
    pub offset: Property<f32>,
    /// Low-side easing in percent.
    pub min_ease: Property<f32>,
    /// High-side easing in percent.
    pub max_ease: Property<f32>,
    /// Output scale in percent.
    pub max_amount: Property<f32>,
    /// Square edge softness in percent.
    pub smoothness: Property<f32>,
    /// Shape function.
    pub shape: RangeShape,
    /// Units.
    pub unit: RangeUnit,
    /// Index basis.
    pub based: RangeBased,
    /// Random seed. Zero disables randomization.
    pub random: u32,
    /// Modulated properties.
    pub style: RangeStyle,
}

impl Default for TextRange {
    fn default() -> Self {
        Self {
            start: Property::constant(0.0),
            end: Property::constant(100.0),
            offset: Property::constant(0.0),
            min_ease: Property::constant(0.0),
            max_ease: Property::constant(0.0),
            max_amount: Property::constant(100.0),
            smoothness: Property::constant(100.0),
            shape: RangeShape::Square,
            unit: RangeUnit::Percent,
            based: RangeBased::Chars,
            random: 0,
            style: RangeStyle::default(),
        }
    }
}

impl TextRange {
    /// Weight of glyph `idx` out of `total_len` at `frame`, scaled by `max_amount`.
    pub fn factor(&self, frame: f32, total_len: f32, idx: f32) -> f32 {
        let offset = self.offset.at(frame);
        let mut start = self.start.at(frame) + offset;
        let mut end = self.end.at(frame) + offset;

        if self.random > 0 {
            let range = end - start;
            let len = match self.unit {
                RangeUnit::Percent => 100.0,
                RangeUnit::Index => total_len,
            };
            let span = (len - range) as i64;
            start = if span > 0 {
                (i64::from(self.random) % span) as f32
            } else {
                0.0
            };
            end = start + range;
        }

        let divisor = match self.unit {
            RangeUnit::Percent => 100.0 / total_len,
            RangeUnit::Index => 1.0,
        };
        start /= divisor;
        end /= divisor;

        let f = match self.shape {
            RangeShape::Square => {
                let smoothness = self.smoothness.at(frame);
                if zero(smoothness) {
                    if idx >= start.ceil() && idx < end.ceil() {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    let mut f = 0.0;
                    if idx >= start.floor() {
                        let diff = idx - start;
                        f = if diff < 0.0 {
                            end.min(1.0) + diff
                        } else {
                            end - idx
                        };
                    }
                    let smoothness = smoothness * 0.01;
                    (f - (1.0 - smoothness) * 0.5) / smoothness
                }
            }
            RangeShape::RampUp => {
                if equal(start, end) {
                    if idx >= end { 1.0 } else { 0.0 }
                } else {
                    (0.5 + idx - start) / (end - start)
                }
            }
            RangeShape::RampDown => {
                if equal(start, end) {
                    if idx >= end { 0.0 } else { 1.0 }
                } else {
                    1.0 - (0.5 + idx - start) / (end - start)
                }
            }
            RangeShape::Triangle => {
                let f = if equal(start, end) {
                    0.0
                } else {
                    2.0 * (0.5 + idx - start) / (end - start)
                };
                if f < 1.0 { f } else { 2.0 - f }
            }
            RangeShape::Round => {
                if equal(start, end) {
                    0.0
                } else {
                    let idx = (idx + (0.5 - start)).clamp(0.0, end - start);
                    let range = 0.5 * (end - start);
                    let t = idx - range;
                    (1.0 - t * t / (range * range)).sqrt()
                }
            }
            RangeShape::Smooth => {
                if equal(start, end) {
                    0.0
                } else {
                    let idx = (idx + (0.5 - start)).clamp(0.0, end - start);
                    0.5 * (1.0 + (std::f32::consts::PI * (1.0 + 2.0 * idx / (end - start))).cos())
                }
            }
        };
        let mut f = clamp_unit(f);

        let min_ease = self.min_ease.at(frame).clamp(-100.0, 100.0);
        let max_ease = self.max_ease.at(frame).clamp(-100.0, 100.0);
        if !zero(min_ease) || !zero(max_ease) {
            let mut in_t = (1.0, 1.0);
            let mut out_t = (0.0, 0.0);
            if max_ease > 0.0 {
                in_t.0 = 1.0 - max_ease * 0.01;
            } else {
                in_t.1 = 1.0 + max_ease * 0.01;
            }
            if min_ease > 0.0 {
                out_t.0 = min_ease * 0.01;
            } else {
                out_t.1 = -min_ease * 0.01;
            }
            f = Interpolator::new(out_t, in_t).progress(f);
        }

        clamp_unit(f) * self.max_amount.at(frame) * 0.01
    }
}

/// `NaN` collapses to zero.
fn clamp_unit(f: f32) -> f32 {
    if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) }
}

/// Text primitive of a text layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextObject {
    /// Document keyframes.
    pub doc: Property<TextDocument>,
    /// Animator ranges, applied in order.
    pub ranges: Vec<TextRange>,
}

#[cfg(test)]
#[path = "../../tests/unit/model/text.rs"]
mod tests;
