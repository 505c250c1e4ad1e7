//! Text layout from glyph outlines, with range selectors applied per glyph.

use kurbo::{Affine, BezPath, Vec2};

use crate::assets::{EmbeddedGlyphs, FontChain, FontProvider};
use crate::builder::layer::SceneBuilder;
use crate::foundation::core::{Rgb8, Rgba8};
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::model::object::{LineCap, LineJoin};
use crate::model::property::Lerp;
use crate::model::text::{Justify, RangeBased, TextDocument, TextObject, TextRange};
use crate::render::paint::PaintRef;
use crate::render::scene::Scene;
use crate::render::shape::{Shape, ShapeFill, StrokeSpec};

/// Advance of a space the font has no glyph for, relative to the size.
const MISSING_SPACE_ADVANCE: f64 = 0.3;

/// Where a glyph sits in each selector unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct UnitIndex {
    pub(crate) chars: usize,
    /// `None` for whitespace.
    pub(crate) letters: Option<usize>,
    pub(crate) word: usize,
    pub(crate) line: usize,
}

/// Number of units of each kind in a text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct UnitTotals {
    pub(crate) chars: usize,
    pub(crate) letters: usize,
    pub(crate) words: usize,
    pub(crate) lines: usize,
}

/// Lines of a document's text. `\r\n`, `\r`, `\n` and ETX all break.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split(['\r', '\n', '\u{3}'])
        .map(str::to_owned)
        .collect()
}

/// Unit indices of every character, line by line, and the totals.
pub(crate) fn unit_indices(lines: &[String]) -> (Vec<UnitIndex>, UnitTotals) {
    let mut out = Vec::new();
    let (mut chars, mut letters, mut word) = (0usize, 0usize, 0usize);
    let mut any_word = false;
    for (line, text) in lines.iter().enumerate() {
        let mut in_word = false;
        for ch in text.chars() {
            let space = ch.is_whitespace();
            if !space {
                if !in_word && any_word {
                    word += 1;
                }
                in_word = true;
                any_word = true;
            } else {
                in_word = false;
            }
            out.push(UnitIndex {
                chars,
                letters: (!space).then_some(letters),
                word,
                line,
            });
            chars += 1;
            if !space {
                letters += 1;
            }
        }
    }
    let totals = UnitTotals {
        chars,
        letters,
        words: if any_word { word + 1 } else { 0 },
        lines: lines.len(),
    };
    (out, totals)
}

/// Selector weight of one glyph.
pub(crate) fn range_factor(range: &TextRange, frame: f32, unit: UnitIndex, totals: UnitTotals) -> f32 {
    let (idx, total) = match range.based {
        RangeBased::Chars => (unit.chars, totals.chars),
        RangeBased::CharsExcludingSpaces => match unit.letters {
            Some(i) => (i, totals.letters),
            None => return 0.0,
        },
        RangeBased::Words => (unit.word, totals.words),
        RangeBased::Lines => (unit.line, totals.lines),
    };
    if total == 0 {
        return 0.0;
    }
    range.factor(frame, total as f32, idx as f32)
}

/// Per-glyph values after every selector has been blended in.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GlyphStyle {
    pub(crate) offset: Vec2,
    pub(crate) scale: Vec2,
    /// Degrees.
    pub(crate) rotation: f64,
    /// `0.0..=1.0`.
    pub(crate) opacity: f32,
    pub(crate) fill: Option<Rgb8>,
    pub(crate) stroke: Option<Rgb8>,
    /// Extra tracking in thousandths of an em.
    pub(crate) tracking: f32,
}

impl GlyphStyle {
    fn base(doc: &TextDocument) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            opacity: 1.0,
            fill: doc.fill,
            stroke: doc.stroke,
            tracking: 0.0,
        }
    }

    /// Blend in `range` at weight `f`.
    pub(crate) fn apply(&mut self, range: &TextRange, frame: f32, f: f32) {
        if f <= 0.0 {
            return;
        }
        let s = &range.style;
        let fw = f64::from(f);
        if let Some(p) = &s.position {
            self.offset += p.at(frame) * fw;
        }
        if let Some(sc) = &s.scale {
            let v = sc.at(frame);
            self.scale.x *= 1.0 + (v.x * 0.01 - 1.0) * fw;
            self.scale.y *= 1.0 + (v.y * 0.01 - 1.0) * fw;
        }
        if let Some(r) = &s.rotation {
            self.rotation += f64::from(r.at(frame) * f);
        }
        if let Some(o) = &s.opacity {
            let target = (o.at(frame) * 0.01).clamp(0.0, 1.0);
            self.opacity *= 1.0 - (1.0 - target) * f;
        }
        if let Some(c) = &s.fill_color {
            let to = c.at(frame);
            self.fill = Some(self.fill.unwrap_or(to).lerp(&to, f));
        }
        if let Some(c) = &s.stroke_color {
            let to = c.at(frame);
            self.stroke = Some(self.stroke.unwrap_or(to).lerp(&to, f));
        }
        if let Some(t) = &s.tracking {
            self.tracking += t.at(frame) * f;
        }
    }
}

struct Placed {
    path: Option<BezPath>,
    advance: f64,
    style: GlyphStyle,
}

impl SceneBuilder<'_, '_> {
    /// Lay out a text object at `frame`.
    ///
    /// Fails with `InsufficientCondition` when neither the document's glyphs nor the
    /// external provider know the font.
    pub(crate) fn text(&self, text: &TextObject, frame: f32) -> KinegraphResult<Scene> {
        let doc = text.doc.at(frame);
        let mut scene = Scene::new();
        if doc.text.is_empty() || doc.size <= 0.0 {
            return Ok(scene);
        }

        let font = self.cx.comp.fonts.iter().find(|f| f.name == doc.font);
        let (family, style, ascent) = match font {
            Some(f) => (f.family.as_str(), f.style.as_str(), f.ascent),
            None => (doc.font.as_str(), "", 0.0),
        };
        let embedded = EmbeddedGlyphs::new(&self.cx.comp.glyphs);
        let fonts = FontChain::new(&embedded, self.cx.fonts);
        if !fonts.has_font(family, style) {
            return Err(KinegraphError::insufficient_condition(format!(
                "font {:?} ({family} {style}) is not available",
                doc.font
            )));
        }

        let size = f64::from(doc.size);
        let em = |thousandths: f32| f64::from(thousandths) / 1000.0 * size;
        let lines = split_lines(&doc.text);
        let (units, totals) = unit_indices(&lines);
        let mut units = units.into_iter();

        let mut placed: Vec<Vec<Placed>> = Vec::with_capacity(lines.len());
        for line in &lines {
            let mut row = Vec::new();
            for ch in line.chars() {
                let unit = units.next().unwrap_or_default();
                let mut gs = GlyphStyle::base(&doc);
                for range in &text.ranges {
                    gs.apply(range, frame, range_factor(range, frame, unit, totals));
                }
                let (path, advance) = match fonts.glyph(family, style, ch, doc.size) {
                    Some(g) => (Some(g.path), f64::from(g.advance)),
                    None if ch.is_whitespace() => (None, size * MISSING_SPACE_ADVANCE),
                    None => {
                        tracing::debug!(%ch, family, "glyph missing from font");
                        (None, 0.0)
                    }
                };
                row.push(Placed {
                    path,
                    advance,
                    style: gs,
                });
            }
            placed.push(row);
        }

        let first_baseline = match doc.box_size {
            Some(_) if ascent > 0.0 => doc.box_position.y + size * f64::from(ascent) * 0.01,
            Some(_) => doc.box_position.y + size,
            None => 0.0,
        };
        let line_height = f64::from(doc.line_height);

        for (n, row) in placed.iter().enumerate() {
            // Tracking goes between glyphs, not after the last one.
            let spacing: Vec<f64> = row
                .iter()
                .map(|g| em(doc.tracking) + em(g.style.tracking))
                .collect();
            let width: f64 = row.iter().map(|g| g.advance).sum::<f64>()
                + spacing.iter().take(row.len().saturating_sub(1)).sum::<f64>();
            let mut x = line_start(&doc, width);
            let y = first_baseline + n as f64 * line_height - f64::from(doc.baseline_shift);

            for (g, gap) in row.iter().zip(&spacing) {
                if let Some(path) = &g.path {
                    if let Some(shape) = self.glyph_shape(&doc, path, g, Vec2::new(x, y)) {
                        scene.push(PaintRef::new(shape));
                    }
                }
                x += g.advance + gap;
            }
        }
        Ok(scene)
    }

    fn glyph_shape(&self, doc: &TextDocument, path: &BezPath, g: &Placed, pen: Vec2) -> Option<Shape> {
        let s = &g.style;
        let opacity = (s.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        if opacity == 0 {
            return None;
        }
        let mut shape = Shape::new(path.clone());
        shape.fill = s.fill.map(|c| {
            let c = self.cx.remap.apply(c);
            ShapeFill::Solid(Rgba8::new(c.r, c.g, c.b, 255))
        });
        if let Some(c) = s.stroke.filter(|_| doc.stroke_width > 0.0) {
            let c = self.cx.remap.apply(c);
            shape.stroke = Some(StrokeSpec {
                width: f64::from(doc.stroke_width),
                cap: LineCap::Butt,
                join: LineJoin::Round,
                miter_limit: 4.0,
                dash: None,
                paint: ShapeFill::Solid(Rgba8::new(c.r, c.g, c.b, 255)),
            });
        }
        if shape.fill.is_none() && shape.stroke.is_none() {
            return None;
        }

        let pivot = Vec2::new(g.advance * 0.5, 0.0);
        let state = shape.state_mut();
        state.transform = Affine::translate(pen + s.offset + pivot)
            * Affine::rotate(s.rotation.to_radians())
            * Affine::scale_non_uniform(s.scale.x, s.scale.y)
            * Affine::translate(-pivot);
        state.opacity = opacity;
        Some(shape)
    }
}

/// Pen start of a line `width` wide.
fn line_start(doc: &TextDocument, width: f64) -> f64 {
    let (left, room) = match doc.box_size {
        Some(b) => (doc.box_position.x, b.x),
        None => (0.0, 0.0),
    };
    match doc.justify {
        Justify::Left => left,
        Justify::Right => left + room - width,
        Justify::Center => left + (room - width) * 0.5,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/builder/text.rs"]
mod tests;
