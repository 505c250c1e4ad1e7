//! Layers: time mapping, parenting, mattes, masks and effects.

use kurbo::{Affine, BezPath, Rect, Shape as _};

use crate::builder::BuildCx;
use crate::foundation::core::Rgba8;
use crate::model::layer::{Layer, LayerEffect, LayerKind, Mask, MaskMode, MatteMode};
use crate::model::object::{FillRule, percent_to_u8};
use crate::render::effect::{
    BlurDirection, DropShadow, FillEffect, GaussianBlur, SceneEffect, Tint, Tritone,
};
use crate::render::method::MaskMethod;
use crate::render::paint::{PaintMask, PaintRef};
use crate::render::scene::Scene;
use crate::render::shape::{Shape, ShapeFill};

/// Precomp nesting and parent chains deeper than this are cut off.
pub(crate) const MAX_DEPTH: usize = 64;

/// Blur amounts are authored roughly as kernel widths.
const BLUR_TO_SIGMA: f32 = 0.3;

/// Half extent of the rectangle an inverted mask is cut out of.
const INVERT_EXTENT: f64 = 1.0e5;

pub(crate) struct SceneBuilder<'a, 'b> {
    pub(crate) cx: &'a BuildCx<'b>,
}

impl<'a, 'b> SceneBuilder<'a, 'b> {
    pub(crate) fn new(cx: &'a BuildCx<'b>) -> Self {
        Self { cx }
    }

    /// One scene holding `layers` bottom-first. `frame` is in the time of the list's owner.
    pub(crate) fn layers(&self, layers: &[Layer], frame: f32, depth: usize) -> Scene {
        let mut scene = Scene::new();
        if depth > MAX_DEPTH {
            tracing::warn!(depth, "precomp nesting too deep, content dropped");
            return scene;
        }
        // Document order is topmost first.
        for idx in (0..layers.len()).rev() {
            let layer = &layers[idx];
            if layer.matte_source {
                continue;
            }
            let Some(content) = self.layer(layers, idx, frame, depth) else {
                continue;
            };
            let paint = match layer.matte {
                None => content,
                Some(mode) => match self.matte(layers, idx, frame, depth, mode) {
                    Some(mask) => {
                        let mut wrap = Scene::new();
                        wrap.push(content);
                        wrap.state_mut().mask = Some(mask);
                        PaintRef::new(wrap)
                    }
                    // Nothing to cut away.
                    None if matches!(mode, MatteMode::AlphaInverted | MatteMode::LumaInverted) => {
                        content
                    }
                    None => continue,
                },
            };
            scene.push(paint);
        }
        scene
    }

    /// Track matte of the layer at `idx`, taken from the layer right above it.
    fn matte(
        &self,
        layers: &[Layer],
        idx: usize,
        frame: f32,
        depth: usize,
        mode: MatteMode,
    ) -> Option<PaintMask> {
        let source = self.layer(layers, idx.checked_sub(1)?, frame, depth)?;
        // The source keeps its own opacity; the wrapper feeds the mask at full strength.
        let mut wrap = Scene::new();
        wrap.push(source);
        Some(PaintMask {
            target: PaintRef::new(wrap),
            method: match mode {
                MatteMode::Alpha => MaskMethod::Alpha,
                MatteMode::AlphaInverted => MaskMethod::InvAlpha,
                MatteMode::Luma => MaskMethod::Luma,
                MatteMode::LumaInverted => MaskMethod::InvLuma,
            },
        })
    }

    /// Scene of one layer, `None` when it draws nothing at `frame`.
    pub(crate) fn layer(
        &self,
        layers: &[Layer],
        idx: usize,
        frame: f32,
        depth: usize,
    ) -> Option<PaintRef> {
        let layer = &layers[idx];
        if layer.kind == LayerKind::Null || !layer.is_active(frame) {
            return None;
        }
        let opacity = layer.transform.opacity(frame);
        if opacity == 0 {
            return None;
        }
        let local = layer.remap(frame, self.cx.comp.frame_rate);

        let mut scene = match layer.kind {
            LayerKind::Precomp => self.precomp(layer, local, depth)?,
            LayerKind::Solid => {
                let (path, color) = layer.statics().solid.as_ref()?;
                let c = self.cx.remap.apply(*color);
                let mut scene = Scene::new();
                scene.push(PaintRef::new(Shape::filled(
                    path.clone(),
                    ShapeFill::Solid(Rgba8::new(c.r, c.g, c.b, 255)),
                    FillRule::NonZero,
                )));
                scene
            }
            LayerKind::Shape | LayerKind::Image | LayerKind::Text => {
                if !layer.group.visible() {
                    return None;
                }
                let mut scene = Scene::new();
                self.group_content(&layer.group, local, &mut scene);
                scene
            }
            LayerKind::Null => return None,
        };
        if scene.paints().is_empty() {
            return None;
        }

        let state = scene.state_mut();
        state.transform = world_matrix(layers, idx, frame);
        state.opacity = opacity;
        state.blend = layer.blend;
        if let Some(target) = mask_chain(&layer.masks, local) {
            state.mask = Some(PaintMask {
                target,
                method: MaskMethod::Alpha,
            });
        }
        for effect in &layer.effects {
            scene.push_effect(scene_effect(effect, local));
        }
        Some(PaintRef::new(scene))
    }

    fn precomp(&self, layer: &Layer, local: f32, depth: usize) -> Option<Scene> {
        let id = layer.ref_id.as_deref()?;
        let Some(precomp) = self.cx.comp.precomp(id) else {
            tracing::debug!(id, "precomp layer points at a missing asset");
            return None;
        };
        let mut scene = self.layers(&precomp.layers, local, depth + 1);
        if let Some(clip) = &layer.statics().clipper {
            let clipper = Shape::filled(
                clip.clone(),
                ShapeFill::Solid(Rgba8::new(255, 255, 255, 255)),
                FillRule::NonZero,
            );
            scene.state_mut().clipper = Some(PaintRef::new(clipper));
        }
        Some(scene)
    }
}

/// Transform of the layer at `idx` through its parent chain.
///
/// Parents are looked up by index in the same list. Cycles stop at [`MAX_DEPTH`].
pub(crate) fn world_matrix(layers: &[Layer], idx: usize, frame: f32) -> Affine {
    let mut m = layers[idx].transform.matrix(frame);
    let mut parent = layers[idx].parent;
    for _ in 0..MAX_DEPTH {
        let Some(p) = parent.and_then(|id| layers.iter().find(|l| l.index == Some(id))) else {
            break;
        };
        m = p.transform.matrix(frame) * m;
        parent = p.parent;
    }
    m
}

/// Merge a layer's masks into one coverage paint.
///
/// Each mask owns the accumulated result of the masks before it and merges with it by its
/// mode. A leading subtract mask cuts out of the full frame.
pub(crate) fn mask_chain(masks: &[Mask], frame: f32) -> Option<PaintRef> {
    let mut acc: Option<PaintRef> = None;
    for mask in masks {
        if mask.mode == MaskMode::None {
            continue;
        }
        let inverted = mask.inverted ^ (acc.is_none() && mask.mode == MaskMode::Subtract);
        let mut shape = mask_shape(mask, frame, inverted);
        if let Some(prev) = acc.take() {
            shape.state_mut().mask = Some(PaintMask {
                target: prev,
                method: merge_method(mask.mode),
            });
        }
        acc = Some(PaintRef::new(shape));
    }
    acc
}

fn mask_shape(mask: &Mask, frame: f32, inverted: bool) -> Shape {
    let alpha = percent_to_u8(mask.opacity.at(frame));
    let fill = ShapeFill::Solid(Rgba8::new(255, 255, 255, alpha));
    let path = mask.path.at(frame);
    if !inverted {
        return Shape::filled(path, fill, FillRule::NonZero);
    }
    let e = INVERT_EXTENT;
    let mut out: BezPath = Rect::new(-e, -e, e, e).to_path(0.1);
    out.extend(path.iter());
    Shape::filled(out, fill, FillRule::EvenOdd)
}

fn merge_method(mode: MaskMode) -> MaskMethod {
    match mode {
        MaskMode::Subtract => MaskMethod::Subtract,
        MaskMode::Intersect => MaskMethod::Intersect,
        MaskMode::Lighten => MaskMethod::Lighten,
        MaskMode::Darken => MaskMethod::Darken,
        MaskMode::Difference => MaskMethod::Difference,
        MaskMode::Add | MaskMode::None => MaskMethod::Add,
    }
}

/// Resolve a layer effect at `frame`.
pub(crate) fn scene_effect(effect: &LayerEffect, frame: f32) -> SceneEffect {
    match effect {
        LayerEffect::Tint {
            black,
            white,
            intensity,
        } => SceneEffect::Tint(Tint {
            black: black.at(frame),
            white: white.at(frame),
            intensity: unit(intensity.at(frame)),
        }),
        LayerEffect::Fill { color, opacity } => SceneEffect::Fill(FillEffect {
            color: color.at(frame),
            opacity: percent_to_u8(opacity.at(frame)),
        }),
        LayerEffect::Tritone {
            bright,
            midtone,
            dark,
            blend,
        } => SceneEffect::Tritone(Tritone {
            shadow: dark.at(frame),
            midtone: midtone.at(frame),
            highlight: bright.at(frame),
            blend: unit(blend.at(frame)),
        }),
        LayerEffect::DropShadow {
            color,
            opacity,
            angle,
            distance,
            softness,
        } => SceneEffect::DropShadow(DropShadow::new(
            color.at(frame),
            opacity.at(frame).clamp(0.0, 255.0).round() as u8,
            angle.at(frame),
            distance.at(frame),
            softness.at(frame) * BLUR_TO_SIGMA,
        )),
        LayerEffect::GaussianBlur {
            blurriness,
            direction,
            wrap,
        } => SceneEffect::GaussianBlur(GaussianBlur::new(
            blurriness.at(frame) * BLUR_TO_SIGMA,
            BlurDirection::from_code(*direction),
            *wrap,
        )),
    }
}

/// Percent to `0.0..=1.0`.
fn unit(percent: f32) -> f32 {
    (percent * 0.01).clamp(0.0, 1.0)
}
