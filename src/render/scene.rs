//! Scene nodes: ordered children, composition decisions and bounds merging.

use kurbo::{Affine, Rect};
use smallvec::SmallVec;

use crate::foundation::core::{BlendMode, RenderRegion};
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::render::effect::SceneEffect;
use crate::render::method::{CompositionFlag, MaskMethod, RenderMethod};
use crate::render::paint::{PaintRef, PaintState, UpdateCx};

/// Group of paints drawn in list order, optionally flattened offscreen.
#[derive(Debug, Default)]
pub struct Scene {
    pub(crate) state: PaintState,
    paints: Vec<PaintRef>,
    effects: Option<SmallVec<[SceneEffect; 2]>>,
    comp_flag: CompositionFlag,
    opacity: u8,
    vport: RenderRegion,
}

impl Scene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared paint state.
    pub fn state(&self) -> &PaintState {
        &self.state
    }

    /// Mutable shared paint state.
    pub fn state_mut(&mut self) -> &mut PaintState {
        &mut self.state
    }

    /// Children in z-order (first is bottom-most).
    pub fn paints(&self) -> &[PaintRef] {
        &self.paints
    }

    /// Attached effects.
    pub fn effects(&self) -> &[SceneEffect] {
        self.effects.as_deref().unwrap_or_default()
    }

    /// Flags computed by the last update.
    pub fn composition_flag(&self) -> CompositionFlag {
        self.comp_flag
    }

    /// Which composition this scene needs when drawn at `opacity`.
    pub fn need_composition(&self, opacity: u8) -> CompositionFlag {
        if opacity == 0 || self.paints.is_empty() {
            return CompositionFlag::EMPTY;
        }

        let mut flag = CompositionFlag::EMPTY;
        if !self.effects().is_empty() {
            flag |= CompositionFlag::POST_PROCESSING;
        }
        if self.state.mask_method() != MaskMethod::None {
            flag |= CompositionFlag::MASKING;
        }
        if self.state.blend != BlendMode::Normal {
            flag |= CompositionFlag::BLENDING;
        }

        if opacity == 255 {
            return flag;
        }
        if self.paints.len() == 1 && self.paints[0].lock().is_shape() {
            return flag;
        }
        flag | CompositionFlag::OPACITY
    }

    pub(crate) fn update(&mut self, cx: &mut UpdateCx<'_>, transform: Affine, opacity: u8) {
        self.vport = cx.renderer.viewport();
        self.comp_flag = self.need_composition(opacity);

        let child_opacity = if self.comp_flag.is_empty() {
            opacity
        } else {
            self.opacity = opacity;
            255
        };

        for p in &self.paints {
            p.lock().update(cx, transform, child_opacity);
        }

        if let Some(effects) = &mut self.effects {
            for e in effects.iter_mut() {
                cx.renderer.prepare_effect(e, transform);
            }
        }
    }

    pub(crate) fn render(&mut self, renderer: &mut dyn RenderMethod) -> bool {
        renderer.blend(self.state.blend);

        let mut cmp = None;
        if !self.comp_flag.is_empty() {
            let region = self.bounds(renderer);
            cmp = renderer.target(region, self.comp_flag);
            // Children were updated at full opacity for the surface; without one they
            // would draw unscaled and unblended.
            let Some(c) = cmp else {
                return true;
            };
            renderer.begin_composite(c, MaskMethod::None, self.opacity);
        }

        let mut ok = true;
        for p in &self.paints {
            ok &= p.lock().render(renderer);
        }

        if let Some(c) = cmp {
            let valid = self.effects().iter().filter(|e| e.valid()).count();
            let direct = valid == 1 && self.comp_flag == CompositionFlag::POST_PROCESSING;
            for e in self.effects().iter().filter(|e| e.valid()) {
                ok &= renderer.render_effect(c, e, direct);
            }
            renderer.end_composite(c);
        }
        ok
    }

    /// Merged device bounds of the children, grown by the effects and clipped to the
    /// viewport captured at the last update.
    pub fn bounds(&self, renderer: &dyn RenderMethod) -> RenderRegion {
        let mut merged = RenderRegion::ZERO;
        for p in &self.paints {
            merged = merged.union(p.lock().bounds(renderer));
        }
        if merged.is_empty() {
            return RenderRegion::ZERO;
        }

        let mut grow = RenderRegion::ZERO;
        for e in self.effects() {
            if let Some(ext) = renderer.effect_region(e) {
                grow.x = grow.x.min(ext.x);
                grow.y = grow.y.min(ext.y);
                grow.w = grow.w.max(ext.w);
                grow.h = grow.h.max(ext.h);
            }
        }

        RenderRegion::new(
            merged.x + grow.x,
            merged.y + grow.y,
            merged.w + grow.w,
            merged.h + grow.h,
        )
        .intersect(self.vport)
    }

    /// Union of the children's bounds in this scene's local space.
    pub fn bounds_f(&self) -> Option<Rect> {
        self.paints
            .iter()
            .filter_map(|p| p.lock().bounds_f())
            .reduce(|a, b| a.union(b))
    }

    /// Append a child on top.
    pub fn push(&mut self, paint: PaintRef) {
        self.paints.push(paint);
    }

    /// Insert `target` directly beneath `before`.
    pub fn insert(&mut self, target: PaintRef, before: &PaintRef) -> KinegraphResult<()> {
        let idx = self
            .paints
            .iter()
            .position(|p| p.ptr_eq(before))
            .ok_or_else(|| KinegraphError::invalid_arguments("insert anchor is not a child"))?;
        self.paints.insert(idx, target);
        Ok(())
    }

    /// Detach `target`, dropping this scene's reference to it.
    pub fn remove(&mut self, target: &PaintRef) -> KinegraphResult<()> {
        let idx = self
            .paints
            .iter()
            .position(|p| p.ptr_eq(target))
            .ok_or_else(|| KinegraphError::invalid_arguments("paint is not a child"))?;
        self.paints.remove(idx);
        Ok(())
    }

    /// Detach every child.
    pub fn clear(&mut self) {
        self.paints.clear();
    }

    /// Attach an effect. [`SceneEffect::ClearAll`] drops every effect instead.
    pub fn push_effect(&mut self, effect: SceneEffect) {
        match effect {
            SceneEffect::ClearAll => self.effects = None,
            e => self.effects.get_or_insert_with(SmallVec::new).push(e),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
