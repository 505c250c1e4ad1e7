//! Paint nodes, their shared handles and the per-frame update/render walk.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kurbo::{Affine, BezPath, Rect};

use crate::foundation::core::{BlendMode, RenderRegion};
use crate::foundation::math::mul_div255_u8;
use crate::render::method::{CompositionFlag, MaskMethod, RenderMethod};
use crate::render::picture::Picture;
use crate::render::scene::Scene;
use crate::render::shape::Shape;
use crate::scheduler::TaskScheduler;

/// Mask attached to a paint.
#[derive(Clone, Debug)]
pub struct PaintMask {
    /// Paint whose coverage (or color) masks the owner.
    pub target: PaintRef,
    /// How the two combine.
    pub method: MaskMethod,
}

/// State every paint carries regardless of its kind.
#[derive(Clone, Debug)]
pub struct PaintState {
    /// Local-to-parent transform.
    pub transform: Affine,
    /// Own opacity, multiplied with the parent's.
    pub opacity: u8,
    /// Blend mode against what is beneath.
    pub blend: BlendMode,
    /// Optional mask.
    pub mask: Option<PaintMask>,
    /// Optional clip shape, in the paint's own space.
    pub clipper: Option<PaintRef>,
    /// Skip this paint entirely.
    pub hidden: bool,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            opacity: 255,
            blend: BlendMode::Normal,
            mask: None,
            clipper: None,
            hidden: false,
        }
    }
}

impl PaintState {
    /// Mask method, `None` without a mask.
    pub fn mask_method(&self) -> MaskMethod {
        self.mask.as_ref().map_or(MaskMethod::None, |m| m.method)
    }
}

/// Per-frame update context.
pub struct UpdateCx<'a> {
    /// Backend the tree will be rendered with.
    pub renderer: &'a mut dyn RenderMethod,
    /// Pool for geometry jobs.
    pub scheduler: &'a TaskScheduler,
}

/// A node of the paint tree.
#[derive(Debug)]
#[allow(missing_docs)]
pub enum Paint {
    Shape(Shape),
    Scene(Scene),
    Picture(Picture),
}

impl Paint {
    /// Shared state.
    pub fn state(&self) -> &PaintState {
        match self {
            Self::Shape(s) => &s.state,
            Self::Scene(s) => &s.state,
            Self::Picture(p) => &p.state,
        }
    }

    /// Mutable shared state.
    pub fn state_mut(&mut self) -> &mut PaintState {
        match self {
            Self::Shape(s) => &mut s.state,
            Self::Scene(s) => &mut s.state,
            Self::Picture(p) => &mut p.state,
        }
    }

    /// `true` for a shape node.
    pub fn is_shape(&self) -> bool {
        matches!(self, Self::Shape(_))
    }

    /// Resolve this subtree for the current frame under `parent` transform and opacity.
    pub fn update(&mut self, cx: &mut UpdateCx<'_>, parent: Affine, parent_opacity: u8) {
        let state = self.state();
        if state.hidden {
            return;
        }
        let m = parent * state.transform;
        let opacity = mul_div255_u8(u16::from(parent_opacity), u16::from(state.opacity));

        if let Some(clip) = &state.clipper {
            clip.lock().update(cx, m, 255);
        }
        if let Some(mask) = &state.mask {
            mask.target.lock().update(cx, m, 255);
        }

        match self {
            Self::Shape(s) => s.update(cx.scheduler, m, opacity),
            Self::Scene(s) => s.update(cx, m, opacity),
            Self::Picture(p) => p.update(m, opacity),
        }
    }

    /// Draw this subtree. `false` when any part failed.
    pub fn render(&mut self, renderer: &mut dyn RenderMethod) -> bool {
        if self.state().hidden {
            return true;
        }
        let blend = self.state().blend;
        renderer.blend(blend);

        let mask = self.state().mask.clone();
        let mut cmp = None;
        if let Some(mask) = &mask {
            let mut region = self.bounds(renderer);
            if mask.method.is_merging() {
                region = region.union(mask.target.lock().bounds(renderer));
            }
            if region.is_empty() {
                return true;
            }
            let Some(c) = renderer.target(region, CompositionFlag::MASKING) else {
                return true;
            };
            if renderer.begin_mask(c) {
                mask.target.lock().render(renderer);
            }
            cmp = Some(c);
        }

        let clip = self.state().clipper.clone().and_then(|c| c.lock().clip_path());
        if let Some(path) = &clip {
            renderer.push_clip(path);
        }

        if let (Some(c), Some(mask)) = (cmp, &mask) {
            let opacity = mask.target.lock().state().opacity;
            renderer.begin_composite(c, mask.method, opacity);
        }

        renderer.blend(blend);
        let ok = match self {
            Self::Shape(s) => s.render(renderer),
            Self::Scene(s) => s.render(renderer),
            Self::Picture(p) => p.render(renderer),
        };

        if let Some(c) = cmp {
            renderer.end_composite(c);
        }
        if clip.is_some() {
            renderer.pop_clip();
        }
        ok
    }

    /// Device bounds from the last update.
    pub fn bounds(&mut self, renderer: &dyn RenderMethod) -> RenderRegion {
        match self {
            Self::Shape(s) => s.bounds(),
            Self::Scene(s) => s.bounds(renderer),
            Self::Picture(p) => p.bounds(),
        }
    }

    /// Bounds in the parent's space: local bounds mapped through the own transform.
    pub fn bounds_f(&self) -> Option<Rect> {
        let local = match self {
            Self::Shape(s) => s.local_bounds(),
            Self::Scene(s) => s.bounds_f(),
            Self::Picture(p) => p.local_bounds(),
        }?;
        Some(self.state().transform.transform_rect_bbox(local))
    }

    fn clip_path(&mut self) -> Option<BezPath> {
        match self {
            Self::Shape(s) => s.clip_path(),
            _ => None,
        }
    }
}

impl From<Shape> for Paint {
    fn from(s: Shape) -> Self {
        Self::Shape(s)
    }
}

impl From<Scene> for Paint {
    fn from(s: Scene) -> Self {
        Self::Scene(s)
    }
}

impl From<Picture> for Paint {
    fn from(p: Picture) -> Self {
        Self::Picture(p)
    }
}

/// Shared-owner handle to a paint node. Clone adds a reference; the last drop frees the node.
#[derive(Clone, Debug)]
pub struct PaintRef(Arc<Mutex<Paint>>);

impl PaintRef {
    /// Wrap a paint.
    pub fn new(paint: impl Into<Paint>) -> Self {
        Self(Arc::new(Mutex::new(paint.into())))
    }

    /// Lock the node. A poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Paint> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live handles to this node.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// `true` when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/paint.rs"]
mod tests;
