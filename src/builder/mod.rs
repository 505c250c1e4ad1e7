//! Turns the composition at one frame into a paint tree.
//!
//! The model is read-only here. Every call produces a fresh tree; the canvas and scene
//! compositor take it from there.

use crate::assets::{FontProvider, ImageStore};
use crate::color::registry::ColorRegistry;
use crate::color::remap::ColorRemap;
use crate::model::composition::Composition;
use crate::render::scene::Scene;

pub(crate) mod group;
pub(crate) mod layer;
pub(crate) mod text;

/// Everything a frame build reads besides the frame number.
#[derive(Clone, Copy)]
pub struct BuildCx<'a> {
    /// Composition being drawn.
    pub comp: &'a Composition,
    /// Load-time color substitution.
    pub remap: &'a ColorRemap,
    /// Named color overrides for fills and strokes.
    pub registry: &'a ColorRegistry,
    /// Decoded bitmaps.
    pub images: &'a ImageStore,
    /// Fonts beyond the glyphs embedded in the document.
    pub fonts: Option<&'a dyn FontProvider>,
}

impl std::fmt::Debug for BuildCx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCx")
            .field("layers", &self.comp.layers.len())
            .field("registry", &self.registry.len())
            .field("fonts", &self.fonts.is_some())
            .finish()
    }
}

/// Paint tree of the root layers at `frame` (composition time).
#[tracing::instrument(level = "trace", skip(cx))]
pub fn build_frame(cx: &BuildCx<'_>, frame: f32) -> Scene {
    layer::SceneBuilder::new(cx).layers(&cx.comp.layers, frame, 0)
}

#[cfg(test)]
#[path = "../../tests/unit/builder/mod.rs"]
mod tests;
