//! The seam between the paint tree and a raster backend.

use kurbo::{Affine, BezPath};

use crate::foundation::core::{BlendMode, RenderRegion};
use crate::render::effect::SceneEffect;
use crate::render::picture::PreparedImage;
use crate::render::shape::PreparedShape;

/// Reasons a node needs an offscreen composite scope. Combined as a bitset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompositionFlag(u8);

impl CompositionFlag {
    /// No composition needed.
    pub const EMPTY: Self = Self(0);
    /// Group opacity must be applied to the flattened result.
    pub const OPACITY: Self = Self(1);
    /// The node blends with a non-normal mode.
    pub const BLENDING: Self = Self(2);
    /// The node is masked.
    pub const MASKING: Self = Self(4);
    /// The node carries post-processing effects.
    pub const POST_PROCESSING: Self = Self(8);

    /// `true` when every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for CompositionFlag {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CompositionFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// How a mask paint combines with the paint it masks.
///
/// The first four scale the content by a coverage value taken from the mask. The others
/// merge the content with the mask and are used to chain several masks together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MaskMethod {
    #[default]
    None,
    Alpha,
    InvAlpha,
    Luma,
    InvLuma,
    Add,
    Subtract,
    Intersect,
    Difference,
    Lighten,
    Darken,
}

impl MaskMethod {
    /// `true` for methods whose result covers the union of content and mask.
    pub fn is_merging(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Subtract
                | Self::Intersect
                | Self::Difference
                | Self::Lighten
                | Self::Darken
        )
    }
}

/// Handle to an open composite scope, issued by [`RenderMethod::target`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositorId(pub(crate) usize);

/// Raster backend driven by the paint tree.
///
/// Composite scopes nest: `target` reserves a scope, `begin_mask` (optional) redirects drawing
/// into the scope's mask surface, `begin_composite` redirects drawing into its content surface
/// and `end_composite` flattens the scope onto whatever was current before it.
pub trait RenderMethod {
    /// Device region drawing is clipped to.
    fn viewport(&self) -> RenderRegion;

    /// Blend mode for subsequent draws and for scopes reserved afterwards.
    fn blend(&mut self, mode: BlendMode);

    /// Draw a prepared shape. `false` when the backend failed.
    fn render_shape(&mut self, shape: &PreparedShape) -> bool;

    /// Draw a prepared image. `false` when the backend failed.
    fn render_image(&mut self, image: &PreparedImage) -> bool;

    /// Reserve a composite scope covering `region`. `None` when nothing would be visible.
    fn target(&mut self, region: RenderRegion, flags: CompositionFlag) -> Option<CompositorId>;

    /// Redirect drawing into the mask surface of `cmp`.
    fn begin_mask(&mut self, cmp: CompositorId) -> bool;

    /// Redirect drawing into the content surface of `cmp`. `opacity` applies when the scope
    /// is flattened (or scales the mask coverage for masking methods).
    fn begin_composite(&mut self, cmp: CompositorId, method: MaskMethod, opacity: u8) -> bool;

    /// Flatten `cmp` onto the previous surface and release it.
    fn end_composite(&mut self, cmp: CompositorId) -> bool;

    /// Intersect subsequent draws with a device-space path.
    fn push_clip(&mut self, clip: &BezPath);

    /// Drop the innermost clip.
    fn pop_clip(&mut self);

    /// Resolve an effect's device-space parameters for `transform`.
    fn prepare_effect(&mut self, effect: &mut SceneEffect, transform: Affine) {
        effect.prepare(transform);
    }

    /// How far `effect` grows the bounds of what it is applied to, or `None` when it does
    /// not.
    fn effect_region(&self, effect: &SceneEffect) -> Option<RenderRegion> {
        if !effect.valid() {
            return None;
        }
        effect.extent()
    }

    /// Apply `effect` to the content of `cmp`. With `direct`, the result is written to the
    /// parent surface right away and the scope is consumed.
    fn render_effect(&mut self, cmp: CompositorId, effect: &SceneEffect, direct: bool) -> bool;
}
