//! Kinegraph renders Lottie vector animations on the CPU.
//!
//! The public API is session-oriented:
//!
//! - Start an [`Engine`], which owns the shared shape-preparation worker pool
//! - Create an [`Animation`] from it and [`Animation::load`] a document
//! - Override slot properties, pick a marker segment, fit it to a viewport
//! - Render frames into a caller buffer through a [`FrameTarget`], step them with a
//!   [`playback::Player`], or encode the whole range with [`export::export_gif`]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assets;
mod foundation;

pub(crate) mod animation;
pub(crate) mod builder;
pub(crate) mod color;
pub(crate) mod engine;
/// Animated GIF export.
pub mod export;
pub(crate) mod loader;
pub(crate) mod model;
/// Host-driven frame stepping.
pub mod playback;
pub(crate) mod render;
pub(crate) mod scheduler;

pub use crate::foundation::core::{BlendMode, ColorSpace, RenderRegion, Rgb8, Rgba8};
pub use crate::foundation::error::{KinegraphError, KinegraphResult};

pub use crate::animation::{Animation, LoadedInfo, RenderOpts};
pub use crate::assets::{
    EmbeddedGlyphs, FileImageResolver, FontChain, FontProvider, GlyphOutline, ImageResolver,
    ImageStore,
};
pub use crate::builder::{BuildCx, build_frame};
pub use crate::color::registry::ColorRegistry;
pub use crate::color::remap::ColorRemap;
pub use crate::engine::{Engine, EngineOpts};
pub use crate::loader::{LoadOptions, parse};
pub use crate::model::composition::{Composition, Font, Glyph, Marker};
pub use crate::model::gradient::{ColorStops, MergedStops, merge_stops};
pub use crate::model::object::{ImageData, Position};
pub use crate::model::property::{Keyframe, Property};
pub use crate::model::slot::{PropertyKind, PropertyValue};
pub use crate::model::text::TextDocument;
pub use crate::render::canvas::{Canvas, FrameTarget};
pub use crate::render::effect::SceneEffect;
pub use crate::render::method::{CompositionFlag, MaskMethod};
pub use crate::render::paint::{Paint, PaintRef, PaintState};
pub use crate::render::picture::DecodedImage;
pub use crate::render::scene::Scene;
pub use crate::render::shape::{Shape, ShapeFill};
pub use crate::render::surface_pool::{SurfacePoolOpts, SurfacePoolStats};
pub use crate::scheduler::{TaskHandle, TaskScheduler};
