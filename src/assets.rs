//! External resources a composition points at: bitmaps and glyph outlines.
//!
//! Both are reached through traits so hosts can plug in their own storage. The defaults read
//! files and `data:` URIs ([`FileImageResolver`]) and serve the glyphs embedded in the
//! document ([`EmbeddedGlyphs`]).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use kurbo::BezPath;

use crate::foundation::error::KinegraphResult;
use crate::model::composition::Glyph;
use crate::model::object::ImageData;
use crate::render::picture::DecodedImage;

pub(crate) mod decode;

/// Turns an image payload reference into pixels.
pub trait ImageResolver: Send + Sync {
    /// Decode the bitmap `data` refers to.
    fn resolve(&self, data: &ImageData) -> KinegraphResult<DecodedImage>;
}

/// Decodes `data:` URIs inline and reads every other path from disk.
#[derive(Clone, Debug, Default)]
pub struct FileImageResolver {
    base_dir: Option<PathBuf>,
}

impl FileImageResolver {
    /// Resolver for absolute paths and paths relative to the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir`.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }
}

impl ImageResolver for FileImageResolver {
    fn resolve(&self, data: &ImageData) -> KinegraphResult<DecodedImage> {
        if decode::is_data_uri(&data.path) {
            return decode::decode_image(&decode::decode_data_uri(&data.path)?);
        }
        let path = match &self.base_dir {
            Some(dir) => dir.join(&data.path),
            None => PathBuf::from(&data.path),
        };
        let bytes = std::fs::read(&path).with_context(|| format!("read image {}", path.display()))?;
        decode::decode_image(&bytes)
    }
}

/// Decoded bitmaps by payload path, shared across frames.
///
/// Failures are cached too, so a broken reference is reported once.
pub struct ImageStore {
    resolver: Arc<dyn ImageResolver>,
    cache: Mutex<HashMap<String, Option<DecodedImage>>>,
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cache.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("ImageStore").field("cached", &cached).finish()
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(Arc::new(FileImageResolver::new()))
    }
}

impl ImageStore {
    /// Store backed by `resolver`.
    pub fn new(resolver: Arc<dyn ImageResolver>) -> Self {
        Self {
            resolver,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Decoded bitmap for `data`, `None` when it cannot be resolved.
    pub fn get(&self, data: &ImageData) -> Option<DecodedImage> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&data.path) {
            return hit.clone();
        }
        let decoded = match self.resolver.resolve(data) {
            Ok(img) => Some(img),
            Err(err) => {
                tracing::warn!(path = %short(&data.path), %err, "image could not be resolved");
                None
            }
        };
        cache.insert(data.path.clone(), decoded.clone());
        decoded
    }

    /// Number of cached entries, misses included.
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` when nothing was looked up yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn short(path: &str) -> &str {
    match path.char_indices().nth(48) {
        Some((i, _)) => &path[..i],
        None => path,
    }
}

/// Outline of one character, scaled to the requested size.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphOutline {
    /// Outline with the baseline at `y = 0`, y pointing down.
    pub path: BezPath,
    /// Horizontal advance.
    pub advance: f32,
}

/// Source of glyph outlines for text layers.
pub trait FontProvider: Send + Sync {
    /// Outline of `ch` in `family`/`style` at `size` pixels, `None` when the font lacks it.
    fn glyph(&self, family: &str, style: &str, ch: char, size: f32) -> Option<GlyphOutline>;

    /// `true` when any glyph of `family`/`style` is available.
    fn has_font(&self, family: &str, style: &str) -> bool;
}

/// Glyphs carried by the document's `chars` table.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedGlyphs<'a> {
    glyphs: &'a [Glyph],
}

impl<'a> EmbeddedGlyphs<'a> {
    /// View over `glyphs`.
    pub fn new(glyphs: &'a [Glyph]) -> Self {
        Self { glyphs }
    }
}

impl FontProvider for EmbeddedGlyphs<'_> {
    fn glyph(&self, family: &str, style: &str, ch: char, size: f32) -> Option<GlyphOutline> {
        let mut buf = [0u8; 4];
        let key = ch.encode_utf8(&mut buf);
        let g = self
            .glyphs
            .iter()
            .find(|g| g.ch == *key && g.family == family && g.style == style)?;
        let scale = if g.size > 0.0 { size / g.size } else { 1.0 };
        Some(GlyphOutline {
            path: kurbo::Affine::scale(f64::from(scale)) * g.outline.clone(),
            advance: g.advance * scale,
        })
    }

    fn has_font(&self, family: &str, style: &str) -> bool {
        self.glyphs.iter().any(|g| g.family == family && g.style == style)
    }
}

/// First provider that knows the font wins.
#[derive(Clone, Copy)]
pub struct FontChain<'a> {
    first: &'a dyn FontProvider,
    fallback: Option<&'a dyn FontProvider>,
}

impl std::fmt::Debug for FontChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontChain")
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl<'a> FontChain<'a> {
    /// Try `first`, then `fallback`.
    pub fn new(first: &'a dyn FontProvider, fallback: Option<&'a dyn FontProvider>) -> Self {
        Self { first, fallback }
    }

    fn pick(&self, family: &str, style: &str) -> Option<&'a dyn FontProvider> {
        if self.first.has_font(family, style) {
            return Some(self.first);
        }
        self.fallback.filter(|f| f.has_font(family, style))
    }
}

impl FontProvider for FontChain<'_> {
    fn glyph(&self, family: &str, style: &str, ch: char, size: f32) -> Option<GlyphOutline> {
        self.pick(family, style)?.glyph(family, style, ch, size)
    }

    fn has_font(&self, family: &str, style: &str) -> bool {
        self.pick(family, style).is_some()
    }
}
