//! Bitmap paints.

use std::sync::Arc;

use kurbo::{Affine, Rect};

use crate::foundation::core::RenderRegion;
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::render::method::RenderMethod;
use crate::render::paint::PaintState;

/// Decoded premultiplied bitmap, cheap to clone.
#[derive(Clone)]
pub struct DecodedImage {
    pub(crate) paint: vello_cpu::Image,
    width: u16,
    height: u16,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl DecodedImage {
    /// Build from straight-alpha RGBA8 bytes.
    pub fn from_rgba8(mut rgba: Vec<u8>, width: u32, height: u32) -> KinegraphResult<Self> {
        premultiply_rgba8_in_place(&mut rgba);
        Self::from_premul_rgba8(&rgba, width, height)
    }

    /// Build from premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(bytes: &[u8], width: u32, height: u32) -> KinegraphResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| KinegraphError::invalid_arguments("image width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| KinegraphError::invalid_arguments("image height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(KinegraphError::invalid_arguments("image has no pixels"));
        }
        if bytes.len() != usize::from(w) * usize::from(h) * 4 {
            return Err(KinegraphError::invalid_arguments("image byte len mismatch"));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
            .collect();
        let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: w,
            height: h,
        })
    }

    /// Pixel width.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u16 {
        self.height
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

/// Image draw call in device space.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Bitmap.
    pub image: DecodedImage,
    /// Pixel-to-device transform.
    pub transform: Affine,
    /// Effective opacity.
    pub opacity: u8,
}

/// Bitmap stretched over a `width × height` box at the local origin.
#[derive(Debug)]
pub struct Picture {
    pub(crate) state: PaintState,
    image: DecodedImage,
    width: f64,
    height: f64,
    prepared: Option<PreparedImage>,
}

impl Picture {
    /// Picture showing `image` at the given display size.
    pub fn new(image: DecodedImage, width: f64, height: f64) -> Self {
        Self {
            state: PaintState::default(),
            image,
            width,
            height,
            prepared: None,
        }
    }

    /// Shared paint state.
    pub fn state_mut(&mut self) -> &mut PaintState {
        &mut self.state
    }

    pub(crate) fn update(&mut self, transform: Affine, opacity: u8) {
        let sx = self.width / f64::from(self.image.width);
        let sy = self.height / f64::from(self.image.height);
        self.prepared = Some(PreparedImage {
            image: self.image.clone(),
            transform: transform * Affine::scale_non_uniform(sx, sy),
            opacity,
        });
    }

    pub(crate) fn render(&mut self, renderer: &mut dyn RenderMethod) -> bool {
        match &self.prepared {
            Some(p) if p.opacity > 0 => renderer.render_image(p),
            _ => true,
        }
    }

    pub(crate) fn bounds(&self) -> RenderRegion {
        self.prepared.as_ref().map_or(RenderRegion::ZERO, |p| {
            let px = Rect::new(
                0.0,
                0.0,
                f64::from(self.image.width),
                f64::from(self.image.height),
            );
            RenderRegion::from_rect(p.transform.transform_rect_bbox(px))
        })
    }

    pub(crate) fn local_bounds(&self) -> Option<Rect> {
        Some(Rect::new(0.0, 0.0, self.width, self.height))
    }
}
