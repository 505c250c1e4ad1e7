//! Canvas: the root paint list, its renderer and the caller's frame buffer.

use std::sync::Arc;

use kurbo::Affine;

use crate::foundation::core::{ColorSpace, Rgba8};
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::render::cpu::CpuRenderer;
use crate::render::paint::{PaintRef, UpdateCx};
use crate::render::surface_pool::{SurfacePoolOpts, SurfacePoolStats};
use crate::scheduler::TaskScheduler;

/// Caller-owned 32-bit frame buffer.
#[derive(Debug)]
pub struct FrameTarget<'a> {
    buf: &'a mut [u32],
    stride: usize,
    width: u32,
    height: u32,
    color_space: ColorSpace,
}

impl<'a> FrameTarget<'a> {
    /// Wrap `buf` as `height` rows of `stride` words, `width` of which are visible.
    pub fn new(
        buf: &'a mut [u32],
        stride: usize,
        width: u32,
        height: u32,
        color_space: ColorSpace,
    ) -> KinegraphResult<Self> {
        if width == 0 || height == 0 {
            return Err(KinegraphError::invalid_arguments("frame target has no pixels"));
        }
        if stride < width as usize {
            return Err(KinegraphError::invalid_arguments(format!(
                "stride {stride} is narrower than width {width}"
            )));
        }
        let needed = stride
            .checked_mul(height as usize - 1)
            .and_then(|v| v.checked_add(width as usize))
            .ok_or_else(|| KinegraphError::invalid_arguments("frame target size overflow"))?;
        if buf.len() < needed {
            return Err(KinegraphError::invalid_arguments(format!(
                "frame buffer holds {} words, {needed} needed",
                buf.len()
            )));
        }
        Ok(Self {
            buf,
            stride,
            width,
            height,
            color_space,
        })
    }

    /// Visible width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Visible height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Words of the visible pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.buf.get(y as usize * self.stride + x as usize).copied()
    }

    fn write_premul_rgba8(&mut self, rgba: &[u8]) {
        let w = self.width as usize;
        for (y, row) in rgba.chunks_exact(w * 4).take(self.height as usize).enumerate() {
            let start = y * self.stride;
            for (dst, px) in self.buf[start..start + w].iter_mut().zip(row.chunks_exact(4)) {
                *dst = self.color_space.pack([px[0], px[1], px[2], px[3]]);
            }
        }
    }
}

/// Root paint list drawn onto one CPU surface.
pub struct Canvas {
    renderer: CpuRenderer,
    scheduler: Arc<TaskScheduler>,
    paints: Vec<PaintRef>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("renderer", &self.renderer)
            .field("paints", &self.paints.len())
            .finish()
    }
}

impl Canvas {
    /// Canvas of the given size whose geometry jobs run on `scheduler`.
    pub fn new(
        width: u32,
        height: u32,
        scheduler: Arc<TaskScheduler>,
        pool: SurfacePoolOpts,
    ) -> KinegraphResult<Self> {
        Ok(Self {
            renderer: CpuRenderer::new(width, height, pool)?,
            scheduler,
            paints: Vec::new(),
        })
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.renderer.width()
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.renderer.height()
    }

    /// Root paints in z-order.
    pub fn paints(&self) -> &[PaintRef] {
        &self.paints
    }

    /// Add a root paint on top.
    pub fn push(&mut self, paint: PaintRef) {
        self.paints.push(paint);
    }

    /// Drop every root paint.
    pub fn clear(&mut self) {
        self.paints.clear();
    }

    /// Scratch surface pool counters.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.renderer.pool_stats()
    }

    /// Resolve every root paint for the current frame.
    pub fn update(&mut self) {
        let mut cx = UpdateCx {
            renderer: &mut self.renderer,
            scheduler: &self.scheduler,
        };
        for p in &self.paints {
            p.lock().update(&mut cx, Affine::IDENTITY, 255);
        }
    }

    /// Rasterize the root paints onto the internal surface.
    #[tracing::instrument(level = "debug", skip(self), fields(paints = self.paints.len()))]
    pub fn draw(&mut self, background: Option<Rgba8>) -> KinegraphResult<()> {
        self.renderer.begin_frame(background);
        let mut ok = true;
        for p in &self.paints {
            ok &= p.lock().render(&mut self.renderer);
        }
        self.renderer.finish_frame()?;
        if !ok {
            return Err(KinegraphError::render("paint tree failed to render"));
        }
        Ok(())
    }

    /// Premultiplied RGBA8 bytes of the last drawn frame.
    pub fn pixels(&mut self) -> KinegraphResult<&[u8]> {
        Ok(self.renderer.finish_frame()?.data_as_u8_slice())
    }

    /// Copy the last drawn frame into `target`.
    pub fn sync(&mut self, target: &mut FrameTarget<'_>) -> KinegraphResult<()> {
        if target.width() != self.width() || target.height() != self.height() {
            return Err(KinegraphError::invalid_arguments(format!(
                "target is {}x{}, canvas is {}x{}",
                target.width(),
                target.height(),
                self.width(),
                self.height()
            )));
        }
        let pixels = self.renderer.finish_frame()?.data_as_u8_slice();
        target.write_premul_rgba8(pixels);
        Ok(())
    }
}
