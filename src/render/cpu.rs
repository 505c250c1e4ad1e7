//! Raster backend on `vello_cpu` with byte-kernel compositing.
//!
//! Every surface on the stack pairs a `vello_cpu` context (pending vector draws) with an
//! accumulated premultiplied pixmap. Draws with the normal blend mode batch in the context;
//! anything else (non-normal blends, composite scopes, effects) flushes first and is
//! composited on the CPU.

use crate::foundation::core::{BlendMode, RenderRegion, Rgba8};
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::foundation::math::mul_div255_u8;
use crate::model::gradient::{GradientGeometry, GradientPaint};
use crate::model::object::FillRule;
use crate::render::composite;
use crate::render::effect::SceneEffect;
use crate::render::filter;
use crate::render::method::{CompositionFlag, CompositorId, MaskMethod, RenderMethod};
use crate::render::picture::PreparedImage;
use crate::render::shape::{PreparedShape, ShapeFill};
use crate::render::surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Owner {
    Root,
    Mask(usize),
    Content(usize),
}

struct Surface {
    ctx: vello_cpu::RenderContext,
    accum: vello_cpu::Pixmap,
    owner: Owner,
    dirty: bool,
}

#[derive(Debug)]
struct Compositor {
    region: RenderRegion,
    flags: CompositionFlag,
    blend: BlendMode,
    method: MaskMethod,
    opacity: u8,
    mask: Option<vello_cpu::Pixmap>,
    consumed: bool,
}

/// CPU raster backend for one canvas size.
pub struct CpuRenderer {
    width: u16,
    height: u16,
    surfaces: Vec<Surface>,
    compositors: Vec<Option<Compositor>>,
    clips: Vec<vello_cpu::kurbo::BezPath>,
    blend: BlendMode,
    spare: Vec<vello_cpu::RenderContext>,
    scratch: vello_cpu::Pixmap,
    pool: SurfacePool,
    failed: bool,
}

impl std::fmt::Debug for CpuRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuRenderer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.surfaces.len())
            .finish()
    }
}

impl CpuRenderer {
    /// Renderer for a `width × height` canvas.
    pub fn new(width: u32, height: u32, pool: SurfacePoolOpts) -> KinegraphResult<Self> {
        let (w, h) = canvas_size(width, height)?;
        let mut pool = SurfacePool::new(pool);
        let root = Surface {
            ctx: vello_cpu::RenderContext::new(w, h),
            accum: pool.borrow(w, h),
            owner: Owner::Root,
            dirty: false,
        };
        Ok(Self {
            width: w,
            height: h,
            surfaces: vec![root],
            compositors: Vec::new(),
            clips: Vec::new(),
            blend: BlendMode::Normal,
            spare: Vec::new(),
            scratch: vello_cpu::Pixmap::new(w, h),
            pool,
            failed: false,
        })
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Scratch surface pool counters.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.pool.stats()
    }

    /// Start a frame, clearing the canvas to `background` (transparent when `None`).
    pub fn begin_frame(&mut self, background: Option<Rgba8>) {
        while self.surfaces.len() > 1 {
            if let Some(s) = self.surfaces.pop() {
                self.retire(s.ctx, s.accum);
            }
        }
        for c in self.compositors.drain(..).flatten() {
            if let Some(m) = c.mask {
                self.pool.release(m);
            }
        }
        self.clips.clear();
        self.blend = BlendMode::Normal;
        self.failed = false;

        if let Some(root) = self.surfaces.first_mut() {
            root.ctx.reset();
            root.dirty = false;
            let fill = background.map_or([0; 4], Rgba8::premultiplied);
            for px in root.accum.data_as_u8_slice_mut().chunks_exact_mut(4) {
                px.copy_from_slice(&fill);
            }
        }
    }

    /// Resolve pending draws and return the finished canvas.
    pub fn finish_frame(&mut self) -> KinegraphResult<&vello_cpu::Pixmap> {
        if self.surfaces.len() != 1 {
            return Err(KinegraphError::render("unbalanced composite scopes"));
        }
        if self.failed {
            return Err(KinegraphError::render("a draw failed during the frame"));
        }
        self.flush(BlendMode::Normal)?;
        self.surfaces
            .first()
            .map(|s| &s.accum)
            .ok_or_else(|| KinegraphError::render("root surface missing"))
    }

    fn retire(&mut self, ctx: vello_cpu::RenderContext, accum: vello_cpu::Pixmap) {
        self.spare.push(ctx);
        self.pool.release(accum);
    }

    fn push_surface(&mut self, owner: Owner) {
        let ctx = match self.spare.pop() {
            Some(mut ctx) => {
                ctx.reset();
                ctx
            }
            None => vello_cpu::RenderContext::new(self.width, self.height),
        };
        let accum = self.pool.borrow(self.width, self.height);
        self.surfaces.push(Surface {
            ctx,
            accum,
            owner,
            dirty: false,
        });
    }

    /// Pop the top surface if `owner` matches, with its pending draws resolved.
    fn pop_surface(&mut self, owner: Owner) -> KinegraphResult<vello_cpu::Pixmap> {
        if self.surfaces.last().map(|s| s.owner) != Some(owner) || self.surfaces.len() < 2 {
            return Err(KinegraphError::render(format!(
                "surface {owner:?} is not on top"
            )));
        }
        self.flush(BlendMode::Normal)?;
        let s = self
            .surfaces
            .pop()
            .ok_or_else(|| KinegraphError::render("surface stack underflow"))?;
        self.spare.push(s.ctx);
        Ok(s.accum)
    }

    /// Resolve the top surface's batched draws onto its pixmap with `mode`.
    fn flush(&mut self, mode: BlendMode) -> KinegraphResult<()> {
        let Self {
            surfaces, scratch, ..
        } = self;
        let Some(top) = surfaces.last_mut() else {
            return Ok(());
        };
        if !top.dirty {
            return Ok(());
        }
        top.ctx.flush();
        scratch.data_as_u8_slice_mut().fill(0);
        top.ctx.render_to_pixmap(scratch);
        top.ctx.reset();
        top.dirty = false;
        composite::blend_in_place(
            top.accum.data_as_u8_slice_mut(),
            scratch.data_as_u8_slice(),
            255,
            mode,
        )
    }

    /// Run `f` on the top context inside the active clips.
    fn draw(&mut self, f: impl FnOnce(&mut vello_cpu::RenderContext)) -> bool {
        let blend = self.blend;
        if blend != BlendMode::Normal {
            let r = self.flush(BlendMode::Normal);
            if self.note(r).is_none() {
                return false;
            }
        }
        let Some(top) = self.surfaces.last_mut() else {
            return false;
        };
        let ctx = &mut top.ctx;
        ctx.reset_transform();
        for clip in &self.clips {
            ctx.push_clip_layer(clip);
        }
        f(ctx);
        for _ in &self.clips {
            ctx.pop_layer();
        }
        top.dirty = true;
        if blend != BlendMode::Normal {
            let r = self.flush(blend);
            return self.note(r).is_some();
        }
        true
    }

    fn note<T>(&mut self, r: KinegraphResult<T>) -> Option<T> {
        match r {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "cpu renderer step failed");
                self.failed = true;
                None
            }
        }
    }

    fn compositor(&mut self, id: CompositorId) -> Option<&mut Compositor> {
        self.compositors.get_mut(id.0).and_then(Option::as_mut)
    }

    fn end_scope(&mut self, id: CompositorId) -> KinegraphResult<()> {
        let mut content = self.pop_surface(Owner::Content(id.0))?;
        let comp = self
            .compositors
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| KinegraphError::render("unknown compositor"))?;
        tracing::trace!(id = id.0, region = ?comp.region, flags = comp.flags.bits(), "end composite");

        let result = if comp.consumed {
            Ok(())
        } else {
            self.resolve_scope(&comp, &mut content)
        };
        self.pool.release(content);
        if let Some(m) = comp.mask {
            self.pool.release(m);
        }
        result
    }

    fn resolve_scope(&mut self, comp: &Compositor, content: &mut vello_cpu::Pixmap) -> KinegraphResult<()> {
        let mut opacity = comp.opacity;
        if let Some(mask) = &comp.mask {
            let (c, m) = (content.data_as_u8_slice_mut(), mask.data_as_u8_slice());
            match comp.method {
                MaskMethod::None => {}
                method if method.is_merging() => composite::merge_in_place(c, m, method)?,
                method => {
                    composite::mask_in_place(c, m, method, comp.opacity)?;
                    opacity = 255;
                }
            }
        }
        self.composite_onto_top(content, opacity, comp.blend)
    }

    fn composite_onto_top(&mut self, content: &vello_cpu::Pixmap, opacity: u8, blend: BlendMode) -> KinegraphResult<()> {
        self.flush(BlendMode::Normal)?;
        let top = self
            .surfaces
            .last_mut()
            .ok_or_else(|| KinegraphError::render("surface stack underflow"))?;
        composite::blend_in_place(
            top.accum.data_as_u8_slice_mut(),
            content.data_as_u8_slice(),
            opacity,
            blend,
        )
    }

    fn apply_effect(&mut self, id: CompositorId, effect: &SceneEffect, direct: bool) -> KinegraphResult<()> {
        if self.surfaces.last().map(|s| s.owner) != Some(Owner::Content(id.0)) {
            return Err(KinegraphError::render("effect target is not the current scope"));
        }
        self.flush(BlendMode::Normal)?;
        let (w, h) = (self.width(), self.height());
        let top = self
            .surfaces
            .last_mut()
            .ok_or_else(|| KinegraphError::render("surface stack underflow"))?;
        filter::apply_effect(top.accum.data_as_u8_slice_mut(), w, h, effect)?;
        if !direct {
            return Ok(());
        }

        let (opacity, blend) = match self.compositor(id) {
            Some(c) => {
                c.consumed = true;
                (c.opacity, c.blend)
            }
            None => return Err(KinegraphError::render("unknown compositor")),
        };
        // Composite into the parent without popping the scope; end_composite discards it.
        let len = self.surfaces.len();
        if len < 2 {
            return Err(KinegraphError::render("surface stack underflow"));
        }
        let (below, above) = self.surfaces.split_at_mut(len - 1);
        let parent = &mut below[len - 2];
        if parent.dirty {
            parent.ctx.flush();
            self.scratch.data_as_u8_slice_mut().fill(0);
            parent.ctx.render_to_pixmap(&mut self.scratch);
            parent.ctx.reset();
            parent.dirty = false;
            composite::blend_in_place(
                parent.accum.data_as_u8_slice_mut(),
                self.scratch.data_as_u8_slice(),
                255,
                BlendMode::Normal,
            )?;
        }
        composite::blend_in_place(
            parent.accum.data_as_u8_slice_mut(),
            above[0].accum.data_as_u8_slice(),
            opacity,
            blend,
        )
    }
}

fn canvas_size(width: u32, height: u32) -> KinegraphResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| KinegraphError::invalid_arguments("canvas width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| KinegraphError::invalid_arguments("canvas height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(KinegraphError::invalid_arguments("canvas has no pixels"));
    }
    Ok((w, h))
}

impl RenderMethod for CpuRenderer {
    fn viewport(&self) -> RenderRegion {
        RenderRegion::new(0, 0, i32::from(self.width), i32::from(self.height))
    }

    fn blend(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn render_shape(&mut self, shape: &PreparedShape) -> bool {
        if shape.bounds.intersect(self.viewport()).is_empty() {
            return true;
        }
        self.draw(|ctx| {
            let paint_transform = affine_to_cpu(shape.paint_transform);
            let fill = |ctx: &mut vello_cpu::RenderContext| {
                if let Some((path, paint, rule)) = &shape.fill {
                    ctx.set_fill_rule(match rule {
                        FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
                        FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
                    });
                    set_paint(ctx, paint, shape.opacity, paint_transform);
                    ctx.fill_path(&bezpath_to_cpu(path));
                }
            };
            let stroke = |ctx: &mut vello_cpu::RenderContext| {
                if let Some((outline, paint)) = &shape.stroke {
                    ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
                    set_paint(ctx, paint, shape.opacity, paint_transform);
                    ctx.fill_path(&bezpath_to_cpu(outline));
                }
            };
            if shape.stroke_first {
                stroke(ctx);
                fill(ctx);
            } else {
                fill(ctx);
                stroke(ctx);
            }
        })
    }

    fn render_image(&mut self, image: &PreparedImage) -> bool {
        self.draw(|ctx| {
            ctx.set_transform(affine_to_cpu(image.transform));
            ctx.reset_paint_transform();
            ctx.set_paint(image.image.paint.clone());
            let translucent = image.opacity < 255;
            if translucent {
                ctx.push_opacity_layer(f32::from(image.opacity) / 255.0);
            }
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(image.image.width()),
                f64::from(image.image.height()),
            ));
            if translucent {
                ctx.pop_layer();
            }
        })
    }

    fn target(&mut self, region: RenderRegion, flags: CompositionFlag) -> Option<CompositorId> {
        let region = region.intersect(self.viewport());
        if region.is_empty() {
            return None;
        }
        self.compositors.push(Some(Compositor {
            region,
            flags,
            blend: self.blend,
            method: MaskMethod::None,
            opacity: 255,
            mask: None,
            consumed: false,
        }));
        Some(CompositorId(self.compositors.len() - 1))
    }

    fn begin_mask(&mut self, cmp: CompositorId) -> bool {
        if self.compositor(cmp).is_none() {
            return false;
        }
        self.push_surface(Owner::Mask(cmp.0));
        true
    }

    fn begin_composite(&mut self, cmp: CompositorId, method: MaskMethod, opacity: u8) -> bool {
        if self.compositor(cmp).is_none() {
            return false;
        }
        let mask = if self.surfaces.last().map(|s| s.owner) == Some(Owner::Mask(cmp.0)) {
            let popped = self.pop_surface(Owner::Mask(cmp.0));
            self.note(popped)
        } else {
            None
        };
        if let Some(c) = self.compositor(cmp) {
            c.method = method;
            c.opacity = opacity;
            if mask.is_some() {
                c.mask = mask;
            }
        }
        tracing::trace!(id = cmp.0, ?method, opacity, "begin composite");
        self.push_surface(Owner::Content(cmp.0));
        true
    }

    fn end_composite(&mut self, cmp: CompositorId) -> bool {
        let r = self.end_scope(cmp);
        self.note(r).is_some()
    }

    fn push_clip(&mut self, clip: &kurbo::BezPath) {
        self.clips.push(bezpath_to_cpu(clip));
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
    }

    fn render_effect(&mut self, cmp: CompositorId, effect: &SceneEffect, direct: bool) -> bool {
        let r = self.apply_effect(cmp, effect, direct);
        self.note(r).is_some()
    }
}

fn set_paint(
    ctx: &mut vello_cpu::RenderContext,
    paint: &ShapeFill,
    opacity: u8,
    paint_transform: vello_cpu::kurbo::Affine,
) {
    match paint {
        ShapeFill::Solid(c) => {
            ctx.reset_paint_transform();
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                c.r,
                c.g,
                c.b,
                mul_div255_u8(u16::from(c.a), u16::from(opacity)),
            ));
        }
        ShapeFill::Gradient(g) => {
            ctx.set_paint_transform(paint_transform);
            ctx.set_paint(gradient_to_cpu(g, opacity));
        }
    }
}

fn gradient_to_cpu(g: &GradientPaint, opacity: u8) -> vello_cpu::peniko::Gradient {
    let stops: Vec<vello_cpu::peniko::ColorStop> = g
        .stops
        .iter()
        .map(|s| {
            let a = mul_div255_u8(u16::from(s.color.a), u16::from(opacity));
            let color = vello_cpu::peniko::Color::from_rgba8(s.color.r, s.color.g, s.color.b, a);
            vello_cpu::peniko::ColorStop::from((s.offset, color))
        })
        .collect();
    let gradient = match g.geometry {
        GradientGeometry::Linear { start, end } => {
            vello_cpu::peniko::Gradient::new_linear(point_to_cpu(start), point_to_cpu(end))
        }
        GradientGeometry::Radial {
            center,
            radius,
            focal,
        } => vello_cpu::peniko::Gradient::new_two_point_radial(
            point_to_cpu(focal),
            0.0,
            point_to_cpu(center),
            radius as f32,
        ),
    };
    gradient.with_stops(stops.as_slice())
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
