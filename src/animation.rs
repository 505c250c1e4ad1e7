//! Animation sessions: one loaded composition, its overrides and the canvas it draws on.

use std::sync::Arc;

use kurbo::Affine;

use crate::assets::{FontProvider, ImageResolver, ImageStore};
use crate::builder::{BuildCx, build_frame};
use crate::color::registry::ColorRegistry;
use crate::color::remap::ColorRemap;
use crate::engine::Engine;
use crate::foundation::core::{ColorSpace, Rgba8};
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::loader::{self, LoadOptions};
use crate::model::composition::{Composition, Marker};
use crate::model::slot::PropertyValue;
use crate::render::canvas::{Canvas, FrameTarget};
use crate::render::paint::{Paint, PaintRef};
use crate::render::scene::Scene;
use crate::render::surface_pool::SurfacePoolOpts;
use crate::scheduler::TaskScheduler;

/// Per-session render options.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOpts {
    /// Layout used by [`Animation::render_buffer`].
    pub color_space: ColorSpace,
    /// Build a fresh canvas on every render instead of updating one kept across frames.
    pub one_shot: bool,
    /// Fill drawn under the composition. `None` leaves the frame transparent.
    pub background: Option<Rgba8>,
    /// Scratch surface pool of the session canvas.
    pub surface_pool: SurfacePoolOpts,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Abgr8888,
            one_shot: false,
            background: None,
            surface_pool: SurfacePoolOpts::default(),
        }
    }
}

/// Summary of a loaded composition.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoadedInfo {
    /// Frames between the in and out points.
    pub total_frames: f32,
    /// Playback length in milliseconds.
    pub duration_ms: u64,
    /// Composition width.
    pub width: u32,
    /// Composition height.
    pub height: u32,
}

impl LoadedInfo {
    fn of(comp: &Composition) -> Self {
        Self {
            total_frames: comp.frame_count(),
            duration_ms: (f64::from(comp.duration()) * 1000.0).round() as u64,
            width: comp.width.round() as u32,
            height: comp.height.round() as u32,
        }
    }
}

#[derive(Clone, Debug)]
struct Loaded {
    comp: Composition,
    remap: ColorRemap,
    info: LoadedInfo,
    /// Active frame range in composition time.
    range: (f32, f32),
}

/// Everything a session needs to build frames. Cheap to clone: the composition is the only
/// deep copy.
#[derive(Clone)]
pub(crate) struct Session {
    scheduler: Arc<TaskScheduler>,
    registry: ColorRegistry,
    images: Arc<ImageStore>,
    fonts: Option<Arc<dyn FontProvider>>,
    opts: RenderOpts,
    /// Viewport the composition is fit into. `None` uses the target size.
    size: Option<(u32, u32)>,
    loaded: Option<Loaded>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("scheduler", &self.scheduler)
            .field("opts", &self.opts)
            .field("size", &self.size)
            .field("loaded", &self.loaded.as_ref().map(|l| l.info))
            .finish()
    }
}

/// Canvas kept across incremental renders, with the root the frame trees hang from.
#[derive(Debug)]
struct Live {
    canvas: Canvas,
    root: PaintRef,
}

/// A loaded animation that renders frames into caller buffers.
///
/// Cloning copies the composition and its slot state; the clone gets its own canvas on
/// first render and shares the worker pool, image cache and color registry.
#[derive(Debug)]
pub struct Animation {
    session: Session,
    live: Option<Live>,
}

impl Clone for Animation {
    fn clone(&self) -> Self {
        Self::from_session(self.session.clone())
    }
}

impl Animation {
    /// Empty session drawing with `engine`'s worker pool.
    pub fn new(engine: &Engine) -> Self {
        Self::from_session(Session {
            scheduler: Arc::clone(engine.scheduler()),
            registry: ColorRegistry::new(),
            images: Arc::new(ImageStore::default()),
            fonts: None,
            opts: RenderOpts::default(),
            size: None,
            loaded: None,
        })
    }

    pub(crate) fn from_session(session: Session) -> Self {
        Self {
            session,
            live: None,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Use `registry` for `[|name|]` tagged fills and strokes.
    pub fn with_registry(mut self, registry: ColorRegistry) -> Self {
        self.session.registry = registry;
        self
    }

    /// Resolve image payloads through `resolver`. Clears the decoded image cache.
    pub fn with_image_resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.session.images = Arc::new(ImageStore::new(resolver));
        self
    }

    /// Serve fonts the document does not embed from `fonts`.
    pub fn with_font_provider(mut self, fonts: Arc<dyn FontProvider>) -> Self {
        self.session.fonts = Some(fonts);
        self
    }

    /// Replace the render options. Drops the kept canvas.
    pub fn set_render_opts(&mut self, opts: RenderOpts) {
        self.session.opts = opts;
        self.live = None;
    }

    /// Current render options.
    pub fn render_opts(&self) -> &RenderOpts {
        &self.session.opts
    }

    /// Registry consulted for tagged colors.
    pub fn registry(&self) -> &ColorRegistry {
        &self.session.registry
    }

    /// Parse `bytes` and make it the session's composition.
    ///
    /// On failure the previous composition, if any, stays loaded.
    #[tracing::instrument(level = "debug", skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn load(&mut self, bytes: &[u8], opts: LoadOptions) -> KinegraphResult<LoadedInfo> {
        let comp = loader::parse(bytes, &opts)?;
        let info = LoadedInfo::of(&comp);
        let range = (comp.in_frame, comp.out_frame);
        self.session.loaded = Some(Loaded {
            comp,
            remap: opts.remap(),
            info,
            range,
        });
        self.live = None;
        Ok(info)
    }

    /// Summary of the loaded composition.
    pub fn info(&self) -> Option<LoadedInfo> {
        self.session.loaded.as_ref().map(|l| l.info)
    }

    /// Loaded composition.
    pub fn composition(&self) -> Option<&Composition> {
        self.session.loaded.as_ref().map(|l| &l.comp)
    }

    /// Named time ranges of the loaded composition.
    pub fn markers(&self) -> &[Marker] {
        self.composition().map_or(&[], |c| c.markers.as_slice())
    }

    /// Frames in the active range.
    pub fn total_frames(&self) -> f32 {
        self.session
            .loaded
            .as_ref()
            .map_or(0.0, |l| (l.range.1 - l.range.0).max(0.0))
    }

    /// Length of the active range in seconds.
    pub fn duration(&self) -> f32 {
        match &self.session.loaded {
            Some(l) if l.comp.frame_rate > 0.0 => self.total_frames() / l.comp.frame_rate,
            _ => 0.0,
        }
    }

    /// Restrict playback to `marker`'s range. Frame `0` becomes the marker start.
    pub fn segment(&mut self, marker: &str) -> KinegraphResult<()> {
        let loaded = self.loaded_mut()?;
        let Some(m) = loaded.comp.marker(marker) else {
            return Err(KinegraphError::invalid_arguments(format!("no marker named {marker:?}")));
        };
        let (start, end) = (m.time, m.time + m.duration);
        let start = start.clamp(loaded.comp.in_frame, loaded.comp.out_frame);
        let end = end.clamp(start, loaded.comp.out_frame);
        loaded.range = (start, end);
        Ok(())
    }

    /// Play the whole composition again.
    pub fn clear_segment(&mut self) {
        if let Some(l) = &mut self.session.loaded {
            l.range = (l.comp.in_frame, l.comp.out_frame);
        }
    }

    /// Fit the composition into a `width` by `height` viewport, keeping its aspect ratio
    /// and centering it.
    pub fn set_size(&mut self, width: u32, height: u32) -> KinegraphResult<()> {
        if width == 0 || height == 0 {
            return Err(KinegraphError::invalid_arguments(format!(
                "viewport {width}x{height} has no pixels"
            )));
        }
        self.session.size = Some((width, height));
        Ok(())
    }

    /// Apply a slot override document `{"<sid>": {"p": <value>}, ...}`.
    ///
    /// Returns the number of slots written. Entries that name no slot or do not fit their
    /// property are skipped.
    pub fn apply_slot(&mut self, json: &str) -> KinegraphResult<usize> {
        let loaded = self.loaded_mut()?;
        let values = loader::parse_slot_overrides(&mut loaded.comp, json, &loaded.remap)?;
        for (sid, value) in &values {
            loaded.comp.assign_slot(sid, value, false, &loaded.remap);
        }
        Ok(values.len())
    }

    /// Write `value` through slot `sid`.
    pub fn set_slot(&mut self, sid: &str, value: PropertyValue) -> KinegraphResult<()> {
        let loaded = self.loaded_mut()?;
        let Some(slot) = loaded.comp.slot(sid) else {
            return Err(KinegraphError::invalid_arguments(format!("no slot {sid:?}")));
        };
        if slot.kind() != value.kind() {
            return Err(KinegraphError::invalid_arguments(format!(
                "slot {sid:?} holds {:?}, got {:?}",
                slot.kind(),
                value.kind()
            )));
        }
        loaded.comp.assign_slot(sid, &value, false, &loaded.remap);
        Ok(())
    }

    /// Restore the document values behind slot `sid`.
    pub fn reset_slot(&mut self, sid: &str) -> KinegraphResult<()> {
        let loaded = self.loaded_mut()?;
        if !loaded.comp.reset_slot(sid, &loaded.remap) {
            return Err(KinegraphError::invalid_arguments(format!("no slot {sid:?}")));
        }
        Ok(())
    }

    /// Restore every overridden slot.
    pub fn reset_slots(&mut self) -> KinegraphResult<()> {
        let loaded = self.loaded_mut()?;
        loaded.comp.reset_slots(&loaded.remap);
        Ok(())
    }

    /// Paint tree of `frame`, placed in a `width` by `height` target.
    pub fn build(&self, frame: f32, width: u32, height: u32) -> KinegraphResult<Scene> {
        let loaded = self.loaded()?;
        if !frame.is_finite() {
            return Err(KinegraphError::invalid_arguments(format!("frame {frame} is not finite")));
        }
        let s = &self.session;
        let cx = BuildCx {
            comp: &loaded.comp,
            remap: &loaded.remap,
            registry: &s.registry,
            images: &s.images,
            fonts: s.fonts.as_deref(),
        };
        let (start, end) = loaded.range;
        let mut scene = build_frame(&cx, (start + frame).clamp(start, end));

        let (vw, vh) = s.size.unwrap_or((width, height));
        scene.state_mut().transform = aspect_fit(
            (f64::from(loaded.comp.width), f64::from(loaded.comp.height)),
            (f64::from(vw), f64::from(vh)),
        );
        Ok(scene)
    }

    /// Draw `frame` (relative to the active range) into `target`.
    ///
    /// A failed render leaves `target` as it was.
    #[tracing::instrument(level = "debug", skip(self, target), fields(w = target.width(), h = target.height()))]
    pub fn render(&mut self, frame: f32, target: &mut FrameTarget<'_>) -> KinegraphResult<()> {
        let (w, h) = (target.width(), target.height());
        let scene = self.build(frame, w, h)?;
        let opts = self.session.opts;

        if opts.one_shot {
            let mut canvas = Canvas::new(w, h, Arc::clone(&self.session.scheduler), opts.surface_pool)?;
            canvas.push(PaintRef::new(scene));
            canvas.update();
            canvas.draw(opts.background)?;
            return canvas.sync(target);
        }

        let live = self.live(w, h)?;
        if let Paint::Scene(root) = &mut *live.root.lock() {
            root.clear();
            root.push(PaintRef::new(scene));
        }
        live.canvas.update();
        live.canvas.draw(opts.background)?;
        live.canvas.sync(target)
    }

    /// [`Animation::render`] into a raw buffer laid out as the session's color space.
    pub fn render_buffer(
        &mut self,
        frame: f32,
        buf: &mut [u32],
        stride: usize,
        width: u32,
        height: u32,
    ) -> KinegraphResult<()> {
        let color_space = self.session.opts.color_space;
        let mut target = FrameTarget::new(buf, stride, width, height, color_space)?;
        self.render(frame, &mut target)
    }

    fn live(&mut self, width: u32, height: u32) -> KinegraphResult<&mut Live> {
        let stale = self
            .live
            .as_ref()
            .is_none_or(|l| l.canvas.width() != width || l.canvas.height() != height);
        if stale {
            let s = &self.session;
            let mut canvas = Canvas::new(width, height, Arc::clone(&s.scheduler), s.opts.surface_pool)?;
            let root = PaintRef::new(Scene::new());
            canvas.push(root.clone());
            self.live = Some(Live { canvas, root });
        }
        self.live
            .as_mut()
            .ok_or_else(|| KinegraphError::render("canvas unavailable"))
    }

    fn loaded(&self) -> KinegraphResult<&Loaded> {
        self.session
            .loaded
            .as_ref()
            .ok_or_else(|| KinegraphError::insufficient_condition("no composition loaded"))
    }

    fn loaded_mut(&mut self) -> KinegraphResult<&mut Loaded> {
        self.session
            .loaded
            .as_mut()
            .ok_or_else(|| KinegraphError::insufficient_condition("no composition loaded"))
    }
}

/// Uniform scale and centering offset that fit `content` inside `view`.
pub(crate) fn aspect_fit(content: (f64, f64), view: (f64, f64)) -> Affine {
    let (cw, ch) = content;
    let (vw, vh) = view;
    if cw <= 0.0 || ch <= 0.0 {
        return Affine::IDENTITY;
    }
    let scale = (vw / cw).min(vh / ch);
    Affine::translate(((vw - cw * scale) * 0.5, (vh - ch * scale) * 0.5)) * Affine::scale(scale)
}

#[cfg(test)]
#[path = "../tests/unit/animation.rs"]
mod tests;
