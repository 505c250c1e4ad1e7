//! Animated GIF export.
//!
//! Frames are sampled every `1 / fps` seconds over the active range and rendered in chunks.
//! With `parallel` set, each chunk is spread over a dedicated rayon pool whose workers hold
//! their own clone of the session; the encoder always receives frames in order.

use std::io::Write;

use image::codecs::gif::{GifEncoder, Repeat};
use rayon::prelude::*;

use crate::animation::{Animation, RenderOpts, Session};
use crate::foundation::core::{ColorSpace, Rgb8, Rgba8};
use crate::foundation::error::{KinegraphError, KinegraphResult};

/// Highest frame rate an export samples at.
pub const MAX_GIF_FPS: i32 = 60;

/// GIF frame size limit.
const MAX_GIF_SIDE: u32 = u16::MAX as u32;

/// Quantizer speed handed to the encoder (1 slowest, 30 fastest).
const QUANTIZER_SPEED: i32 = 10;

/// Options for [`export_gif`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GifExportOpts {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Fill under every frame unless `transparent` is set.
    pub background: Rgb8,
    /// Keep uncovered pixels transparent.
    pub transparent: bool,
    /// Sampling rate. Values above 60 are clamped; `<= 0` uses the composition rate.
    pub fps: i32,
    /// Render frames on a rayon pool.
    pub parallel: bool,
    /// Frames rendered before they are handed to the encoder.
    pub chunk_size: usize,
    /// Rayon worker count. `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for GifExportOpts {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            background: Rgb8::WHITE,
            transparent: false,
            fps: 0,
            parallel: true,
            chunk_size: 32,
            threads: None,
        }
    }
}

/// Export progress callbacks. Every method defaults to doing nothing.
pub trait ExportProgress {
    /// Called once before the first frame is rendered.
    fn on_started(&mut self) {}

    /// Called after each frame is encoded with its composition frame number and the number
    /// of frames in the active range.
    fn on_progress(&mut self, frame: u32, total: u32) {
        let _ = (frame, total);
    }

    /// Called once after the last frame is encoded.
    fn on_finished(&mut self) {}
}

impl ExportProgress for () {}

/// Sampling rate for a `requested` rate and the composition's `native` one.
pub fn export_fps(requested: i32, native: f32) -> f32 {
    if requested <= 0 {
        native
    } else {
        requested.min(MAX_GIF_FPS) as f32
    }
}

/// Frame numbers (relative to the active range) sampled every `1 / fps` seconds.
pub fn sample_frames(total_frames: f32, duration: f32, fps: f32) -> Vec<f32> {
    if !(duration > 0.0 && fps > 0.0 && total_frames > 0.0) {
        return Vec::new();
    }
    let delay = 1.0 / fps;
    let count = (duration / delay).ceil() as usize;
    (0..count)
        .map(|i| i as f32 * delay)
        .take_while(|&t| t < duration)
        .map(|t| total_frames * (t / duration))
        .collect()
}

/// Encode the active range of `anim` as an endlessly looping GIF into `out`.
///
/// Returns the number of frames written. `anim` itself is not modified.
#[tracing::instrument(level = "debug", skip_all, fields(w = opts.width, h = opts.height, fps = opts.fps))]
pub fn export_gif<W: Write>(
    anim: &Animation,
    out: W,
    opts: &GifExportOpts,
    progress: &mut dyn ExportProgress,
) -> KinegraphResult<usize> {
    let (w, h) = (opts.width, opts.height);
    if w == 0 || h == 0 || w > MAX_GIF_SIDE || h > MAX_GIF_SIDE {
        return Err(KinegraphError::invalid_arguments(format!(
            "gif size {w}x{h} is outside 1..={MAX_GIF_SIDE}"
        )));
    }
    let native = anim
        .composition()
        .map(|c| c.frame_rate)
        .ok_or_else(|| KinegraphError::insufficient_condition("no composition loaded"))?;

    let mut base = anim.clone();
    base.set_size(w, h)?;
    base.set_render_opts(RenderOpts {
        color_space: ColorSpace::Abgr8888S,
        one_shot: false,
        background: (!opts.transparent)
            .then(|| Rgba8::new(opts.background.r, opts.background.g, opts.background.b, 255)),
        ..*anim.render_opts()
    });

    let fps = export_fps(opts.fps, native);
    let total = base.total_frames();
    let frames = sample_frames(total, base.duration(), fps);
    let delay = image::Delay::from_numer_denom_ms((100.0 / fps) as u32 * 10, 1);

    let mut encoder = GifEncoder::new_with_speed(out, QUANTIZER_SPEED);
    encoder.set_repeat(Repeat::Infinite).map_err(encode_error)?;

    progress.on_started();
    let chunk_size = opts.chunk_size.max(1);
    let pool = if opts.parallel {
        Some(build_thread_pool(opts.threads)?)
    } else {
        None
    };
    let session = base.session().clone();
    let mut serial = base;

    for chunk in frames.chunks(chunk_size) {
        let rendered: Vec<KinegraphResult<image::RgbaImage>> = match &pool {
            Some(pool) => pool.install(|| render_chunk_parallel(&session, chunk, w, h)),
            None => chunk.iter().map(|&f| render_rgba(&mut serial, f, w, h)).collect(),
        };
        for (img, &f) in rendered.into_iter().zip(chunk) {
            let frame = image::Frame::from_parts(img?, 0, 0, delay);
            encoder.encode_frame(frame).map_err(encode_error)?;
            progress.on_progress(f as u32, total as u32);
        }
    }
    progress.on_finished();

    tracing::debug!(frames = frames.len(), fps, "gif exported");
    Ok(frames.len())
}

fn render_chunk_parallel(
    session: &Session,
    chunk: &[f32],
    w: u32,
    h: u32,
) -> Vec<KinegraphResult<image::RgbaImage>> {
    chunk
        .par_iter()
        .map_init(
            || Animation::from_session(session.clone()),
            |anim, &f| render_rgba(anim, f, w, h),
        )
        .collect()
}

/// One straight-alpha RGBA frame.
fn render_rgba(anim: &mut Animation, frame: f32, w: u32, h: u32) -> KinegraphResult<image::RgbaImage> {
    let mut words = vec![0u32; w as usize * h as usize];
    anim.render_buffer(frame, &mut words, w as usize, w, h)?;
    // Abgr8888S words hold R, G, B, A from the low byte up.
    let bytes = words.iter().flat_map(|px| px.to_le_bytes()).collect();
    image::RgbaImage::from_raw(w, h, bytes)
        .ok_or_else(|| KinegraphError::render("frame buffer does not match the gif size"))
}

fn build_thread_pool(threads: Option<usize>) -> KinegraphResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(KinegraphError::invalid_arguments(
            "export 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| KinegraphError::render(format!("failed to build rayon thread pool: {e}")))
}

fn encode_error(err: image::ImageError) -> KinegraphError {
    KinegraphError::Other(anyhow::Error::new(err).context("encode gif frame"))
}
