//! Post-processing filters over premultiplied RGBA8 surfaces.

use crate::foundation::core::{BlendMode, Rgb8};
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::foundation::math::{lerp, mul_div255_u8};
use crate::render::composite;
use crate::render::effect::{
    BlurDirection, DropShadow, FillEffect, GaussianBlur, SceneEffect, Tint, Tritone, kernel_radius,
};

/// Apply `effect` to a `width × height` surface in place.
#[tracing::instrument(level = "trace", skip(buf))]
pub fn apply_effect(buf: &mut [u8], width: u32, height: u32, effect: &SceneEffect) -> KinegraphResult<()> {
    check_len(buf, width, height)?;
    match effect {
        SceneEffect::GaussianBlur(b) => blur(buf, width, height, b),
        SceneEffect::DropShadow(s) => drop_shadow(buf, width, height, s),
        SceneEffect::Fill(f) => {
            fill(buf, f);
            Ok(())
        }
        SceneEffect::Tint(t) => {
            tint(buf, t);
            Ok(())
        }
        SceneEffect::Tritone(t) => {
            tritone(buf, t);
            Ok(())
        }
        SceneEffect::ClearAll => Ok(()),
    }
}

fn check_len(buf: &[u8], width: u32, height: u32) -> KinegraphResult<usize> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| KinegraphError::render("filter buffer size overflow"))?;
    if buf.len() != expected {
        return Err(KinegraphError::render(
            "filter expects a buffer matching width*height*4",
        ));
    }
    Ok(expected)
}

fn blur(buf: &mut [u8], width: u32, height: u32, b: &GaussianBlur) -> KinegraphResult<()> {
    blur_rgba8_premul(buf, width, height, b.device_sigma(), b.direction, b.wrap)
}

/// Separable Gaussian blur with Q16 fixed-point weights.
pub fn blur_rgba8_premul(
    buf: &mut [u8],
    width: u32,
    height: u32,
    sigma: f32,
    direction: BlurDirection,
    wrap: bool,
) -> KinegraphResult<()> {
    let len = check_len(buf, width, height)?;
    let radius = kernel_radius(sigma);
    if radius == 0 || len == 0 {
        return Ok(());
    }
    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; len];
    let geo = Geometry {
        width: width as i32,
        height: height as i32,
        wrap,
    };
    if direction != BlurDirection::Vertical {
        horizontal_pass(buf, &mut tmp, geo, &kernel);
        buf.copy_from_slice(&tmp);
    }
    if direction != BlurDirection::Horizontal {
        vertical_pass(buf, &mut tmp, geo, &kernel);
        buf.copy_from_slice(&tmp);
    }
    Ok(())
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> KinegraphResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(KinegraphError::invalid_arguments("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Rounding drift lands on the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

#[derive(Clone, Copy)]
struct Geometry {
    width: i32,
    height: i32,
    wrap: bool,
}

impl Geometry {
    fn sample(self, v: i32, len: i32) -> i32 {
        if self.wrap {
            v.rem_euclid(len)
        } else {
            v.clamp(0, len - 1)
        }
    }
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], g: Geometry, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    for y in 0..g.height {
        for x in 0..g.width {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = g.sample(x + ki as i32 - radius, g.width);
                let idx = ((y * g.width + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * g.width + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], g: Geometry, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    for y in 0..g.height {
        for x in 0..g.width {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = g.sample(y + ki as i32 - radius, g.height);
                let idx = ((sy * g.width + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * g.width + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

fn drop_shadow(buf: &mut [u8], width: u32, height: u32, s: &DropShadow) -> KinegraphResult<()> {
    let Some(g) = s.geometry() else {
        return Ok(());
    };
    let (w, h) = (width as i32, height as i32);
    let color = [s.color.r, s.color.g, s.color.b, 255].map(u16::from);
    let op = u16::from(s.opacity);

    // Colored alpha, shifted by the offset.
    let mut shadow = vec![0u8; buf.len()];
    for y in 0..h {
        let sy = y - g.dy;
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - g.dx;
            if sx < 0 || sx >= w {
                continue;
            }
            let a = mul_div255_u8(u16::from(buf[((sy * w + sx) as usize) * 4 + 3]), op);
            if a == 0 {
                continue;
            }
            let idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                shadow[idx + c] = mul_div255_u8(color[c], u16::from(a));
            }
        }
    }
    blur_rgba8_premul(&mut shadow, width, height, g.sigma, BlurDirection::Both, false)?;

    composite::blend_in_place(&mut shadow, buf, 255, BlendMode::Normal)?;
    buf.copy_from_slice(&shadow);
    Ok(())
}

fn unpremultiply(px: &[u8]) -> [f32; 3] {
    let a = f32::from(px[3]);
    [0, 1, 2].map(|c| (f32::from(px[c]) / a).clamp(0.0, 1.0))
}

fn write_premul(px: &mut [u8], rgb: [f32; 3], alpha: u8) {
    let a = f32::from(alpha);
    for c in 0..3 {
        px[c] = (rgb[c].clamp(0.0, 1.0) * a).round() as u8;
    }
    px[3] = alpha;
}

fn unit(c: Rgb8) -> [f32; 3] {
    [c.r, c.g, c.b].map(|v| f32::from(v) / 255.0)
}

fn luminance(rgb: [f32; 3]) -> f32 {
    0.2125 * rgb[0] + 0.7154 * rgb[1] + 0.0721 * rgb[2]
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

fn fill(buf: &mut [u8], f: &FillEffect) {
    let color = unit(f.color);
    for px in buf.chunks_exact_mut(4) {
        let a = mul_div255_u8(u16::from(px[3]), u16::from(f.opacity));
        write_premul(px, color, a);
    }
}

fn tint(buf: &mut [u8], t: &Tint) {
    let (black, white) = (unit(t.black), unit(t.white));
    let amount = t.intensity.clamp(0.0, 1.0);
    for px in buf.chunks_exact_mut(4) {
        if px[3] == 0 {
            continue;
        }
        let orig = unpremultiply(px);
        let mapped = mix(black, white, luminance(orig));
        write_premul(px, mix(orig, mapped, amount), px[3]);
    }
}

fn tritone(buf: &mut [u8], t: &Tritone) {
    let (shadow, mid, high) = (unit(t.shadow), unit(t.midtone), unit(t.highlight));
    let keep = t.blend.clamp(0.0, 1.0);
    for px in buf.chunks_exact_mut(4) {
        if px[3] == 0 {
            continue;
        }
        let orig = unpremultiply(px);
        let l = luminance(orig);
        let mapped = if l < 0.5 {
            mix(shadow, mid, l * 2.0)
        } else {
            mix(mid, high, l * 2.0 - 1.0)
        };
        write_premul(px, mix(mapped, orig, keep), px[3]);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/filter.rs"]
mod tests;
