//! Byte kernels over premultiplied RGBA8 buffers: blending, masking and mask merging.

use crate::foundation::core::BlendMode;
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::method::MaskMethod;

fn check_pair(dst: &[u8], src: &[u8], what: &str) -> KinegraphResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(KinegraphError::render(format!(
            "{what} expects equal-length rgba8 buffers"
        )));
    }
    Ok(())
}

/// Composite `src` onto `dst` with `mode`, scaling `src` by `opacity` first.
pub fn blend_in_place(dst: &mut [u8], src: &[u8], opacity: u8, mode: BlendMode) -> KinegraphResult<()> {
    check_pair(dst, src, "blend_in_place")?;
    if opacity == 0 {
        return Ok(());
    }

    // Mode dispatch happens once per call; each arm monomorphizes its own kernel.
    match mode {
        BlendMode::Normal => over_in_place(dst, src, opacity),
        BlendMode::Add => add_in_place(dst, src, opacity),
        BlendMode::Multiply => separable(dst, src, opacity, |s, d| s * d),
        BlendMode::Screen => separable(dst, src, opacity, |s, d| s + d - s * d),
        BlendMode::Overlay => separable(dst, src, opacity, |s, d| hard_light(d, s)),
        BlendMode::Darken => separable(dst, src, opacity, f32::min),
        BlendMode::Lighten => separable(dst, src, opacity, f32::max),
        BlendMode::ColorDodge => separable(dst, src, opacity, |s, d| {
            if d <= 0.0 {
                0.0
            } else if s >= 1.0 {
                1.0
            } else {
                (d / (1.0 - s)).min(1.0)
            }
        }),
        BlendMode::ColorBurn => separable(dst, src, opacity, |s, d| {
            if d >= 1.0 {
                1.0
            } else if s <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - d) / s).min(1.0)
            }
        }),
        BlendMode::HardLight => separable(dst, src, opacity, hard_light),
        BlendMode::SoftLight => separable(dst, src, opacity, |s, d| {
            if s <= 0.5 {
                d - (1.0 - 2.0 * s) * d * (1.0 - d)
            } else {
                let g = if d <= 0.25 {
                    ((16.0 * d - 12.0) * d + 4.0) * d
                } else {
                    d.sqrt()
                };
                d + (2.0 * s - 1.0) * (g - d)
            }
        }),
        BlendMode::Difference => separable(dst, src, opacity, |s, d| (d - s).abs()),
        BlendMode::Exclusion => separable(dst, src, opacity, |s, d| d + s - 2.0 * d * s),
        BlendMode::Hue => blend_kernel(dst, src, opacity, |s, d| {
            set_lum(set_sat(s, sat(d)), lum(d))
        }),
        BlendMode::Saturation => blend_kernel(dst, src, opacity, |s, d| {
            set_lum(set_sat(d, sat(s)), lum(d))
        }),
        BlendMode::Color => blend_kernel(dst, src, opacity, |s, d| set_lum(s, lum(d))),
        BlendMode::Luminosity => blend_kernel(dst, src, opacity, |s, d| set_lum(d, lum(s))),
    }
    Ok(())
}

fn hard_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        2.0 * s * d
    } else {
        1.0 - 2.0 * (1.0 - s) * (1.0 - d)
    }
}

fn over_in_place(dst: &mut [u8], src: &[u8], opacity: u8) {
    let op = u16::from(opacity);
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = mul_div255_u8(u16::from(s[3]), op);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - u16::from(sa);
        d[3] = sa.saturating_add(mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            let sc = mul_div255_u8(u16::from(s[c]), op);
            let dc = mul_div255_u8(u16::from(d[c]), inv);
            d[c] = sc.saturating_add(dc);
        }
    }
}

fn add_in_place(dst: &mut [u8], src: &[u8], opacity: u8) {
    let op = u16::from(opacity);
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        for c in 0..4 {
            d[c] = d[c].saturating_add(mul_div255_u8(u16::from(s[c]), op));
        }
    }
}

#[inline(always)]
fn separable<F>(dst: &mut [u8], src: &[u8], opacity: u8, f: F)
where
    F: Fn(f32, f32) -> f32,
{
    blend_kernel(dst, src, opacity, |s, d| [f(s[0], d[0]), f(s[1], d[1]), f(s[2], d[2])]);
}

#[inline(always)]
fn blend_kernel<F>(dst: &mut [u8], src: &[u8], opacity: u8, blend_fn: F)
where
    F: Fn([f32; 3], [f32; 3]) -> [f32; 3],
{
    let opacity = f32::from(opacity) / 255.0;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        // Source-over with the blend applied to unpremultiplied channels:
        // out_a = sa + da * (1 - sa)
        // out_p = sp * (1 - da) + dp * (1 - sa) + B(sc, dc) * sa * da
        let sa = f32::from(s[3]) / 255.0 * opacity;
        let da = f32::from(d[3]) / 255.0;
        let mut sp = [0.0f32; 3];
        let mut dp = [0.0f32; 3];
        let mut sc = [0.0f32; 3];
        let mut dc = [0.0f32; 3];
        for c in 0..3 {
            sp[c] = f32::from(s[c]) / 255.0 * opacity;
            dp[c] = f32::from(d[c]) / 255.0;
            sc[c] = if sa > 0.0 { (sp[c] / sa).clamp(0.0, 1.0) } else { 0.0 };
            dc[c] = if da > 0.0 { (dp[c] / da).clamp(0.0, 1.0) } else { 0.0 };
        }

        let b = blend_fn(sc, dc);
        for c in 0..3 {
            let out = sp[c] * (1.0 - da) + dp[c] * (1.0 - sa) + b[c].clamp(0.0, 1.0) * sa * da;
            d[c] = unit_to_byte(out);
        }
        d[3] = unit_to_byte(sa + da * (1.0 - sa));
    }
}

fn unit_to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 && l - n > 0.0 {
        for v in &mut out {
            *v = l + (*v - l) * l / (l - n);
        }
    }
    if x > 1.0 && x - l > 0.0 {
        for v in &mut out {
            *v = l + (*v - l) * (1.0 - l) / (x - l);
        }
    }
    out
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    if max - min <= 0.0 {
        return [0.0; 3];
    }
    c.map(|v| (v - min) * s / (max - min))
}

/// Scale `content` by coverage taken from `mask`, itself scaled by `opacity`.
pub fn mask_in_place(
    content: &mut [u8],
    mask: &[u8],
    method: MaskMethod,
    opacity: u8,
) -> KinegraphResult<()> {
    check_pair(content, mask, "mask_in_place")?;
    let op = u16::from(opacity);
    let coverage: fn(&[u8]) -> u8 = match method {
        MaskMethod::Alpha => |m| m[3],
        MaskMethod::InvAlpha => |m| 255 - m[3],
        MaskMethod::Luma => luma,
        MaskMethod::InvLuma => |m| 255 - luma(m),
        other => {
            return Err(KinegraphError::invalid_arguments(format!(
                "{other:?} is not a coverage method"
            )));
        }
    };
    for (c, m) in content.chunks_exact_mut(4).zip(mask.chunks_exact(4)) {
        let w = u16::from(mul_div255_u8(u16::from(coverage(m)), op));
        if w == 255 {
            continue;
        }
        for v in c.iter_mut() {
            *v = mul_div255_u8(u16::from(*v), w);
        }
    }
    Ok(())
}

fn luma(m: &[u8]) -> u8 {
    ((u32::from(m[0]) * 54 + u32::from(m[1]) * 183 + u32::from(m[2]) * 19 + 128) >> 8) as u8
}

/// Combine `content` with the accumulated `mask`, writing the result into `content`.
pub fn merge_in_place(content: &mut [u8], mask: &[u8], method: MaskMethod) -> KinegraphResult<()> {
    check_pair(content, mask, "merge_in_place")?;
    let m255 = |a: u8, b: u8| mul_div255_u8(u16::from(a), u16::from(b));
    for (s, m) in content.chunks_exact_mut(4).zip(mask.chunks_exact(4)) {
        let (sa, ma) = (s[3], m[3]);
        for c in 0..4 {
            s[c] = match method {
                MaskMethod::Add => s[c].saturating_add(m255(m[c], 255 - sa)),
                MaskMethod::Subtract => m255(m[c], 255 - sa),
                MaskMethod::Intersect => m255(m[c], sa),
                MaskMethod::Difference => m255(s[c], 255 - ma).saturating_add(m255(m[c], 255 - sa)),
                MaskMethod::Lighten => s[c].max(m[c]),
                MaskMethod::Darken => s[c].min(m[c]),
                other => {
                    return Err(KinegraphError::invalid_arguments(format!(
                        "{other:?} is not a merging method"
                    )));
                }
            };
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
