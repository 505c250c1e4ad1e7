use super::*;

const OPAQUE_RED: [u8; 4] = [255, 0, 0, 255];
const OPAQUE_WHITE: [u8; 4] = [255, 255, 255, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

fn blend_px(dst: [u8; 4], src: [u8; 4], opacity: u8, mode: BlendMode) -> [u8; 4] {
    let mut d = dst;
    blend_in_place(&mut d, &src, opacity, mode).unwrap();
    d
}

#[test]
fn normal_over_replaces_with_opaque_source() {
    assert_eq!(blend_px([0, 0, 0, 255], OPAQUE_RED, 255, BlendMode::Normal), OPAQUE_RED);
}

#[test]
fn normal_over_scales_source_by_opacity() {
    assert_eq!(
        blend_px(CLEAR, [200, 100, 0, 255], 128, BlendMode::Normal),
        [100, 50, 0, 128]
    );
}

#[test]
fn zero_opacity_is_a_noop_for_every_mode() {
    let dst = [10, 20, 30, 40];
    for mode in [BlendMode::Normal, BlendMode::Multiply, BlendMode::Add, BlendMode::Hue] {
        assert_eq!(blend_px(dst, OPAQUE_WHITE, 0, mode), dst, "{mode:?}");
    }
}

#[test]
fn multiply_uses_both_colors_where_they_overlap() {
    assert_eq!(blend_px(OPAQUE_WHITE, OPAQUE_RED, 255, BlendMode::Multiply), OPAQUE_RED);
    assert_eq!(blend_px(CLEAR, OPAQUE_RED, 255, BlendMode::Multiply), OPAQUE_RED);
}

#[test]
fn screen_over_black_keeps_the_source() {
    assert_eq!(
        blend_px([0, 0, 0, 255], [128, 128, 128, 255], 255, BlendMode::Screen),
        [128, 128, 128, 255]
    );
}

#[test]
fn add_saturates() {
    assert_eq!(
        blend_px([200, 0, 0, 200], [100, 0, 0, 100], 255, BlendMode::Add),
        [255, 0, 0, 255]
    );
}

#[test]
fn luminosity_of_white_turns_opaque_colors_white() {
    assert_eq!(
        blend_px(OPAQUE_RED, OPAQUE_WHITE, 255, BlendMode::Luminosity),
        OPAQUE_WHITE
    );
}

#[test]
fn difference_of_equal_colors_is_black() {
    assert_eq!(
        blend_px(OPAQUE_WHITE, OPAQUE_WHITE, 255, BlendMode::Difference),
        [0, 0, 0, 255]
    );
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mut d = [0u8; 8];
    assert!(matches!(
        blend_in_place(&mut d, &[0u8; 4], 255, BlendMode::Normal),
        Err(KinegraphError::Render(_))
    ));
}

#[test]
fn alpha_mask_scales_every_channel() {
    let mut c = [200, 100, 50, 200];
    mask_in_place(&mut c, &[0, 0, 0, 128], MaskMethod::Alpha, 255).unwrap();
    assert_eq!(c, [100, 50, 25, 100]);

    let mut c = [200, 100, 50, 200];
    mask_in_place(&mut c, &OPAQUE_WHITE, MaskMethod::InvAlpha, 255).unwrap();
    assert_eq!(c, CLEAR);
}

#[test]
fn luma_masks_read_brightness() {
    let mut c = OPAQUE_RED;
    mask_in_place(&mut c, &OPAQUE_WHITE, MaskMethod::Luma, 255).unwrap();
    assert_eq!(c, OPAQUE_RED);

    let mut c = OPAQUE_RED;
    mask_in_place(&mut c, &OPAQUE_WHITE, MaskMethod::InvLuma, 255).unwrap();
    assert_eq!(c, CLEAR);
}

#[test]
fn mask_opacity_scales_coverage() {
    let mut c = OPAQUE_RED;
    mask_in_place(&mut c, &OPAQUE_WHITE, MaskMethod::Alpha, 0).unwrap();
    assert_eq!(c, CLEAR);
}

#[test]
fn merging_methods_are_not_coverage_methods() {
    let mut c = OPAQUE_RED;
    assert!(mask_in_place(&mut c, &OPAQUE_WHITE, MaskMethod::Add, 255).is_err());
    assert!(merge_in_place(&mut c, &OPAQUE_WHITE, MaskMethod::Alpha).is_err());
}

#[test]
fn merges_combine_coverage() {
    let merge = |s: [u8; 4], m: [u8; 4], method| {
        let mut out = s;
        merge_in_place(&mut out, &m, method).unwrap();
        out
    };
    assert_eq!(merge(CLEAR, OPAQUE_WHITE, MaskMethod::Add), OPAQUE_WHITE);
    assert_eq!(merge(OPAQUE_WHITE, OPAQUE_WHITE, MaskMethod::Subtract), CLEAR);
    assert_eq!(merge(CLEAR, OPAQUE_WHITE, MaskMethod::Subtract), OPAQUE_WHITE);
    assert_eq!(merge(OPAQUE_WHITE, OPAQUE_WHITE, MaskMethod::Intersect), OPAQUE_WHITE);
    assert_eq!(merge(CLEAR, OPAQUE_WHITE, MaskMethod::Intersect), CLEAR);
    assert_eq!(merge(OPAQUE_WHITE, OPAQUE_WHITE, MaskMethod::Difference), CLEAR);
    assert_eq!(merge(CLEAR, OPAQUE_WHITE, MaskMethod::Difference), OPAQUE_WHITE);
    assert_eq!(merge([10, 200, 0, 200], [100, 20, 0, 150], MaskMethod::Lighten), [100, 200, 0, 200]);
    assert_eq!(merge([10, 200, 0, 200], [100, 20, 0, 150], MaskMethod::Darken), [10, 20, 0, 150]);
}
