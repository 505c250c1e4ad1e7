use super::*;

#[test]
fn region_intersect_clamps_disjoint_to_zero_extent() {
    let a = RenderRegion::new(0, 0, 10, 10);
    let b = RenderRegion::new(20, 20, 5, 5);
    let i = a.intersect(b);
    assert!(i.is_empty());
    assert_eq!(i.w, 0);
    assert_eq!(i.h, 0);

    let c = RenderRegion::new(5, -5, 10, 10);
    assert_eq!(a.intersect(c), RenderRegion::new(5, 0, 5, 5));
}

#[test]
fn region_union_ignores_empty_operands() {
    let a = RenderRegion::new(2, 3, 4, 5);
    assert_eq!(a.union(RenderRegion::ZERO), a);
    assert_eq!(RenderRegion::ZERO.union(a), a);
    let b = RenderRegion::new(-1, 0, 2, 2);
    assert_eq!(a.union(b), RenderRegion::new(-1, 0, 7, 8));
}

#[test]
fn region_from_rect_rounds_outward() {
    let r = RenderRegion::from_rect(Rect::new(0.5, 1.2, 9.1, 9.9));
    assert_eq!(r, RenderRegion::new(0, 1, 10, 9));
    assert_eq!(
        RenderRegion::from_rect(Rect::new(f64::NAN, 0.0, 1.0, 1.0)),
        RenderRegion::ZERO
    );
}

#[test]
fn argb_roundtrip_and_premul() {
    let c = Rgba8::from_argb(0x80FF_4020);
    assert_eq!(c, Rgba8::new(0xFF, 0x40, 0x20, 0x80));
    assert_eq!(c.rgb().to_argb(0x80), 0x80FF_4020);
    assert_eq!(c.premultiplied(), [128, 32, 16, 128]);
}

#[test]
fn color_space_pack_orders_channels() {
    let px = [10u8, 20, 30, 255];
    assert_eq!(ColorSpace::Abgr8888.pack(px), 0xFF1E_140A);
    assert_eq!(ColorSpace::Argb8888.pack(px), 0xFF0A_141E);
    assert_eq!(ColorSpace::Argb8888.unpack(0xFF0A_141E), px);
    assert_eq!(ColorSpace::Abgr8888.unpack(0xFF1E_140A), px);
}

#[test]
fn straight_color_spaces_unpremultiply() {
    let premul = Rgba8::new(200, 100, 0, 128).premultiplied();
    let word = ColorSpace::Argb8888S.pack(premul);
    assert_eq!(word >> 24, 128);
    let r = (word >> 16) & 0xff;
    assert!((199..=201).contains(&r));
    assert_eq!(ColorSpace::Argb8888S.pack([0, 0, 0, 0]), 0);
}
