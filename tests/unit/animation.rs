use super::*;

use serde_json::json;

use crate::engine::EngineOpts;
use crate::foundation::core::Rgb8;
use crate::model::property::Property;

const RED: u32 = 0xFF00_00FF;
const GREEN: u32 = 0xFF00_FF00;
const BLUE: u32 = 0xFFFF_0000;

/// 20x10 composition: one rectangle covering the canvas, filled red through slot `accent`.
fn doc() -> Vec<u8> {
    json!({
        "v": "5.7.0", "fr": 30, "ip": 0, "op": 30, "w": 20, "h": 10,
        "markers": [{"cm": "intro", "tm": 10, "dr": 5}],
        "layers": [{
            "ty": 4, "ind": 1, "ip": 0, "op": 30, "st": 0, "ks": {},
            "shapes": [
                {"ty": "rc", "p": {"a": 0, "k": [10, 5]}, "s": {"a": 0, "k": [20, 10]}, "r": {"a": 0, "k": 0}},
                {"ty": "fl", "nm": "[|brand|]", "c": {"a": 0, "k": [1, 0, 0], "sid": "accent"}, "o": {"a": 0, "k": 100}, "r": 1}
            ]
        }]
    })
    .to_string()
    .into_bytes()
}

fn loaded() -> Animation {
    let engine = Engine::new(EngineOpts { threads: Some(0) }).unwrap();
    let mut anim = Animation::new(&engine);
    anim.load(&doc(), LoadOptions::default()).unwrap();
    anim
}

fn frame(anim: &mut Animation, w: u32, h: u32) -> Vec<u32> {
    let mut buf = vec![0u32; (w * h) as usize];
    anim.render_buffer(0.0, &mut buf, w as usize, w, h).unwrap();
    buf
}

#[test]
fn load_reports_the_document_summary() {
    let engine = Engine::new(EngineOpts { threads: Some(0) }).unwrap();
    let mut anim = Animation::new(&engine);
    let info = anim.load(&doc(), LoadOptions::default()).unwrap();
    assert_eq!(
        info,
        LoadedInfo {
            total_frames: 30.0,
            duration_ms: 1000,
            width: 20,
            height: 10,
        }
    );
    assert_eq!(anim.info(), Some(info));
    assert_eq!(anim.markers().len(), 1);
}

#[test]
fn failed_load_keeps_the_previous_composition() {
    let mut anim = loaded();
    assert!(matches!(anim.load(b"{", LoadOptions::default()), Err(KinegraphError::Load(_))));
    assert_eq!(anim.info().map(|i| i.width), Some(20));
}

#[test]
fn nothing_renders_before_load() {
    let engine = Engine::new(EngineOpts { threads: Some(0) }).unwrap();
    let mut anim = Animation::new(&engine);
    let mut buf = vec![0u32; 4];
    let err = anim.render_buffer(0.0, &mut buf, 2, 2, 2).unwrap_err();
    assert!(matches!(err, KinegraphError::InsufficientCondition(_)));
}

#[test]
fn renders_into_the_target() {
    let mut anim = loaded();
    let buf = frame(&mut anim, 20, 10);
    assert!(buf.iter().all(|&w| w == RED));
}

#[test]
fn composition_is_fit_and_centered() {
    let mut anim = loaded();
    let buf = frame(&mut anim, 20, 20);
    let at = |x: usize, y: usize| buf[y * 20 + x];
    assert_eq!(at(0, 2), 0);
    assert_eq!(at(10, 10), RED);
    assert_eq!(at(19, 17), 0);

    // A fixed viewport wins over the target size.
    anim.set_size(10, 10).unwrap();
    let buf = frame(&mut anim, 20, 20);
    assert_eq!(buf[5 * 20 + 5], RED);
    assert_eq!(buf[15 * 20 + 5], 0);
    assert!(anim.set_size(0, 4).is_err());
}

#[test]
fn typed_slots_override_and_reset() {
    let mut anim = loaded();
    let blue = PropertyValue::Color(Property::constant(Rgb8::new(0, 0, 255)));
    anim.set_slot("accent", blue).unwrap();
    assert_eq!(frame(&mut anim, 20, 10)[0], BLUE);

    anim.reset_slot("accent").unwrap();
    assert_eq!(frame(&mut anim, 20, 10)[0], RED);

    let wrong = PropertyValue::Rotation(Property::constant(45.0));
    assert!(matches!(anim.set_slot("accent", wrong), Err(KinegraphError::InvalidArguments(_))));
    let any = PropertyValue::Opacity(Property::constant(50.0));
    assert!(matches!(anim.set_slot("nope", any), Err(KinegraphError::InvalidArguments(_))));
    assert!(anim.reset_slot("nope").is_err());
}

#[test]
fn json_slots_apply_and_reset_all() {
    let mut anim = loaded();
    let n = anim
        .apply_slot(r#"{"accent": {"p": {"a": 0, "k": [0, 1, 0]}}, "ghost": {"p": {"k": 1}}}"#)
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(frame(&mut anim, 20, 10)[0], GREEN);

    anim.reset_slots().unwrap();
    assert_eq!(frame(&mut anim, 20, 10)[0], RED);
    assert!(matches!(anim.apply_slot("not json"), Err(KinegraphError::Serde(_))));
}

#[test]
fn registry_colors_replace_tagged_fills() {
    let registry = ColorRegistry::new();
    let mut anim = loaded().with_registry(registry.clone());
    registry.register("brand", 0xFF00_FF00);
    assert_eq!(frame(&mut anim, 20, 10)[0], GREEN);
    registry.unregister("brand");
    assert_eq!(frame(&mut anim, 20, 10)[0], RED);
}

#[test]
fn markers_select_a_segment() {
    let mut anim = loaded();
    anim.segment("intro").unwrap();
    assert_eq!(anim.total_frames(), 5.0);
    assert!((anim.duration() - 5.0 / 30.0).abs() < 1e-6);
    assert!(matches!(anim.segment("outro"), Err(KinegraphError::InvalidArguments(_))));
    anim.clear_segment();
    assert_eq!(anim.total_frames(), 30.0);
}

#[test]
fn one_shot_and_incremental_agree() {
    let mut live = loaded();
    let first = frame(&mut live, 20, 10);
    let again = frame(&mut live, 20, 10);
    assert_eq!(first, again);

    let mut once = loaded();
    once.set_render_opts(RenderOpts {
        one_shot: true,
        ..RenderOpts::default()
    });
    assert_eq!(frame(&mut once, 20, 10), first);
}

#[test]
fn background_and_color_space_come_from_the_options() {
    let mut anim = loaded();
    anim.set_size(20, 20).unwrap();
    anim.set_render_opts(RenderOpts {
        color_space: ColorSpace::Argb8888,
        background: Some(Rgba8::new(0, 0, 255, 255)),
        ..RenderOpts::default()
    });
    let buf = frame(&mut anim, 20, 20);
    assert_eq!(buf[0], 0xFF00_00FF);
    assert_eq!(buf[10 * 20 + 10], 0xFFFF_0000);
}

#[test]
fn failed_render_leaves_the_target_alone() {
    let mut anim = loaded();
    let mut buf = vec![7u32; 200];
    assert!(anim.render_buffer(f32::NAN, &mut buf, 20, 20, 10).is_err());
    assert!(buf.iter().all(|&w| w == 7));
}

#[test]
fn clones_keep_their_own_overrides() {
    let mut a = loaded();
    let mut b = a.clone();
    b.set_slot("accent", PropertyValue::Color(Property::constant(Rgb8::new(0, 255, 0))))
        .unwrap();
    assert_eq!(frame(&mut a, 20, 10)[0], RED);
    assert_eq!(frame(&mut b, 20, 10)[0], GREEN);
}

#[test]
fn aspect_fit_scales_by_the_tighter_side() {
    let m = aspect_fit((100.0, 50.0), (50.0, 50.0));
    assert_eq!(m * kurbo::Point::new(0.0, 0.0), kurbo::Point::new(0.0, 12.5));
    assert_eq!(m * kurbo::Point::new(100.0, 50.0), kurbo::Point::new(50.0, 37.5));
    assert_eq!(aspect_fit((0.0, 10.0), (5.0, 5.0)), Affine::IDENTITY);
}
