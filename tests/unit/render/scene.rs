use super::*;

use crate::foundation::core::Rgb8;
use crate::render::effect::{BlurDirection, FillEffect, GaussianBlur};
use crate::render::paint::PaintMask;
use crate::render::recorder::{Call, Recorder, rect_shape, update};

fn scene_of(children: Vec<PaintRef>) -> Scene {
    let mut s = Scene::new();
    for c in children {
        s.push(c);
    }
    s
}

fn fill_effect() -> SceneEffect {
    SceneEffect::Fill(FillEffect {
        color: Rgb8::WHITE,
        opacity: 255,
    })
}

#[test]
fn partial_opacity_composites_multi_child_scenes() {
    let s = scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0), rect_shape(2.0, 2.0, 6.0, 6.0)]);
    for o in 1..=254u8 {
        assert!(s.need_composition(o).contains(CompositionFlag::OPACITY), "opacity {o}");
    }
    assert!(s.need_composition(255).is_empty());
    assert!(s.need_composition(0).is_empty());
}

#[test]
fn single_shape_child_takes_the_direct_path() {
    let s = scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0)]);
    for o in 0..=255u8 {
        assert!(s.need_composition(o).is_empty(), "opacity {o}");
    }
}

#[test]
fn single_non_shape_child_still_composites() {
    let inner = PaintRef::new(scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0)]));
    let s = scene_of(vec![inner]);
    assert_eq!(s.need_composition(128), CompositionFlag::OPACITY);
}

#[test]
fn empty_scene_never_composites() {
    let mut s = Scene::new();
    s.state_mut().blend = BlendMode::Multiply;
    s.push_effect(fill_effect());
    assert!(s.need_composition(128).is_empty());
}

#[test]
fn blend_mask_and_effects_raise_their_flags() {
    let mut s = scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0)]);
    s.state_mut().blend = BlendMode::Screen;
    s.push_effect(fill_effect());
    s.state_mut().mask = Some(PaintMask {
        target: rect_shape(0.0, 0.0, 2.0, 2.0),
        method: MaskMethod::Alpha,
    });
    let f = s.need_composition(255);
    assert!(f.contains(CompositionFlag::BLENDING));
    assert!(f.contains(CompositionFlag::POST_PROCESSING));
    assert!(f.contains(CompositionFlag::MASKING));
    assert!(!f.contains(CompositionFlag::OPACITY));
}

#[test]
fn clear_all_resets_the_effect_list() {
    let mut s = Scene::new();
    s.push_effect(fill_effect());
    s.push_effect(fill_effect());
    assert_eq!(s.effects().len(), 2);
    s.push_effect(SceneEffect::ClearAll);
    assert!(s.effects().is_empty());
}

#[test]
fn insert_and_remove_require_a_child_anchor() {
    let a = rect_shape(0.0, 0.0, 1.0, 1.0);
    let b = rect_shape(0.0, 0.0, 1.0, 1.0);
    let stranger = rect_shape(0.0, 0.0, 1.0, 1.0);
    let mut s = scene_of(vec![a.clone()]);
    assert_eq!(a.ref_count(), 2);

    assert!(matches!(
        s.insert(b.clone(), &stranger),
        Err(KinegraphError::InvalidArguments(_))
    ));
    s.insert(b.clone(), &a).unwrap();
    assert!(s.paints()[0].ptr_eq(&b));
    assert!(s.paints()[1].ptr_eq(&a));

    assert!(matches!(
        s.remove(&stranger),
        Err(KinegraphError::InvalidArguments(_))
    ));
    s.remove(&a).unwrap();
    assert_eq!(a.ref_count(), 1);
    s.clear();
    assert_eq!(b.ref_count(), 1);
}

#[test]
fn composited_scene_stores_opacity_and_draws_children_opaque() {
    let scene = PaintRef::new(scene_of(vec![
        rect_shape(0.0, 0.0, 4.0, 4.0),
        rect_shape(2.0, 2.0, 6.0, 6.0),
    ]));
    let mut r = Recorder::new(16, 16);
    update(&scene, &mut r, 128);
    scene.lock().render(&mut r);

    assert_eq!(
        r.draws(),
        vec![
            Call::Target(RenderRegion::new(0, 0, 6, 6), CompositionFlag::OPACITY),
            Call::BeginComposite(MaskMethod::None, 128),
            Call::Shape {
                opacity: 255,
                bounds: RenderRegion::new(0, 0, 4, 4)
            },
            Call::Shape {
                opacity: 255,
                bounds: RenderRegion::new(2, 2, 4, 4)
            },
            Call::EndComposite,
        ]
    );
}

#[test]
fn direct_path_passes_opacity_through() {
    let scene = PaintRef::new(scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0)]));
    let mut r = Recorder::new(16, 16);
    update(&scene, &mut r, 100);
    scene.lock().render(&mut r);
    assert_eq!(
        r.draws(),
        vec![Call::Shape {
            opacity: 100,
            bounds: RenderRegion::new(0, 0, 4, 4)
        }]
    );
}

#[test]
fn bounds_merge_children_grow_by_effects_and_clip_to_viewport() {
    let mut s = scene_of(vec![rect_shape(2.0, 2.0, 6.0, 6.0), rect_shape(10.0, 4.0, 12.0, 20.0)]);
    s.push_effect(SceneEffect::GaussianBlur(GaussianBlur::new(1.0, BlurDirection::Both, false)));
    let scene = PaintRef::new(s);

    // children cover (2,2)-(12,20); the blur adds 3px on each side
    let mut r = Recorder::new(14, 14);
    update(&scene, &mut r, 255);
    assert_eq!(scene.lock().bounds(&r), RenderRegion::new(0, 0, 14, 14));

    let mut r = Recorder::new(64, 64);
    update(&scene, &mut r, 255);
    assert_eq!(scene.lock().bounds(&r), RenderRegion::new(0, 0, 15, 23));
}

#[test]
fn empty_scene_has_zero_bounds() {
    let scene = PaintRef::new(Scene::new());
    let mut r = Recorder::new(8, 8);
    update(&scene, &mut r, 255);
    assert_eq!(scene.lock().bounds(&r), RenderRegion::ZERO);
}

#[test]
fn lone_post_processing_effect_renders_direct() {
    let mut s = scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0)]);
    s.push_effect(fill_effect());
    let scene = PaintRef::new(s);
    let mut r = Recorder::new(16, 16);
    update(&scene, &mut r, 255);
    scene.lock().render(&mut r);
    assert!(r.calls.contains(&Call::Effect { direct: true }));

    let mut s = scene_of(vec![rect_shape(0.0, 0.0, 4.0, 4.0), rect_shape(0.0, 0.0, 2.0, 2.0)]);
    s.push_effect(fill_effect());
    let scene = PaintRef::new(s);
    let mut r = Recorder::new(16, 16);
    update(&scene, &mut r, 128);
    scene.lock().render(&mut r);
    assert!(r.calls.contains(&Call::Effect { direct: false }));
}

#[test]
fn float_bounds_union_child_transforms() {
    let a = rect_shape(0.0, 0.0, 2.0, 2.0);
    a.lock().state_mut().transform = Affine::translate((10.0, 0.0));
    let s = scene_of(vec![a, rect_shape(0.0, 0.0, 1.0, 4.0)]);
    assert_eq!(s.bounds_f(), Some(Rect::new(0.0, 0.0, 12.0, 4.0)));
    assert_eq!(Scene::new().bounds_f(), None);
}

#[test]
fn refused_composite_target_skips_children() {
    let scene = PaintRef::new(scene_of(vec![
        rect_shape(0.0, 0.0, 4.0, 4.0),
        rect_shape(2.0, 2.0, 6.0, 6.0),
    ]));
    let mut r = Recorder::new(16, 16);
    r.no_targets = true;
    update(&scene, &mut r, 128);
    assert!(scene.lock().render(&mut r));
    assert_eq!(
        r.draws(),
        vec![Call::Target(RenderRegion::new(0, 0, 6, 6), CompositionFlag::OPACITY)]
    );
}
