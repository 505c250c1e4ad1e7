use super::*;

use crate::render::recorder::{Call, Recorder, rect_shape, update};

#[test]
fn opacity_multiplies_down_the_tree() {
    let shape = rect_shape(0.0, 0.0, 4.0, 4.0);
    shape.lock().state_mut().opacity = 128;
    let mut r = Recorder::new(8, 8);
    update(&shape, &mut r, 128);
    shape.lock().render(&mut r);
    assert_eq!(
        r.draws(),
        vec![Call::Shape {
            opacity: 64,
            bounds: RenderRegion::new(0, 0, 4, 4)
        }]
    );
}

#[test]
fn masked_paint_renders_mask_then_content_in_one_scope() {
    let shape = rect_shape(0.0, 0.0, 4.0, 4.0);
    shape.lock().state_mut().mask = Some(PaintMask {
        target: rect_shape(2.0, 2.0, 8.0, 8.0),
        method: MaskMethod::Alpha,
    });
    let mut r = Recorder::new(16, 16);
    update(&shape, &mut r, 255);
    shape.lock().render(&mut r);

    let content = Call::Shape {
        opacity: 255,
        bounds: RenderRegion::new(0, 0, 4, 4),
    };
    let mask = Call::Shape {
        opacity: 255,
        bounds: RenderRegion::new(2, 2, 6, 6),
    };
    assert_eq!(
        r.draws(),
        vec![
            Call::Target(RenderRegion::new(0, 0, 4, 4), CompositionFlag::MASKING),
            Call::BeginMask,
            mask,
            Call::BeginComposite(MaskMethod::Alpha, 255),
            content,
            Call::EndComposite,
        ]
    );
}

#[test]
fn merging_masks_cover_the_union() {
    let shape = rect_shape(0.0, 0.0, 4.0, 4.0);
    shape.lock().state_mut().mask = Some(PaintMask {
        target: rect_shape(2.0, 2.0, 8.0, 8.0),
        method: MaskMethod::Subtract,
    });
    let mut r = Recorder::new(16, 16);
    update(&shape, &mut r, 255);
    shape.lock().render(&mut r);
    assert_eq!(
        r.draws()[0],
        Call::Target(RenderRegion::new(0, 0, 8, 8), CompositionFlag::MASKING)
    );
}

#[test]
fn clipper_wraps_the_draw() {
    let shape = rect_shape(0.0, 0.0, 4.0, 4.0);
    shape.lock().state_mut().clipper = Some(rect_shape(0.0, 0.0, 2.0, 2.0));
    let mut r = Recorder::new(16, 16);
    update(&shape, &mut r, 255);
    shape.lock().render(&mut r);
    let draws = r.draws();
    assert_eq!(draws.first(), Some(&Call::PushClip));
    assert_eq!(draws.last(), Some(&Call::PopClip));
}

#[test]
fn hidden_paints_draw_nothing() {
    let shape = rect_shape(0.0, 0.0, 4.0, 4.0);
    shape.lock().state_mut().hidden = true;
    let mut r = Recorder::new(16, 16);
    update(&shape, &mut r, 255);
    assert!(shape.lock().render(&mut r));
    assert!(r.calls.is_empty());
}

#[test]
fn handles_share_one_node() {
    let a = rect_shape(0.0, 0.0, 1.0, 1.0);
    let b = a.clone();
    assert!(a.ptr_eq(&b));
    assert_eq!(a.ref_count(), 2);
    drop(b);
    assert_eq!(a.ref_count(), 1);
}

#[test]
fn float_bounds_apply_the_own_transform() {
    let a = rect_shape(0.0, 0.0, 2.0, 2.0);
    a.lock().state_mut().transform = Affine::scale(3.0);
    assert_eq!(a.lock().bounds_f(), Some(Rect::new(0.0, 0.0, 6.0, 6.0)));
}
