use super::*;

use crate::model::object::{Object, RectShape, SolidFill};

fn shape_layer() -> Layer {
    Layer {
        kind: LayerKind::Shape,
        group: Group::new(vec![
            Object::Rect(RectShape::default()),
            Object::SolidFill(SolidFill::default()),
        ]),
        ..Layer::default()
    }
}

#[test]
fn hidden_layer_degenerates_to_null() {
    let mut l = shape_layer();
    l.hidden = true;
    l.prepare();
    assert_eq!(l.kind, LayerKind::Null);
    assert!(l.group.children.is_empty());
    assert!(!l.group.visible());
}

#[test]
fn visible_layer_prepares_its_group() {
    let mut l = shape_layer();
    l.prepare();
    assert_eq!(l.kind, LayerKind::Shape);
    assert_eq!(l.group.kind(), ObjectKind::Layer);
    assert!(l.group.visible());
    assert!(l.statics().clipper.is_none());
}

#[test]
fn precomp_gets_a_viewport_clipper() {
    let mut l = Layer {
        kind: LayerKind::Precomp,
        width: 30.0,
        height: 20.0,
        ..Layer::default()
    };
    l.prepare();
    let bb = l.statics().clipper.as_ref().unwrap().bounding_box();
    assert_eq!(bb, Rect::new(0.0, 0.0, 30.0, 20.0));
}

#[test]
fn solid_gets_a_prebuilt_fill_only_with_a_color() {
    let mut l = Layer {
        kind: LayerKind::Solid,
        width: 8.0,
        height: 8.0,
        ..Layer::default()
    };
    l.prepare();
    assert!(l.statics().solid.is_none());

    let mut l = Layer {
        kind: LayerKind::Solid,
        width: 8.0,
        height: 8.0,
        solid_color: Some(Rgb8::new(1, 2, 3)),
        ..Layer::default()
    };
    l.prepare();
    let (_, color) = l.statics().solid.as_ref().unwrap();
    assert_eq!(*color, Rgb8::new(1, 2, 3));
}

#[test]
fn remap_subtracts_start_and_divides_by_stretch() {
    let l = Layer {
        start_frame: 10.0,
        time_stretch: 2.0,
        ..Layer::default()
    };
    assert_eq!(l.remap(30.0, 30.0), 10.0);
}

#[test]
fn remap_uses_time_remap_seconds() {
    let l = Layer {
        start_frame: 100.0,
        time_remap: Some(Property::constant(0.5)),
        ..Layer::default()
    };
    assert_eq!(l.remap(7.0, 30.0), 15.0);

    let l = Layer {
        time_remap: Some(Property::constant(-1.0)),
        ..Layer::default()
    };
    assert_eq!(l.remap(7.0, 30.0), 0.0);
}

#[test]
fn activity_window_is_half_open() {
    let l = Layer {
        in_frame: 5.0,
        out_frame: 10.0,
        ..Layer::default()
    };
    assert!(!l.is_active(4.9));
    assert!(l.is_active(5.0));
    assert!(!l.is_active(10.0));
}

#[test]
fn codes_decode() {
    assert_eq!(LayerKind::from_code(4), Some(LayerKind::Shape));
    assert_eq!(LayerKind::from_code(9), None);
    assert_eq!(MatteMode::from_code(3), Some(MatteMode::Luma));
    assert_eq!(MatteMode::from_code(0), None);
    assert_eq!(MaskMode::from_code("s"), MaskMode::Subtract);
    assert_eq!(MaskMode::from_code("?"), MaskMode::Add);
}
