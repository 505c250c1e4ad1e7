use super::*;

use kurbo::Shape as _;

fn trim(start: f32, end: f32, offset: f32) -> Trimpath {
    Trimpath {
        start: Property::constant(start),
        end: Property::constant(end),
        offset: Property::constant(offset),
        mode: TrimMode::Simultaneous,
    }
}

#[test]
fn trim_segment_empty_and_full() {
    assert_eq!(trim(30.0, 30.0, 90.0).segment(0.0), (0.0, 0.0));
    assert_eq!(trim(0.0, 100.0, 0.0).segment(0.0), (0.0, 1.0));
    assert_eq!(trim(0.0, 100.0, 360.0).segment(0.0), (0.0, 1.0));
}

#[test]
fn trim_segment_swaps_and_offsets() {
    let (s, e) = trim(75.0, 25.0, 90.0).segment(0.0);
    assert!((s - 0.5).abs() < 1e-6);
    assert!((e - 1.0).abs() < 1e-6);
}

#[test]
fn trim_segment_clamps_out_of_range() {
    assert_eq!(trim(-20.0, 150.0, 0.0).segment(0.0), (0.0, 1.0));
}

#[test]
fn mergeability_by_kind() {
    assert!(Object::Rect(RectShape::default()).mergeable());
    assert!(Object::Path(PathShape::default()).mergeable());
    assert!(!Object::SolidFill(SolidFill::default()).mergeable());
    assert!(Object::Trimpath(Trimpath::default()).mergeable());
    assert!(!Object::Trimpath(trim(10.0, 100.0, 0.0)).mergeable());

    let mut t = Transform::default();
    assert!(Object::Transform(t.clone()).mergeable());
    t.opacity = Property::constant(50.0);
    assert!(!Object::Transform(t).mergeable());
}

#[test]
fn transform_applies_anchor_scale_rotation_position() {
    let t = Transform {
        anchor: Property::constant(Vec2::new(10.0, 10.0)),
        position: Position::Combined(Property::constant(Vec2::new(100.0, 50.0))),
        scale: Property::constant(Vec2::new(200.0, 200.0)),
        rotation: Property::constant(90.0),
        ..Transform::default()
    };
    let p = t.matrix(0.0) * Point::new(11.0, 10.0);
    assert!((p.x - 100.0).abs() < 1e-9, "{p:?}");
    assert!((p.y - 52.0).abs() < 1e-9, "{p:?}");
}

#[test]
fn split_position_reads_both_axes() {
    let pos = Position::Split {
        x: Property::constant(3.0),
        y: Property::constant(4.0),
    };
    assert_eq!(pos.at(0.0), Vec2::new(3.0, 4.0));
}

#[test]
fn opacity_percent_maps_to_u8() {
    assert_eq!(percent_to_u8(100.0), 255);
    assert_eq!(percent_to_u8(0.0), 0);
    assert_eq!(percent_to_u8(50.0), 128);
    assert_eq!(percent_to_u8(150.0), 255);
}

#[test]
fn rect_path_covers_its_box() {
    let r = RectShape {
        position: Property::constant(Vec2::new(20.0, 10.0)),
        size: Property::constant(Vec2::new(40.0, 20.0)),
        roundness: Property::constant(0.0),
        clockwise: true,
    };
    let bb = r.path(0.0).bounding_box();
    assert_eq!((bb.x0, bb.y0, bb.x1, bb.y1), (0.0, 0.0, 40.0, 20.0));
    assert!((r.path(0.0).area().abs() - 800.0).abs() < 1e-9);
}

#[test]
fn winding_flips_sign_of_area() {
    let mut r = RectShape {
        position: Property::constant(Vec2::new(0.0, 0.0)),
        size: Property::constant(Vec2::new(10.0, 10.0)),
        roundness: Property::constant(2.0),
        clockwise: true,
    };
    let cw = r.path(0.0).area();
    r.clockwise = false;
    let ccw = r.path(0.0).area();
    assert!((cw + ccw).abs() < 1e-9);
}

#[test]
fn polystar_vertex_count() {
    let star = Polystar {
        star: true,
        position: Property::constant(Vec2::ZERO),
        points: Property::constant(5.0),
        rotation: Property::constant(0.0),
        inner_radius: Property::constant(5.0),
        outer_radius: Property::constant(10.0),
        clockwise: true,
    };
    // move + 9 lines + close
    assert_eq!(star.path(0.0).elements().len(), 11);

    let degenerate = Polystar {
        points: Property::constant(1.0),
        ..star
    };
    assert!(degenerate.path(0.0).elements().is_empty());
}

#[test]
fn dash_pattern_repeats_odd_lengths() {
    let style = StrokeStyle {
        dash: vec![
            DashEntry::Dash(Property::constant(4.0)),
            DashEntry::Offset(Property::constant(1.0)),
        ],
        ..StrokeStyle::default()
    };
    assert_eq!(style.dash_at(0.0), Some((vec![4.0, 4.0], 1.0)));
    assert_eq!(StrokeStyle::default().dash_at(0.0), None);
}
