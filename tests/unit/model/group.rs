use super::*;

use crate::model::object::{EllipseShape, RectShape, SolidFill, SolidStroke, Trimpath};
use crate::model::property::Property;

fn rect() -> Object {
    Object::Rect(RectShape::default())
}

fn ellipse() -> Object {
    Object::Ellipse(EllipseShape::default())
}

fn stroke() -> Object {
    Object::SolidStroke(SolidStroke::default())
}

fn fill() -> Object {
    Object::SolidFill(SolidFill::default())
}

fn prepared(children: Vec<Object>) -> Group {
    let mut g = Group::new(children);
    g.prepare(ObjectKind::Group);
    g
}

#[test]
fn two_strokes_require_a_fragment() {
    let g = prepared(vec![stroke(), stroke(), rect()]);
    assert!(g.requires_fragment());
}

#[test]
fn one_stroke_and_one_fill_share_a_context() {
    let g = prepared(vec![stroke(), fill(), rect()]);
    assert!(!g.requires_fragment());
    assert!(g.visible());
}

#[test]
fn two_fills_require_a_fragment() {
    let g = prepared(vec![fill(), rect(), fill(), ellipse()]);
    assert!(g.requires_fragment());
}

#[test]
fn nested_non_mergeable_group_after_a_style_requires_a_fragment() {
    let inner = Object::Group(Group::new(vec![rect(), fill()]));
    // Reverse scan sees the fill first, then the nested group.
    let g = prepared(vec![inner, fill()]);
    assert!(g.requires_fragment());

    let inner = Object::Group(Group::new(vec![rect(), fill()]));
    let g = prepared(vec![fill(), inner]);
    assert!(!g.requires_fragment());
}

#[test]
fn groups_and_styles_block_merging() {
    assert!(prepared(vec![rect(), ellipse()]).allow_merge());
    assert!(!prepared(vec![rect(), fill()]).allow_merge());

    let inner = Object::Group(Group::new(vec![rect()]));
    let outer = prepared(vec![inner]);
    assert!(!outer.allow_merge());
}

#[test]
fn visibility_comes_from_primitives_or_visible_groups() {
    assert!(!prepared(vec![fill(), stroke()]).visible());

    let hidden_inner = Object::Group(Group::new(vec![fill()]));
    assert!(!prepared(vec![hidden_inner]).visible());

    let visible_inner = Object::Group(Group::new(vec![rect()]));
    assert!(prepared(vec![visible_inner]).visible());
}

#[test]
fn fragment_flag_is_monotonic() {
    let mut g = prepared(vec![stroke(), stroke(), stroke(), fill()]);
    assert!(g.requires_fragment());
    g.children.clear();
    assert!(g.requires_fragment());
}

#[test]
fn trimpath_rotates_mergeable_runs() {
    let trim = Object::Trimpath(Trimpath {
        start: Property::constant(10.0),
        ..Trimpath::default()
    });
    let r = Object::Rect(RectShape {
        clockwise: true,
        ..RectShape::default()
    });
    let g = prepared(vec![r, ellipse(), Object::Path(Default::default()), trim, fill()]);
    assert!(g.has_trimpath());
    let kinds: Vec<ObjectKind> = g.children.iter().map(Object::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ObjectKind::Ellipse,
            ObjectKind::Path,
            ObjectKind::Rect,
            ObjectKind::Trimpath,
            ObjectKind::SolidFill,
        ]
    );
}

#[test]
fn trimpath_skips_transforms() {
    let g = prepared(vec![
        rect(),
        Object::Transform(Transform::default()),
        ellipse(),
        Object::Trimpath(Trimpath::default()),
    ]);
    let kinds: Vec<ObjectKind> = g.children.iter().map(Object::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ObjectKind::Rect,
            ObjectKind::Transform,
            ObjectKind::Trimpath,
            ObjectKind::Ellipse,
        ]
    );
}

#[test]
fn layer_root_keeps_its_kind() {
    let mut g = Group::new(vec![rect()]);
    g.prepare(ObjectKind::Layer);
    assert_eq!(g.kind(), ObjectKind::Layer);
    assert_eq!(Object::Group(g).kind(), ObjectKind::Layer);
}
