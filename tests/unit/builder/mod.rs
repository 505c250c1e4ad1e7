use super::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use kurbo::{Affine, Rect, Shape as _, Vec2};

use crate::builder::layer::{mask_chain, scene_effect, world_matrix};
use crate::foundation::core::{Rgb8, Rgba8};
use crate::model::composition::{Asset, Precomp};
use crate::model::group::Group;
use crate::model::layer::{Layer, LayerEffect, LayerKind, Mask, MaskMode, MatteMode};
use crate::model::object::{
    FillRule, Object, Position, RectShape, SolidFill, SolidStroke, Transform, TrimMode, Trimpath,
};
use crate::model::property::Property;
use crate::render::canvas::Canvas;
use crate::render::effect::{BlurDirection, SceneEffect};
use crate::render::method::MaskMethod;
use crate::render::paint::{Paint, PaintRef};
use crate::render::shape::ShapeFill;
use crate::render::surface_pool::SurfacePoolOpts;
use crate::scheduler::TaskScheduler;

fn rect(x: f64, y: f64, w: f64, h: f64) -> Object {
    Object::Rect(RectShape {
        position: Property::constant(Vec2::new(x + w * 0.5, y + h * 0.5)),
        size: Property::constant(Vec2::new(w, h)),
        ..RectShape::default()
    })
}

fn fill(c: Rgb8) -> Object {
    Object::SolidFill(SolidFill {
        color: Property::constant(c),
        opacity: Property::constant(100.0),
        ..SolidFill::default()
    })
}

fn stroke(c: Rgb8) -> Object {
    Object::SolidStroke(SolidStroke {
        color: Property::constant(c),
        opacity: Property::constant(100.0),
        ..SolidStroke::default()
    })
}

fn translate(x: f64, y: f64) -> Transform {
    Transform {
        position: Position::Combined(Property::constant(Vec2::new(x, y))),
        ..Transform::default()
    }
}

fn shape_layer(children: Vec<Object>) -> Layer {
    let mut l = Layer::default();
    l.kind = LayerKind::Shape;
    l.group = Group::new(children);
    l
}

fn red_layer() -> Layer {
    shape_layer(vec![rect(0.0, 0.0, 8.0, 8.0), fill(Rgb8::new(255, 0, 0))])
}

fn comp(layers: Vec<Layer>) -> Composition {
    let mut c = Composition {
        width: 64.0,
        height: 64.0,
        out_frame: 30.0,
        layers,
        ..Composition::default()
    };
    c.prepare();
    c
}

struct Env {
    remap: ColorRemap,
    registry: ColorRegistry,
    images: ImageStore,
}

impl Env {
    fn new() -> Self {
        Self {
            remap: ColorRemap::new(),
            registry: ColorRegistry::new(),
            images: ImageStore::default(),
        }
    }

    fn build(&self, comp: &Composition, frame: f32) -> Scene {
        let cx = BuildCx {
            comp,
            remap: &self.remap,
            registry: &self.registry,
            images: &self.images,
            fonts: None,
        };
        build_frame(&cx, frame)
    }
}

fn children(p: &PaintRef) -> Vec<PaintRef> {
    match &*p.lock() {
        Paint::Scene(s) => s.paints().to_vec(),
        _ => Vec::new(),
    }
}

fn solid(p: &PaintRef) -> Option<Rgba8> {
    match &*p.lock() {
        Paint::Shape(s) => match &s.fill {
            Some(ShapeFill::Solid(c)) => Some(*c),
            _ => None,
        },
        _ => None,
    }
}

fn bbox(p: &PaintRef) -> Rect {
    match &*p.lock() {
        Paint::Shape(s) => s.path.bounding_box(),
        _ => Rect::ZERO,
    }
}

#[test]
fn layers_are_stacked_bottom_first() {
    let blue = shape_layer(vec![rect(0.0, 0.0, 8.0, 8.0), fill(Rgb8::new(0, 0, 255))]);
    let c = comp(vec![red_layer(), blue]);
    let root = Env::new().build(&c, 0.0);
    assert_eq!(root.paints().len(), 2);
    let bottom = children(&root.paints()[0]);
    let top = children(&root.paints()[1]);
    assert_eq!(solid(&bottom[0]), Some(Rgba8::new(0, 0, 255, 255)));
    assert_eq!(solid(&top[0]), Some(Rgba8::new(255, 0, 0, 255)));
}

#[test]
fn inactive_transparent_and_null_layers_draw_nothing() {
    let mut late = red_layer();
    late.in_frame = 10.0;
    late.out_frame = 20.0;
    let mut clear = red_layer();
    clear.transform.opacity = Property::constant(0.0);
    let null = Layer::default();
    let c = comp(vec![late, clear, null]);
    let env = Env::new();
    assert!(env.build(&c, 5.0).paints().is_empty());
    assert_eq!(env.build(&c, 10.0).paints().len(), 1);
    assert!(env.build(&c, 20.0).paints().is_empty());
}

#[test]
fn layer_scene_carries_transform_opacity_and_blend() {
    let mut l = red_layer();
    l.transform = translate(3.0, 4.0);
    l.transform.opacity = Property::constant(50.0);
    l.blend = crate::foundation::core::BlendMode::Multiply;
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let layer = root.paints()[0].lock();
    let state = layer.state();
    assert_eq!(state.transform, Affine::translate((3.0, 4.0)));
    assert_eq!(state.opacity, 128);
    assert_eq!(state.blend, crate::foundation::core::BlendMode::Multiply);
}

#[test]
fn parent_chain_composes_and_survives_cycles() {
    let mut parent = Layer::default();
    parent.index = Some(1);
    parent.transform = translate(10.0, 0.0);
    let mut child = red_layer();
    child.index = Some(2);
    child.parent = Some(1);
    child.transform = translate(0.0, 5.0);
    let c = comp(vec![parent, child]);
    assert_eq!(world_matrix(&c.layers, 1, 0.0), Affine::translate((10.0, 5.0)));
    // The null parent itself is not drawn.
    assert_eq!(Env::new().build(&c, 0.0).paints().len(), 1);

    let mut selfish = red_layer();
    selfish.index = Some(7);
    selfish.parent = Some(7);
    selfish.transform = translate(1.0, 0.0);
    let m = world_matrix(&[selfish], 0, 0.0);
    assert!(m.translation().x > 1.0);
    assert!(m.translation().x.is_finite());
}

#[test]
fn styles_collect_only_the_paths_above_them() {
    let l = shape_layer(vec![
        rect(0.0, 0.0, 4.0, 4.0),
        fill(Rgb8::new(255, 0, 0)),
        rect(10.0, 10.0, 4.0, 4.0),
    ]);
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let shapes = children(&root.paints()[0]);
    assert_eq!(shapes.len(), 1);
    assert_eq!(bbox(&shapes[0]), Rect::new(0.0, 0.0, 4.0, 4.0));
}

#[test]
fn style_without_paths_is_dropped() {
    let l = shape_layer(vec![fill(Rgb8::new(255, 0, 0)), rect(0.0, 0.0, 4.0, 4.0)]);
    let c = comp(vec![l]);
    assert!(Env::new().build(&c, 0.0).paints().is_empty());
}

#[test]
fn lower_style_draws_first() {
    let l = shape_layer(vec![
        rect(0.0, 0.0, 4.0, 4.0),
        stroke(Rgb8::new(0, 255, 0)),
        fill(Rgb8::new(255, 0, 0)),
    ]);
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let shapes = children(&root.paints()[0]);
    assert_eq!(shapes.len(), 2);
    assert_eq!(solid(&shapes[0]), Some(Rgba8::new(255, 0, 0, 255)));
    match &*shapes[1].lock() {
        Paint::Shape(s) => {
            assert!(s.fill.is_none());
            let st = s.stroke.as_ref().unwrap();
            assert_eq!(st.paint, ShapeFill::Solid(Rgba8::new(0, 255, 0, 255)));
            assert_eq!(s.path.bounding_box(), Rect::new(0.0, 0.0, 4.0, 4.0));
        }
        other => panic!("expected a shape, got {other:?}"),
    }
}

#[test]
fn mergeable_group_feeds_the_parent_style_in_parent_space() {
    let inner = Group::new(vec![rect(0.0, 0.0, 4.0, 4.0), Object::Transform(translate(5.0, 5.0))]);
    let l = shape_layer(vec![Object::Group(inner), fill(Rgb8::new(255, 0, 0))]);
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let shapes = children(&root.paints()[0]);
    assert_eq!(shapes.len(), 1);
    assert_eq!(bbox(&shapes[0]), Rect::new(5.0, 5.0, 9.0, 9.0));
}

#[test]
fn styled_group_gets_its_own_scene() {
    let mut t = translate(2.0, 0.0);
    t.opacity = Property::constant(50.0);
    let inner = Group::new(vec![
        rect(0.0, 0.0, 4.0, 4.0),
        fill(Rgb8::new(0, 0, 255)),
        Object::Transform(t),
    ]);
    let c = comp(vec![shape_layer(vec![Object::Group(inner)])]);
    let root = Env::new().build(&c, 0.0);
    let kids = children(&root.paints()[0]);
    assert_eq!(kids.len(), 1);
    {
        let g = kids[0].lock();
        assert_eq!(g.state().opacity, 128);
        assert_eq!(g.state().transform, Affine::translate((2.0, 0.0)));
    }
    let shapes = children(&kids[0]);
    assert_eq!(bbox(&shapes[0]), Rect::new(0.0, 0.0, 4.0, 4.0));
}

#[test]
fn hidden_group_is_skipped() {
    let mut inner = Group::new(vec![rect(0.0, 0.0, 4.0, 4.0), fill(Rgb8::new(0, 0, 255))]);
    inner.hidden = true;
    let c = comp(vec![shape_layer(vec![
        Object::Group(inner),
        rect(0.0, 0.0, 8.0, 8.0),
        fill(Rgb8::WHITE),
    ])]);
    let root = Env::new().build(&c, 0.0);
    let kids = children(&root.paints()[0]);
    assert_eq!(kids.len(), 1);
    assert_eq!(solid(&kids[0]), Some(Rgba8::new(255, 255, 255, 255)));
}

#[test]
fn trims_below_a_path_ride_on_its_style() {
    let trim = Trimpath {
        start: Property::constant(0.0),
        end: Property::constant(50.0),
        ..Trimpath::default()
    };
    let l = shape_layer(vec![
        rect(0.0, 0.0, 4.0, 4.0),
        stroke(Rgb8::WHITE),
        Object::Trimpath(trim),
    ]);
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let shapes = children(&root.paints()[0]);
    match &*shapes[0].lock() {
        Paint::Shape(s) => {
            assert_eq!(s.trims.len(), 1);
            assert_eq!((s.trims[0].start, s.trims[0].end), (0.0, 0.5));
            assert!(s.trims[0].simultaneous);
        }
        other => panic!("expected a shape, got {other:?}"),
    }
}

#[test]
fn paths_under_different_trims_are_cut_eagerly() {
    let trim = Trimpath {
        end: Property::constant(50.0),
        mode: TrimMode::Individual,
        ..Trimpath::default()
    };
    let trimmed = Group::new(vec![
        rect(0.0, 0.0, 4.0, 4.0),
        Object::Trimpath(trim),
        Object::Transform(Transform::default()),
    ]);
    let l = shape_layer(vec![
        Object::Group(trimmed),
        rect(20.0, 20.0, 4.0, 4.0),
        fill(Rgb8::WHITE),
    ]);
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let shapes = children(&root.paints()[0]);
    match &*shapes[0].lock() {
        Paint::Shape(s) => {
            assert!(s.trims.is_empty());
            let bb = s.path.bounding_box();
            assert_eq!((bb.x1, bb.y1), (24.0, 24.0));
            assert!(bb.x0 >= 0.0 && bb.y0 >= 0.0);
        }
        other => panic!("expected a shape, got {other:?}"),
    }
}

#[test]
fn registry_tags_override_and_remap_applies_elsewhere() {
    let tagged = Object::SolidFill(SolidFill {
        name: Some(ColorRegistry::tag("brand")),
        color: Property::constant(Rgb8::new(255, 0, 0)),
        opacity: Property::constant(100.0),
        ..SolidFill::default()
    });
    let c = comp(vec![
        shape_layer(vec![rect(0.0, 0.0, 4.0, 4.0), tagged]),
        red_layer(),
    ]);
    let mut env = Env::new();
    env.registry.register("brand", 0xFF00_FF00);
    env.remap = ColorRemap::from_pairs(&[(0xFFFF_0000, 0xFF00_00FF)], false);
    let root = env.build(&c, 0.0);
    let bottom = children(&root.paints()[0]);
    let top = children(&root.paints()[1]);
    assert_eq!(solid(&bottom[0]), Some(Rgba8::new(0, 0, 255, 255)));
    assert_eq!(solid(&top[0]), Some(Rgba8::new(0, 255, 0, 255)));
}

#[test]
fn solid_layer_uses_its_prebuilt_rectangle() {
    let mut l = Layer::default();
    l.kind = LayerKind::Solid;
    l.width = 20.0;
    l.height = 10.0;
    l.solid_color = Some(Rgb8::new(1, 2, 3));
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let shapes = children(&root.paints()[0]);
    assert_eq!(solid(&shapes[0]), Some(Rgba8::new(1, 2, 3, 255)));
    assert_eq!(bbox(&shapes[0]), Rect::new(0.0, 0.0, 20.0, 10.0));
}

fn mask(mode: MaskMode, opacity: f32) -> Mask {
    Mask {
        path: Property::constant(Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.1)),
        opacity: Property::constant(opacity),
        mode,
        inverted: false,
    }
}

#[test]
fn masks_chain_newest_over_accumulated() {
    assert!(mask_chain(&[], 0.0).is_none());
    assert!(mask_chain(&[mask(MaskMode::None, 100.0)], 0.0).is_none());

    let one = mask_chain(&[mask(MaskMode::Add, 50.0)], 0.0).unwrap();
    assert_eq!(solid(&one), Some(Rgba8::new(255, 255, 255, 128)));
    assert!(one.lock().state().mask.is_none());

    let two = mask_chain(&[mask(MaskMode::Add, 100.0), mask(MaskMode::Subtract, 100.0)], 0.0).unwrap();
    let g = two.lock();
    let m = g.state().mask.as_ref().unwrap();
    assert_eq!(m.method, MaskMethod::Subtract);
    assert!(m.target.lock().state().mask.is_none());
}

#[test]
fn leading_subtract_cuts_out_of_everything() {
    let m = mask_chain(&[mask(MaskMode::Subtract, 100.0)], 0.0).unwrap();
    match &*m.lock() {
        Paint::Shape(s) => {
            assert_eq!(s.rule, FillRule::EvenOdd);
            assert!(s.path.bounding_box().width() > 1000.0);
        }
        other => panic!("expected a shape, got {other:?}"),
    };
}

#[test]
fn masked_layer_uses_alpha_coverage() {
    let mut l = red_layer();
    l.masks = vec![mask(MaskMode::Add, 100.0)];
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    let layer = root.paints()[0].lock();
    assert_eq!(layer.state().mask.as_ref().map(|m| m.method), Some(MaskMethod::Alpha));
}

fn matte_pair(mode: MatteMode) -> Vec<Layer> {
    let mut source = red_layer();
    source.matte_source = true;
    source.in_frame = 0.0;
    source.out_frame = 10.0;
    let mut target = red_layer();
    target.matte = Some(mode);
    vec![source, target]
}

#[test]
fn matte_source_only_draws_through_its_target() {
    let c = comp(matte_pair(MatteMode::Luma));
    let root = Env::new().build(&c, 0.0);
    assert_eq!(root.paints().len(), 1);
    let wrap = root.paints()[0].lock();
    let m = wrap.state().mask.as_ref().unwrap();
    assert_eq!(m.method, MaskMethod::Luma);
    assert_eq!(m.target.lock().state().opacity, 255);
}

#[test]
fn missing_matte_source_hides_or_reveals() {
    let env = Env::new();
    let plain = comp(matte_pair(MatteMode::Alpha));
    assert!(env.build(&plain, 15.0).paints().is_empty());

    let inverted = comp(matte_pair(MatteMode::AlphaInverted));
    let root = env.build(&inverted, 15.0);
    assert_eq!(root.paints().len(), 1);
    assert!(root.paints()[0].lock().state().mask.is_none());
}

#[test]
fn effects_resolve_at_the_content_frame() {
    let blur = LayerEffect::GaussianBlur {
        blurriness: Property::constant(10.0),
        direction: 2,
        wrap: true,
    };
    match scene_effect(&blur, 0.0) {
        SceneEffect::GaussianBlur(b) => {
            assert!((b.sigma - 3.0).abs() < 1e-6);
            assert_eq!(b.direction, BlurDirection::Horizontal);
            assert!(b.wrap);
        }
        other => panic!("unexpected {other:?}"),
    }

    let fill = LayerEffect::Fill {
        color: Property::constant(Rgb8::WHITE),
        opacity: Property::constant(50.0),
    };
    match scene_effect(&fill, 0.0) {
        SceneEffect::Fill(f) => assert_eq!(f.opacity, 128),
        other => panic!("unexpected {other:?}"),
    }

    let tritone = LayerEffect::Tritone {
        bright: Property::constant(Rgb8::WHITE),
        midtone: Property::constant(Rgb8::new(128, 128, 128)),
        dark: Property::constant(Rgb8::BLACK),
        blend: Property::constant(25.0),
    };
    match scene_effect(&tritone, 0.0) {
        SceneEffect::Tritone(t) => {
            assert_eq!(t.shadow, Rgb8::BLACK);
            assert_eq!(t.highlight, Rgb8::WHITE);
            assert!((t.blend - 0.25).abs() < 1e-6);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn layer_effects_attach_to_the_layer_scene() {
    let mut l = red_layer();
    l.effects = vec![LayerEffect::Tint {
        black: Property::constant(Rgb8::BLACK),
        white: Property::constant(Rgb8::WHITE),
        intensity: Property::constant(100.0),
    }];
    let c = comp(vec![l]);
    let root = Env::new().build(&c, 0.0);
    match &*root.paints()[0].lock() {
        Paint::Scene(s) => assert_eq!(s.effects().len(), 1),
        other => panic!("expected a scene, got {other:?}"),
    };
}

fn precomp_comp() -> Composition {
    let mut inner = red_layer();
    inner.in_frame = 0.0;
    inner.out_frame = 5.0;
    let mut assets = BTreeMap::new();
    assets.insert(
        "pre".to_owned(),
        Arc::new(Asset::Precomp(Precomp { layers: vec![inner] })),
    );
    let mut l = Layer::default();
    l.kind = LayerKind::Precomp;
    l.ref_id = Some("pre".into());
    l.width = 32.0;
    l.height = 32.0;
    l.start_frame = 10.0;
    let mut c = Composition {
        width: 64.0,
        height: 64.0,
        out_frame: 30.0,
        layers: vec![l],
        assets,
        ..Composition::default()
    };
    c.prepare();
    c
}

#[test]
fn precomp_runs_in_its_own_time_and_is_clipped() {
    let c = precomp_comp();
    let env = Env::new();
    let root = env.build(&c, 12.0);
    assert_eq!(root.paints().len(), 1);
    assert!(root.paints()[0].lock().state().clipper.is_some());
    assert!(env.build(&c, 16.0).paints().is_empty());
}

#[test]
fn built_frame_rasterizes() {
    let c = comp(vec![red_layer()]);
    let root = Env::new().build(&c, 0.0);
    let scheduler = Arc::new(TaskScheduler::new(0).unwrap());
    let mut canvas = Canvas::new(16, 16, scheduler, SurfacePoolOpts::default()).unwrap();
    canvas.push(PaintRef::new(root));
    canvas.update();
    canvas.draw(None).unwrap();
    let px = canvas.pixels().unwrap();
    assert_eq!(&px[..4], &[255, 0, 0, 255]);
    let far = (15 * 16 + 15) * 4;
    assert_eq!(&px[far..far + 4], &[0, 0, 0, 0]);
}
