use super::*;

use kurbo::{Line, Shape as _};

fn line(x0: f64, x1: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((x0, 0.0));
    p.line_to((x1, 0.0));
    p
}

fn length(p: &BezPath) -> f64 {
    p.segments().map(|s| s.arclen(ARCLEN_ACCURACY)).sum()
}

fn trim(start: f32, end: f32, simultaneous: bool) -> TrimSpec {
    TrimSpec {
        start,
        end,
        simultaneous,
    }
}

#[test]
fn trim_keeps_the_requested_fraction() {
    let out = trim_path(&line(0.0, 100.0), trim(0.25, 0.75, true));
    assert!((length(&out) - 50.0).abs() < 1e-6);
    let first = out.segments().next().unwrap();
    assert_eq!(first, PathSeg::Line(Line::new((25.0, 0.0), (75.0, 0.0))));
}

#[test]
fn full_range_is_untouched_and_empty_range_is_empty() {
    let p = line(0.0, 10.0);
    assert_eq!(trim_path(&p, trim(0.0, 1.0, true)), p);
    assert!(trim_path(&p, trim(0.0, 0.0, true)).elements().is_empty());
}

#[test]
fn ranges_past_the_end_wrap_to_the_start() {
    let out = trim_path(&line(0.0, 100.0), trim(0.75, 1.125, true));
    let segs: Vec<PathSeg> = out.segments().collect();
    assert_eq!(segs.len(), 2);
    assert_eq!(segs[0], PathSeg::Line(Line::new((75.0, 0.0), (100.0, 0.0))));
    assert_eq!(segs[1], PathSeg::Line(Line::new((0.0, 0.0), (12.5, 0.0))));

    let shifted = trim_path(&line(0.0, 100.0), trim(1.25, 1.5, true));
    assert!((length(&shifted) - 25.0).abs() < 1e-6);
}

#[test]
fn simultaneous_trims_each_subpath_individual_trims_the_whole() {
    let mut p = line(0.0, 10.0);
    p.move_to((0.0, 5.0));
    p.line_to((30.0, 5.0));

    let each = trim_path(&p, trim(0.0, 0.5, true));
    assert!((length(&each) - 20.0).abs() < 1e-6);

    let whole = trim_path(&p, trim(0.0, 0.5, false));
    assert!((length(&whole) - 20.0).abs() < 1e-6);
    assert_eq!(whole.segments().count(), 2);
    assert!(trim_path(&p, trim(0.0, 0.25, false)).segments().count() == 1);
}

#[test]
fn geometry_job_transforms_fills_and_strokes() {
    let job = GeometryJob {
        path: line(0.0, 10.0),
        rule: FillRule::NonZero,
        fill: Some(ShapeFill::Solid(Rgba8::new(0, 0, 0, 255))),
        stroke: Some(StrokeSpec {
            width: 2.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 4.0,
            dash: None,
            paint: ShapeFill::Solid(Rgba8::new(255, 255, 255, 255)),
        }),
        trims: SmallVec::new(),
        transform: Affine::translate((5.0, 5.0)),
        opacity: 200,
        stroke_first: true,
    };
    let p = prepare_geometry(job);
    assert_eq!((p.bounds.x, p.bounds.w), (5, 10));
    assert!(p.bounds.y <= 4 && p.bounds.y2() >= 6);
    assert_eq!(p.opacity, 200);
    assert!(p.stroke_first);
    let (fill, _, _) = p.fill.unwrap();
    assert_eq!(fill.bounding_box(), Rect::new(5.0, 5.0, 15.0, 5.0));
}

#[test]
fn zero_width_strokes_are_dropped() {
    let job = GeometryJob {
        path: line(0.0, 10.0),
        rule: FillRule::NonZero,
        fill: None,
        stroke: Some(StrokeSpec {
            width: 0.0,
            cap: LineCap::Round,
            join: LineJoin::Round,
            miter_limit: 4.0,
            dash: Some((vec![1.0, 1.0], 0.0)),
            paint: ShapeFill::Solid(Rgba8::TRANSPARENT),
        }),
        trims: SmallVec::new(),
        transform: Affine::IDENTITY,
        opacity: 255,
        stroke_first: false,
    };
    let p = prepare_geometry(job);
    assert!(p.stroke.is_none());
    assert!(p.bounds.is_empty());
}

#[test]
fn shapes_prepare_on_the_scheduler() {
    let scheduler = TaskScheduler::new(2).unwrap();
    let mut s = Shape::filled(
        Rect::new(0.0, 0.0, 3.0, 3.0).to_path(0.1),
        ShapeFill::Solid(Rgba8::new(1, 2, 3, 255)),
        FillRule::EvenOdd,
    );
    s.update(&scheduler, Affine::scale(2.0), 255);
    assert_eq!(s.bounds(), RenderRegion::new(0, 0, 6, 6));
    assert_eq!(s.local_bounds(), Some(Rect::new(0.0, 0.0, 3.0, 3.0)));
}
