use super::*;

fn stop(offset: f32, r: u8, g: u8, b: u8, a: u8) -> GradientStop {
    GradientStop {
        offset,
        color: Rgba8::new(r, g, b, a),
    }
}

#[test]
fn shared_offsets_merge_pointwise() {
    let input = [
        0.0, 1.0, 0.0, 0.0, //
        0.5, 0.0, 1.0, 0.0, //
        1.0, 0.0, 0.0, 1.0, //
        0.0, 1.0, //
        0.5, 0.5, //
        1.0, 0.0,
    ];
    let m = merge_stops(&input, 3, &ColorRemap::new());
    assert_eq!(
        m.stops.as_slice(),
        &[
            stop(0.0, 255, 0, 0, 255),
            stop(0.5, 0, 255, 0, 128),
            stop(1.0, 0, 0, 255, 0),
        ]
    );
    assert!(!m.opaque);
}

#[test]
fn alpha_between_colors_interpolates_rgb() {
    let input = [
        0.0, 1.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, 1.0, //
        0.5, 0.0,
    ];
    let m = merge_stops(&input, 2, &ColorRemap::new());
    assert_eq!(
        m.stops.as_slice(),
        &[
            stop(0.0, 255, 0, 0, 0),
            stop(0.5, 127, 0, 127, 0),
            stop(1.0, 0, 0, 255, 0),
        ]
    );
}

#[test]
fn color_between_alphas_interpolates_alpha() {
    let input = [
        0.5, 1.0, 1.0, 1.0, //
        0.0, 1.0, //
        1.0, 0.0,
    ];
    let m = merge_stops(&input, 1, &ColorRemap::new());
    assert_eq!(
        m.stops.as_slice(),
        &[
            stop(0.0, 255, 255, 255, 255),
            stop(0.5, 255, 255, 255, 127),
            stop(1.0, 255, 255, 255, 0),
        ]
    );
}

#[test]
fn merged_offsets_never_decrease_whichever_side_is_longer() {
    let more_colors = [
        0.0, 1.0, 0.0, 0.0, //
        0.3, 0.0, 1.0, 0.0, //
        0.6, 0.0, 0.0, 1.0, //
        1.0, 1.0, 1.0, 1.0, //
        0.5, 1.0,
    ];
    let more_alphas = [
        0.5, 0.2, 0.4, 0.6, //
        0.0, 1.0, //
        0.25, 0.5, //
        0.75, 0.25, //
        1.0, 1.0,
    ];
    for (input, count, expected_len) in [(&more_colors[..], 4, 5), (&more_alphas[..], 1, 5)] {
        let m = merge_stops(input, count, &ColorRemap::new());
        assert_eq!(m.stops.len(), expected_len);
        assert!(m.stops.windows(2).all(|w| w[0].offset <= w[1].offset));
    }
}

#[test]
fn missing_alpha_samples_default_to_opaque() {
    let input = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
    let m = merge_stops(&input, 2, &ColorRemap::new());
    assert!(m.opaque);
    assert_eq!(m.stops[1], stop(1.0, 255, 255, 255, 255));
}

#[test]
fn missing_color_samples_default_to_white() {
    let input = [0.0, 0.5, 1.0, 1.0];
    let m = merge_stops(&input, 0, &ColorRemap::new());
    assert_eq!(
        m.stops.as_slice(),
        &[stop(0.0, 255, 255, 255, 128), stop(1.0, 255, 255, 255, 255)]
    );
}

#[test]
fn every_emitted_color_is_remapped() {
    let remap = ColorRemap::from_pairs(&[(0xff_ff_00_00, 0xff_00_ff_00)], false);
    let input = [0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
    let m = merge_stops(&input, 2, &remap);
    assert!(m.stops.iter().all(|s| s.color.rgb() == Rgb8::new(0, 255, 0)));
}

#[test]
fn opaque_flag_is_sticky() {
    let translucent = ColorStops {
        count: 1,
        input: Property::constant(vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.5, 1.0, 1.0]),
    };
    let mut g = Gradient::new(GradientKind::Linear, translucent, &ColorRemap::new());
    assert!(!g.opaque());

    g.stops = ColorStops {
        count: 1,
        input: Property::constant(vec![0.0, 1.0, 1.0, 1.0]),
    };
    g.prepare(&ColorRemap::new());
    assert!(!g.opaque());
}

fn radial(height: f32, angle: f32) -> Gradient {
    Gradient {
        kind: GradientKind::Radial,
        start: Property::constant(Vec2::new(0.0, 0.0)),
        end: Property::constant(Vec2::new(10.0, 0.0)),
        height: Property::constant(height),
        angle: Property::constant(angle),
        stops: ColorStops {
            count: 2,
            input: Property::constant(vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
        },
        ..Gradient::default()
    }
}

#[test]
fn zero_opacity_resolves_to_nothing() {
    assert!(radial(0.0, 0.0).fill(0.0, 0, &ColorRemap::new()).is_none());
}

#[test]
fn radial_without_highlight_focuses_on_center() {
    let p = radial(0.0, 0.0).fill(0.0, 255, &ColorRemap::new()).unwrap();
    assert_eq!(
        p.geometry,
        GradientGeometry::Radial {
            center: Point::ZERO,
            radius: 10.0,
            focal: Point::ZERO,
        }
    );
}

#[test]
fn radial_highlight_moves_focal_point() {
    let p = radial(50.0, 90.0).fill(0.0, 255, &ColorRemap::new()).unwrap();
    let GradientGeometry::Radial { focal, .. } = p.geometry else {
        panic!("expected radial geometry");
    };
    assert!(focal.x.abs() < 1e-9);
    assert!((focal.y - 5.0).abs() < 1e-9);

    let full = radial(100.0, 0.0).fill(0.0, 255, &ColorRemap::new()).unwrap();
    let GradientGeometry::Radial { focal, .. } = full.geometry else {
        panic!("expected radial geometry");
    };
    assert!((focal.x - 9.9).abs() < 1e-5);
}

#[test]
fn fill_opacity_scales_stop_alpha() {
    let p = radial(0.0, 0.0).fill(0.0, 128, &ColorRemap::new()).unwrap();
    assert!(p.stops.iter().all(|s| s.color.a == 128));
}
