//! Cubic-bezier easing curves shared by keyframes.
//!
//! The curve is defined by its two control points `(out.x, out.y)` and `(in.x, in.y)` with the
//! endpoints pinned at `(0, 0)` and `(1, 1)`. `progress(t)` solves `x(s) = t` for the curve
//! parameter (Newton iteration with a subdivision fallback) and returns `y(s)`.

const SPLINE_SAMPLES: usize = 11;
const SAMPLE_STEP: f32 = 1.0 / (SPLINE_SAMPLES as f32 - 1.0);
const NEWTON_MIN_SLOPE: f32 = 0.02;
const NEWTON_ITERATIONS: usize = 4;
const SUBDIVISION_PRECISION: f32 = 0.000_000_1;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;

/// One easing curve.
#[derive(Clone, Debug, PartialEq)]
pub struct Interpolator {
    out_tangent: (f32, f32),
    in_tangent: (f32, f32),
    samples: [f32; SPLINE_SAMPLES],
}

impl Interpolator {
    /// Build a curve from the outgoing tangent of one keyframe and the incoming tangent of
    /// the next.
    pub fn new(out_tangent: (f32, f32), in_tangent: (f32, f32)) -> Self {
        let mut samples = [0.0; SPLINE_SAMPLES];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = bezier(i as f32 * SAMPLE_STEP, out_tangent.0, in_tangent.0);
        }
        Self {
            out_tangent,
            in_tangent,
            samples,
        }
    }

    /// Outgoing control point.
    pub fn out_tangent(&self) -> (f32, f32) {
        self.out_tangent
    }

    /// Incoming control point.
    pub fn in_tangent(&self) -> (f32, f32) {
        self.in_tangent
    }

    /// Eased progress for a linear time fraction `t` in `0.0..=1.0`.
    pub fn progress(&self, t: f32) -> f32 {
        let (ox, oy) = self.out_tangent;
        let (ix, iy) = self.in_tangent;
        if ox == oy && ix == iy {
            return t;
        }
        bezier(self.t_for_x(t), oy, iy)
    }

    fn t_for_x(&self, x: f32) -> f32 {
        let (x1, x2) = (self.out_tangent.0, self.in_tangent.0);

        let mut interval_start = 0.0;
        let mut current = 1;
        let last = SPLINE_SAMPLES - 1;
        while current != last && self.samples[current] <= x {
            interval_start += SAMPLE_STEP;
            current += 1;
        }
        current -= 1;

        let span = self.samples[current + 1] - self.samples[current];
        let dist = if span == 0.0 {
            0.0
        } else {
            (x - self.samples[current]) / span
        };
        let guess = interval_start + dist * SAMPLE_STEP;

        let slope = slope(guess, x1, x2);
        if slope >= NEWTON_MIN_SLOPE {
            newton(x, guess, x1, x2)
        } else if slope == 0.0 {
            guess
        } else {
            subdivide(x, interval_start, interval_start + SAMPLE_STEP, x1, x2)
        }
    }
}

fn coeffs(a1: f32, a2: f32) -> (f32, f32, f32) {
    (1.0 - 3.0 * a2 + 3.0 * a1, 3.0 * a2 - 6.0 * a1, 3.0 * a1)
}

fn bezier(t: f32, a1: f32, a2: f32) -> f32 {
    let (a, b, c) = coeffs(a1, a2);
    ((a * t + b) * t + c) * t
}

fn slope(t: f32, a1: f32, a2: f32) -> f32 {
    let (a, b, c) = coeffs(a1, a2);
    3.0 * a * t * t + 2.0 * b * t + c
}

fn newton(x: f32, mut guess: f32, x1: f32, x2: f32) -> f32 {
    for _ in 0..NEWTON_ITERATIONS {
        let s = slope(guess, x1, x2);
        if s == 0.0 {
            return guess;
        }
        guess -= (bezier(guess, x1, x2) - x) / s;
    }
    guess
}

fn subdivide(x: f32, mut a: f32, mut b: f32, x1: f32, x2: f32) -> f32 {
    let mut t = a;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        t = a + (b - a) / 2.0;
        let cur = bezier(t, x1, x2) - x;
        if cur > 0.0 {
            b = t;
        } else {
            a = t;
        }
        if cur.abs() <= SUBDIVISION_PRECISION {
            break;
        }
    }
    t
}
