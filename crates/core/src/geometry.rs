use crate::vector2d::{
    cross, distance, dot, midpoint, normalize_angle, orthogonalize_left, project, Vector2D,
    EPSILON,
};
use serde::Serialize;
use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Vector2D,
    pub radius: f64,
}

/// Intersection of two parametric lines `p0 + t0·d0` and `p1 + t1·d1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineIntersection {
    pub point: Vector2D,
    pub t0: f64,
    pub t1: f64,
}

/// The unique circle through three points.
///
/// Colinear points (cross product within [`EPSILON`] of zero) fall back to the
/// circle whose diameter is the farthest-apart pair, so the bisector
/// intersection below never divides by a vanishing cross product.
pub fn bounding_circle(v0: Vector2D, v1: Vector2D, v2: Vector2D) -> Circle {
    let d01 = v1 - v0;
    let d12 = v2 - v1;
    if cross(d01, v2 - v0).abs() < EPSILON {
        let candidates = [(v0, v1), (v1, v2), (v0, v2)];
        let (a, b) = candidates
            .iter()
            .copied()
            .fold((v0, v0), |best, pair| {
                if distance(pair.0, pair.1) > distance(best.0, best.1) {
                    pair
                } else {
                    best
                }
            });
        return Circle {
            center: midpoint(a, b),
            radius: distance(a, b) / 2.0,
        };
    }

    // Perpendicular bisectors of v0v1 and v1v2 meet at the center.
    let m01 = midpoint(v0, v1);
    let m12 = midpoint(v1, v2);
    let b0 = orthogonalize_left(d01);
    let b1 = orthogonalize_left(d12);
    let t = cross(m12 - m01, b1) / cross(b0, b1);
    let center = m01 + b0 * t;
    Circle {
        center,
        radius: distance(center, v0),
    }
}

/// Intersect two lines given in point-direction form. Parallel lines give `None`.
pub fn line_intersection(
    p0: Vector2D,
    d0: Vector2D,
    p1: Vector2D,
    d1: Vector2D,
) -> Option<LineIntersection> {
    let denom = cross(d0, d1);
    if denom.abs() < EPSILON {
        return None;
    }
    let w = p1 - p0;
    let t0 = cross(w, d1) / denom;
    let t1 = cross(w, d0) / denom;
    Some(LineIntersection {
        point: p0 + d0 * t0,
        t0,
        t1,
    })
}

/// Mirror `point` across the line through `line_point` with direction `line_direction`.
pub fn reflect_across_line(point: Vector2D, line_point: Vector2D, line_direction: Vector2D) -> Vector2D {
    let v = point - line_point;
    line_point + project(v, line_direction) * 2.0 - v
}

/// Which side of the directed line `a → b` the point lies on: `1.0` left, `-1.0` right,
/// `0.0` on the line.
pub fn side_of_line(a: Vector2D, b: Vector2D, point: Vector2D) -> f64 {
    let c = cross(b - a, point - a);
    if c.abs() < EPSILON {
        0.0
    } else {
        c.signum()
    }
}

// ── Arcs ────────────────────────────────────────────────────────────

/// Signed angular span from `start` to `end` around `center`.
/// Positive spans run counterclockwise. The result lies in `(0, 2π]` or `[-2π, 0)`.
pub fn arc_span(center: Vector2D, start: Vector2D, end: Vector2D, counterclockwise: bool) -> f64 {
    let a0 = (start - center).angle();
    let a1 = (end - center).angle();
    let mut ccw = normalize_angle(a1 - a0);
    if ccw == 0.0 {
        ccw = TWO_PI;
    }
    if counterclockwise {
        ccw
    } else {
        ccw - TWO_PI
    }
}

/// Signed angular span from `start` to `end` around `center`, traveling the way
/// whose arc passes through `through`.
pub fn arc_span_through(center: Vector2D, start: Vector2D, end: Vector2D, through: Vector2D) -> f64 {
    let a0 = (start - center).angle();
    let to_end = normalize_angle((end - center).angle() - a0);
    let to_through = normalize_angle((through - center).angle() - a0);
    arc_span(center, start, end, to_through <= to_end)
}

/// Points strictly inside an arc, evenly spaced: `count` points at
/// `start_angle + span·i/(count+1)` for `i = 1..=count`.
pub fn distribute_on_arc(circle: Circle, start_angle: f64, span: f64, count: usize) -> Vec<Vector2D> {
    let step = span / (count as f64 + 1.0);
    (1..=count)
        .map(|i| {
            let angle = start_angle + step * i as f64;
            circle.center + Vector2D::new(angle.cos(), angle.sin()) * circle.radius
        })
        .collect()
}

/// Points strictly inside a segment, evenly spaced.
pub fn distribute_on_segment(start: Vector2D, end: Vector2D, count: usize) -> Vec<Vector2D> {
    let step = (end - start) / (count as f64 + 1.0);
    (1..=count).map(|i| start + step * i as f64).collect()
}

// ── Circles of prescribed radius ────────────────────────────────────

/// The two centers of radius-`radius` circles passing through `p0` and `p1`.
///
/// The chord's linear constraint is solved for whichever coordinate has the
/// larger chord delta, so the division is never by a near-zero axis delta.
/// A slightly negative discriminant (rounding at the minimum radius) is
/// clamped to zero; a clearly negative one yields `None`.
pub fn centers_for_radius(p0: Vector2D, p1: Vector2D, radius: f64) -> Option<(Vector2D, Vector2D)> {
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    if dx.abs() < EPSILON && dy.abs() < EPSILON {
        return None;
    }
    let k = (dot(p1, p1) - dot(p0, p0)) / 2.0;
    let r2 = radius * radius;

    if dx.abs() >= dy.abs() {
        // cx = alpha + beta·cy
        let alpha = k / dx;
        let beta = -dy / dx;
        let u = alpha - p0.x;
        let (c0, c1) = solve_quadratic(
            beta * beta + 1.0,
            2.0 * (beta * u - p0.y),
            u * u + p0.y * p0.y - r2,
        )?;
        Some((
            Vector2D::new(alpha + beta * c0, c0),
            Vector2D::new(alpha + beta * c1, c1),
        ))
    } else {
        // cy = alpha + beta·cx
        let alpha = k / dy;
        let beta = -dx / dy;
        let u = alpha - p0.y;
        let (c0, c1) = solve_quadratic(
            beta * beta + 1.0,
            2.0 * (beta * u - p0.x),
            u * u + p0.x * p0.x - r2,
        )?;
        Some((
            Vector2D::new(c0, alpha + beta * c0),
            Vector2D::new(c1, alpha + beta * c1),
        ))
    }
}

fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let mut disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        if disc < -1e-9 * (b * b).max(1.0) {
            return None;
        }
        disc = 0.0;
    }
    let root = disc.sqrt();
    Some(((-b - root) / (2.0 * a), (-b + root) / (2.0 * a)))
}

/// Newton-Raphson: radius of a closed loop made of `chord_count` chords of
/// length `chord` plus one closing chord of length `closing_chord` on the
/// opposite side of the center:
///
/// `chord_count·2·asin(chord/2r) + 2·asin(closing_chord/2r) = 2π`
///
/// Returns `None` when the chords are too short to wrap around the closing chord.
pub fn solve_loop_radius(chord: f64, chord_count: usize, closing_chord: f64) -> Option<f64> {
    if chord_count == 0 || chord <= 0.0 || closing_chord <= 0.0 {
        return None;
    }
    let n = chord_count as f64;
    let half_c = chord / 2.0;
    let half_l = closing_chord / 2.0;
    let floor = half_c.max(half_l) * (1.0 + 1e-12);

    let f = |r: f64| n * 2.0 * (half_c / r).asin() + 2.0 * (half_l / r).asin() - TWO_PI;
    if f(floor) < 0.0 {
        return None;
    }

    // Perimeter guess; asin(x) ≥ x puts it at or left of the root.
    let mut r = (n * chord + closing_chord) / TWO_PI;
    if r < floor {
        r = floor;
    }

    for _ in 0..50 {
        let sc = half_c / r;
        let sl = half_l / r;
        let fr = f(r);
        if fr.abs() < 1e-12 {
            break;
        }
        let df = -n * 2.0 * half_c / (r * r * (1.0 - sc * sc).sqrt())
            - 2.0 * half_l / (r * r * (1.0 - sl * sl).sqrt());
        if !df.is_finite() || df.abs() < 1e-30 {
            break;
        }
        r -= fr / df;
        if r < floor {
            r = floor;
        }
    }
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn compare_f64(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_bounding_circle_right_triangle() {
        let c = bounding_circle(
            Vector2D::new(0.0, 0.0),
            Vector2D::new(2.0, 0.0),
            Vector2D::new(0.0, 2.0),
        );
        assert!(compare_f64(c.center.x, 1.0, 1e-12));
        assert!(compare_f64(c.center.y, 1.0, 1e-12));
        assert!(compare_f64(c.radius, 2f64.sqrt(), 1e-12));
    }

    #[test]
    fn test_bounding_circle_colinear() {
        let c = bounding_circle(
            Vector2D::new(1.0, 1.0),
            Vector2D::new(5.0, 1.0),
            Vector2D::new(2.0, 1.0),
        );
        assert_eq!(c.center, Vector2D::new(3.0, 1.0));
        assert!(compare_f64(c.radius, 2.0, 1e-12));
    }

    #[test]
    fn test_bounding_circle_coincident() {
        let p = Vector2D::new(3.0, -2.0);
        let c = bounding_circle(p, p, p);
        assert_eq!(c.center, p);
        assert_eq!(c.radius, 0.0);
    }

    #[test]
    fn test_line_intersection() {
        let hit = line_intersection(
            Vector2D::new(0.0, 0.0),
            Vector2D::new(1.0, 0.0),
            Vector2D::new(2.0, -1.0),
            Vector2D::new(0.0, 1.0),
        )
        .unwrap();
        assert!(compare_f64(hit.point.x, 2.0, 1e-12));
        assert!(compare_f64(hit.point.y, 0.0, 1e-12));
        assert!(compare_f64(hit.t0, 2.0, 1e-12));
        assert!(compare_f64(hit.t1, 1.0, 1e-12));
        assert!(line_intersection(
            Vector2D::ZERO,
            Vector2D::new(1.0, 1.0),
            Vector2D::new(0.0, 1.0),
            Vector2D::new(2.0, 2.0),
        )
        .is_none());
    }

    #[test]
    fn test_reflect_across_line() {
        let p = reflect_across_line(
            Vector2D::new(1.0, 2.0),
            Vector2D::ZERO,
            Vector2D::new(1.0, 0.0),
        );
        assert!(compare_f64(p.x, 1.0, 1e-12));
        assert!(compare_f64(p.y, -2.0, 1e-12));
    }

    #[test]
    fn test_arc_span_through() {
        let center = Vector2D::ZERO;
        let start = Vector2D::new(1.0, 0.0);
        let end = Vector2D::new(0.0, 1.0);
        let ccw = arc_span_through(center, start, end, Vector2D::new(1.0, 1.0));
        assert!(compare_f64(ccw, PI / 2.0, 1e-12));
        let cw = arc_span_through(center, start, end, Vector2D::new(-1.0, -1.0));
        assert!(compare_f64(cw, -1.5 * PI, 1e-12));
    }

    #[test]
    fn test_centers_for_radius_both_orientations() {
        for (p0, p1) in [
            (Vector2D::new(0.0, 0.0), Vector2D::new(2.0, 0.0)),
            (Vector2D::new(0.0, 0.0), Vector2D::new(0.0, 2.0)),
            (Vector2D::new(-1.0, 3.0), Vector2D::new(0.5, -2.0)),
        ] {
            let (c0, c1) = centers_for_radius(p0, p1, 5.0).unwrap();
            for c in [c0, c1] {
                assert!(compare_f64(distance(c, p0), 5.0, 1e-9));
                assert!(compare_f64(distance(c, p1), 5.0, 1e-9));
            }
            assert!(side_of_line(p0, p1, c0) != side_of_line(p0, p1, c1));
        }
        assert!(centers_for_radius(Vector2D::ZERO, Vector2D::new(4.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_solve_loop_radius_regular_polygon() {
        // A regular hexagon with unit sides has circumradius 1.
        let r = solve_loop_radius(1.0, 5, 1.0).unwrap();
        assert!(compare_f64(r, 1.0, 1e-9));
        assert!(solve_loop_radius(1.0, 1, 5.0).is_none());
    }

    proptest! {
        #[test]
        fn prop_bounding_circle_is_equidistant(
            x0 in -50.0f64..50.0, y0 in -50.0f64..50.0,
            x1 in -50.0f64..50.0, y1 in -50.0f64..50.0,
            x2 in -50.0f64..50.0, y2 in -50.0f64..50.0,
        ) {
            let (v0, v1, v2) = (Vector2D::new(x0, y0), Vector2D::new(x1, y1), Vector2D::new(x2, y2));
            prop_assume!(cross(v1 - v0, v2 - v0).abs() > 1e-2);
            let c = bounding_circle(v0, v1, v2);
            let tolerance = 1e-6 * c.radius.max(1.0);
            prop_assert!(c.center.is_finite());
            prop_assert!(compare_f64(distance(c.center, v0), c.radius, tolerance));
            prop_assert!(compare_f64(distance(c.center, v1), c.radius, tolerance));
            prop_assert!(compare_f64(distance(c.center, v2), c.radius, tolerance));
        }

        #[test]
        fn prop_colinear_uses_farthest_pair(
            x0 in -50.0f64..50.0, y0 in -50.0f64..50.0,
            dx in -5.0f64..5.0, dy in -5.0f64..5.0,
            t1 in -3.0f64..3.0, t2 in -3.0f64..3.0,
        ) {
            let base = Vector2D::new(x0, y0);
            let dir = Vector2D::new(dx, dy);
            let pts = [base, base + dir * t1, base + dir * t2];
            let c = bounding_circle(pts[0], pts[1], pts[2]);
            let farthest = [(0, 1), (1, 2), (0, 2)]
                .iter()
                .map(|&(i, j)| distance(pts[i], pts[j]))
                .fold(0.0f64, f64::max);
            prop_assert!(c.center.is_finite());
            prop_assert!(compare_f64(c.radius, farthest / 2.0, 1e-9));
        }
    }
}
