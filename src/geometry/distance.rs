// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact point-to-primitive distances
//!
//! Both routines only use dot products, so they work in any dimension.
//! They return squared distances, matching the bounds used by the trees.

use nalgebra::Point;

const DEGENERATE_DET: f64 = 1e-30;

/// Squared distance from `p` to triangle `(a, b, c)`.
///
/// Returns `(squared_distance, closest_point, barycentric)` where the
/// closest point equals `a * bary[0] + b * bary[1] + c * bary[2]`.
/// Degenerate triangles fall back to the closest of their three edges.
pub fn point_triangle_squared_distance<const D: usize>(
    p: &Point<f64, D>,
    a: &Point<f64, D>,
    b: &Point<f64, D>,
    c: &Point<f64, D>,
) -> (f64, Point<f64, D>, [f64; 3]) {
    let (closest, bary) = closest_point_on_triangle(p, a, b, c);
    ((p - closest).norm_squared(), closest, bary)
}

fn closest_point_on_triangle<const D: usize>(
    p: &Point<f64, D>,
    a: &Point<f64, D>,
    b: &Point<f64, D>,
    c: &Point<f64, D>,
) -> (Point<f64, D>, [f64; 3]) {
    let ab = b - a;
    let ac = c - a;

    // Coincident corners or collinear triangle: the region tests below divide by zero.
    let ab_ac = ab.dot(&ac);
    let det = ab.norm_squared() * ac.norm_squared() - ab_ac * ab_ac;
    if det.abs() < DEGENERATE_DET {
        return closest_point_on_degenerate_triangle(p, a, b, c);
    }

    let ap = p - a;

    // Vertex region A
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*a, [1.0, 0.0, 0.0]);
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (*b, [0.0, 1.0, 0.0]);
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (*c, [0.0, 0.0, 1.0]);
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    // Face region
    let sum = va + vb + vc;
    if !(sum > 0.0) {
        return closest_point_on_degenerate_triangle(p, a, b, c);
    }
    let v = vb / sum;
    let w = vc / sum;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}

fn closest_point_on_degenerate_triangle<const D: usize>(
    p: &Point<f64, D>,
    a: &Point<f64, D>,
    b: &Point<f64, D>,
    c: &Point<f64, D>,
) -> (Point<f64, D>, [f64; 3]) {
    let (d_ab, p_ab, t_ab) = point_segment_squared_distance(p, a, b);
    let (d_bc, p_bc, t_bc) = point_segment_squared_distance(p, b, c);
    let (d_ca, p_ca, t_ca) = point_segment_squared_distance(p, c, a);

    if d_ab <= d_bc && d_ab <= d_ca {
        (p_ab, [1.0 - t_ab, t_ab, 0.0])
    } else if d_bc <= d_ca {
        (p_bc, [0.0, 1.0 - t_bc, t_bc])
    } else {
        (p_ca, [t_ca, 0.0, 1.0 - t_ca])
    }
}

/// Squared distance from `p` to segment `[a, b]`.
///
/// Returns `(squared_distance, closest_point, t)` with the closest point at
/// `a + t * (b - a)`, `t` in `[0, 1]`. A zero-length segment yields `t = 0`.
pub fn point_segment_squared_distance<const D: usize>(
    p: &Point<f64, D>,
    a: &Point<f64, D>,
    b: &Point<f64, D>,
) -> (f64, Point<f64, D>, f64) {
    let ab = b - a;
    let length_sq = ab.norm_squared();
    let t = if length_sq > 0.0 {
        ((p - a).dot(&ab) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = a + ab * t;
    ((p - closest).norm_squared(), closest, t)
}

/// True if `p` lies on segment `[a, b]` up to rounding.
pub fn point_on_segment<const D: usize>(
    p: &Point<f64, D>,
    a: &Point<f64, D>,
    b: &Point<f64, D>,
) -> bool {
    let (sq_dist, _, _) = point_segment_squared_distance(p, a, b);
    let scale = (b - a).norm_squared().max(1.0);
    sq_dist <= f64::EPSILON * f64::EPSILON * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};

    #[test]
    fn test_point_above_face() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let (sq_dist, closest, bary) =
            point_triangle_squared_distance(&Point3::new(0.25, 0.25, 2.0), &a, &b, &c);

        assert_relative_eq!(sq_dist, 4.0);
        assert_relative_eq!(closest, Point3::new(0.25, 0.25, 0.0));
        assert_relative_eq!(bary[0], 0.5);
        assert_relative_eq!(bary[1], 0.25);
        assert_relative_eq!(bary[2], 0.25);
    }

    #[test]
    fn test_vertex_and_edge_regions() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);

        let (sq_dist, closest, bary) =
            point_triangle_squared_distance(&Point2::new(-0.5, -0.5), &a, &b, &c);
        assert_relative_eq!(sq_dist, 0.5);
        assert_eq!(closest, a);
        assert_eq!(bary, [1.0, 0.0, 0.0]);

        let (sq_dist, closest, bary) =
            point_triangle_squared_distance(&Point2::new(1.0, 1.0), &a, &b, &c);
        assert_relative_eq!(sq_dist, 0.5);
        assert_relative_eq!(closest, Point2::new(0.5, 0.5));
        assert_relative_eq!(bary[1], 0.5);
        assert_relative_eq!(bary[2], 0.5);
    }

    #[test]
    fn test_degenerate_triangle() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(2.0, 0.0, 0.0);
        let (sq_dist, closest, _) =
            point_triangle_squared_distance(&Point3::new(1.5, 1.0, 0.0), &a, &b, &c);
        assert_relative_eq!(sq_dist, 1.0);
        assert_relative_eq!(closest, Point3::new(1.5, 0.0, 0.0));
        assert!(sq_dist.is_finite());
    }

    #[test]
    fn test_coincident_corners() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(1.0, 0.0, 0.0);
        let p = Point3::new(0.5, 1.0, 0.0);

        for (a, b, c) in [(a, a, c), (a, c, a), (c, a, a)] {
            let (sq_dist, closest, bary) = point_triangle_squared_distance(&p, &a, &b, &c);
            assert_relative_eq!(sq_dist, 1.0);
            assert_relative_eq!(closest, Point3::new(0.5, 0.0, 0.0));
            let rebuilt =
                Point3::from(a.coords * bary[0] + b.coords * bary[1] + c.coords * bary[2]);
            assert_relative_eq!(rebuilt, closest);
        }

        let (sq_dist, closest, _) = point_triangle_squared_distance(&p, &a, &a, &a);
        assert_relative_eq!(sq_dist, 1.25);
        assert_eq!(closest, a);
    }

    #[test]
    fn test_point_segment() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(2.0, 0.0);
        let (sq_dist, closest, t) = point_segment_squared_distance(&Point2::new(3.0, 1.0), &a, &b);
        assert_relative_eq!(sq_dist, 2.0);
        assert_eq!(closest, b);
        assert_eq!(t, 1.0);

        assert!(point_on_segment(&Point2::new(0.5, 0.0), &a, &b));
        assert!(!point_on_segment(&Point2::new(0.5, 1e-6), &a, &b));
        assert!(!point_on_segment(&Point2::new(2.5, 0.0), &a, &b));
    }
}
