//! Convex hull and hull-edge orientation
//!
//! The normalization angle is the mean direction of the hull edges reduced
//! modulo 90 degrees, so the perpendicular walls of a roughly rectangular
//! installation agree. For non-rectangular layouts this is a heuristic:
//! comparably long edges with different directions pull the mean between
//! them, and edges straddling the 0/90 degree wrap average to about 45
//! degrees under arithmetic averaging.
//!
//! The closing edge (last vertex back to the first) is part of the mean, so
//! the angle does not depend on which vertex the hull starts from. Averaging
//! only the open vertex chain gives a slightly different value on irregular
//! hulls.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

/// Hull area below this fraction of the squared extent counts as collinear
const MIN_RELATIVE_AREA: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HullError {
    #[error("convex hull needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("points are collinear or coincident")]
    Collinear,
    #[error("point {0} is not finite")]
    NonFinite(usize),
}

/// How reduced edge angles are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HullAngleAveraging {
    /// Plain mean of the reduced angles
    #[default]
    Arithmetic,
    /// Mean direction of the angles on the 90-degree circle
    Circular,
}

/// Indices of the hull vertices in counter-clockwise order
///
/// Starts at the lowest-x (then lowest-y) point; collinear boundary points
/// are not vertices.
pub fn convex_hull(points: &[(f64, f64)]) -> Result<Vec<usize>, HullError> {
    if points.len() < 3 {
        return Err(HullError::TooFewPoints(points.len()));
    }
    if let Some(i) = points.iter().position(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(HullError::NonFinite(i));
    }

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .0
            .total_cmp(&points[b].0)
            .then(points[a].1.total_cmp(&points[b].1))
    });

    let mut lower: Vec<usize> = Vec::new();
    for &i in &order {
        while lower.len() >= 2 && cross(points, lower[lower.len() - 2], lower[lower.len() - 1], i) <= 0.0 {
            lower.pop();
        }
        lower.push(i);
    }

    let mut upper: Vec<usize> = Vec::new();
    for &i in order.iter().rev() {
        while upper.len() >= 2 && cross(points, upper[upper.len() - 2], upper[upper.len() - 1], i) <= 0.0 {
            upper.pop();
        }
        upper.push(i);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return Err(HullError::Collinear);
    }

    let extent = bounding_extent(points);
    if polygon_area(points, &lower) <= MIN_RELATIVE_AREA * extent * extent {
        return Err(HullError::Collinear);
    }

    Ok(lower)
}

/// Direction of the edge `from -> to`'s reverse, reduced into [0, 90) degrees (radians)
pub fn reduced_edge_angle(from: (f64, f64), to: (f64, f64)) -> f64 {
    let angle = (from.1 - to.1).atan2(from.0 - to.0).rem_euclid(FRAC_PI_2);
    // rem_euclid can round up to the modulus for tiny negative inputs
    if angle >= FRAC_PI_2 {
        0.0
    } else {
        angle
    }
}

/// Normalization angle (radians) over every edge of the closed hull polygon
pub fn hull_angle(points: &[(f64, f64)], hull: &[usize], averaging: HullAngleAveraging) -> f64 {
    let angles: Vec<f64> = hull
        .iter()
        .zip(hull.iter().cycle().skip(1))
        .map(|(&a, &b)| reduced_edge_angle(points[a], points[b]))
        .collect();
    if angles.is_empty() {
        return 0.0;
    }

    match averaging {
        HullAngleAveraging::Arithmetic => angles.iter().sum::<f64>() / angles.len() as f64,
        HullAngleAveraging::Circular => {
            let (sin, cos) = angles
                .iter()
                .fold((0.0_f64, 0.0_f64), |(s, c), a| (s + (4.0 * a).sin(), c + (4.0 * a).cos()));
            reduced_quarter(sin.atan2(cos) / 4.0)
        }
    }
}

fn reduced_quarter(angle: f64) -> f64 {
    let angle = angle.rem_euclid(FRAC_PI_2);
    if angle >= FRAC_PI_2 {
        0.0
    } else {
        angle
    }
}

fn cross(points: &[(f64, f64)], o: usize, a: usize, b: usize) -> f64 {
    let (ox, oy) = points[o];
    let (ax, ay) = points[a];
    let (bx, by) = points[b];
    (ax - ox) * (by - oy) - (ay - oy) * (bx - ox)
}

fn polygon_area(points: &[(f64, f64)], polygon: &[usize]) -> f64 {
    let twice: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(&a, &b)| points[a].0 * points[b].1 - points[b].0 * points[a].1)
        .sum();
    twice.abs() / 2.0
}

fn bounding_extent(points: &[(f64, f64)]) -> f64 {
    let (min_x, max_x, min_y, max_y) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
    );
    (max_x - min_x).max(max_y - min_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotated_square(degrees: f64) -> Vec<(f64, f64)> {
        let (s, c) = degrees.to_radians().sin_cos();
        [(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)]
            .iter()
            .map(|&(x, y)| (x * c - y * s, x * s + y * c))
            .collect()
    }

    #[test]
    fn test_square_hull_is_counter_clockwise() {
        let points = vec![(0.0, 0.0), (10.0, 0.0), (5.0, 5.0), (10.0, 10.0), (0.0, 10.0)];
        let hull = convex_hull(&points).unwrap();

        assert_eq!(hull, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_collinear_and_coincident_points_fail() {
        let line = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)];
        assert_eq!(convex_hull(&line), Err(HullError::Collinear));

        let same = vec![(5.0, 5.0); 3];
        assert_eq!(convex_hull(&same), Err(HullError::Collinear));

        assert_eq!(convex_hull(&[(0.0, 0.0), (1.0, 0.0)]), Err(HullError::TooFewPoints(2)));
    }

    #[test]
    fn test_nearly_collinear_points_fail() {
        let sliver = vec![(0.0, 0.0), (1000.0, 1e-7), (2000.0, 0.0)];
        assert_eq!(convex_hull(&sliver), Err(HullError::Collinear));
    }

    #[test]
    fn test_nan_point_is_rejected() {
        let points = vec![(0.0, 0.0), (f64::NAN, 1.0), (2.0, 0.0)];
        assert_eq!(convex_hull(&points), Err(HullError::NonFinite(1)));
    }

    #[test]
    fn test_reduced_edge_angle_wraps_quarter_turn() {
        assert!((reduced_edge_angle((0.0, 0.0), (1.0, 0.0)) - 0.0).abs() < 1e-12);
        let a = reduced_edge_angle((1.0, 1.0), (0.0, 0.0));
        assert!((a - 45f64.to_radians()).abs() < 1e-12);
        let b = reduced_edge_angle((0.0, 0.0), (1.0, 1.0));
        assert!((b - 45f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_rotated_square_angle() {
        for degrees in [10.0, 30.0, 60.0, 80.0] {
            let points = rotated_square(degrees);
            let hull = convex_hull(&points).unwrap();
            let angle = hull_angle(&points, &hull, HullAngleAveraging::Arithmetic);
            assert!((angle.to_degrees() - degrees).abs() < 1e-9, "{} vs {}", angle.to_degrees(), degrees);
        }
    }

    #[test]
    fn test_closing_edge_is_averaged() {
        let points = vec![(0.0, 0.0), (4000.0, 1000.0), (1000.0, 3000.0)];
        let hull = convex_hull(&points).unwrap();
        assert_eq!(hull.len(), 3);

        let all_edges: f64 = (0..3)
            .map(|i| reduced_edge_angle(points[hull[i]], points[hull[(i + 1) % 3]]))
            .sum::<f64>()
            / 3.0;
        let open_chain: f64 = (0..2)
            .map(|i| reduced_edge_angle(points[hull[i]], points[hull[i + 1]]))
            .sum::<f64>()
            / 2.0;

        let angle = hull_angle(&points, &hull, HullAngleAveraging::Arithmetic);
        assert!((angle - all_edges).abs() < 1e-12);
        assert!((angle - open_chain).abs() > 1e-3);

        let rotated_start = vec![hull[1], hull[2], hull[0]];
        let again = hull_angle(&points, &rotated_start, HullAngleAveraging::Arithmetic);
        assert!((again - angle).abs() < 1e-12);
    }

    #[test]
    fn test_circular_averaging_handles_wrap() {
        // Three edges reduce to about 1 degree, one to about 89 degrees
        let points = vec![(0.0, 0.0), (1000.0, 17.45), (1017.45, 1017.2), (-17.45, 1000.0)];
        let hull = convex_hull(&points).unwrap();

        let arithmetic = hull_angle(&points, &hull, HullAngleAveraging::Arithmetic).to_degrees();
        let circular = hull_angle(&points, &hull, HullAngleAveraging::Circular).to_degrees();

        assert!(arithmetic > 10.0 && arithmetic < 80.0);
        assert!(circular < 2.0 || circular > 88.0);
    }
}
