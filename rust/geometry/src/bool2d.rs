// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations for Face Overlap
//!
//! Contact scoring projects one bounding face onto the plane of another and
//! needs the area they share. The overlay itself is done with the i_overlay
//! crate; this module handles winding, validation and area bookkeeping.

use crate::error::{Error, Result};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Polygons with less area than this are treated as flat
const MIN_AREA: f64 = 1e-12;

/// Area of the intersection of two simple polygons.
///
/// Either winding is accepted. Degenerate (zero-area) inputs give zero rather
/// than an error, since touching-but-flat faces are a legitimate case for the
/// contact scorer; fewer than three vertices is an error.
pub fn intersection_area(a: &[Point2<f64>], b: &[Point2<f64>]) -> Result<f64> {
    if a.len() < 3 || b.len() < 3 {
        return Err(Error::degenerate("polygon must have at least 3 vertices"));
    }

    let subject = ccw_path(a);
    let clip = ccw_path(b);
    if subject.is_none() || clip.is_none() || !boxes_touch(a, b) {
        return Ok(0.0);
    }

    let subject: Vec<Vec<[f64; 2]>> = subject.into_iter().collect();
    let clip: Vec<Vec<[f64; 2]>> = clip.into_iter().collect();
    // One entry per shape: outer contour first, then holes
    let shapes = subject.overlay(&clip, OverlayRule::Intersect, FillRule::EvenOdd);

    let area: f64 = shapes
        .iter()
        .map(|shape| {
            let mut contours = shape.iter().map(|c| signed_area(c).abs());
            let outer = contours.next().unwrap_or(0.0);
            outer - contours.sum::<f64>()
        })
        .sum();
    Ok(area.max(0.0))
}

/// Shoelace area, positive for counter-clockwise paths
fn signed_area(path: &[[f64; 2]]) -> f64 {
    let n = path.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (p, q) = (path[i], path[(i + 1) % n]);
            p[0] * q[1] - q[0] * p[1]
        })
        .sum();
    twice * 0.5
}

/// Counter-clockwise i_overlay path, or `None` for a flat polygon
fn ccw_path(polygon: &[Point2<f64>]) -> Option<Vec<[f64; 2]>> {
    let mut path: Vec<[f64; 2]> = polygon.iter().map(|p| [p.x, p.y]).collect();
    let area = signed_area(&path);
    if area.abs() <= MIN_AREA {
        return None;
    }
    if area < 0.0 {
        path.reverse();
    }
    Some(path)
}

fn boxes_touch(a: &[Point2<f64>], b: &[Point2<f64>]) -> bool {
    let bounds = |poly: &[Point2<f64>]| {
        poly.iter().fold(
            ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]),
            |(lo, hi), p| ([lo[0].min(p.x), lo[1].min(p.y)], [hi[0].max(p.x), hi[1].max(p.y)]),
        )
    };
    let (a_lo, a_hi) = bounds(a);
    let (b_lo, b_hi) = bounds(b);
    (0..2).all(|k| a_lo[k] <= b_hi[k] && b_lo[k] <= a_hi[k])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_signed_area_follows_winding() {
        let ccw = ccw_path(&square(0.0, 0.0, 10.0)).unwrap();
        assert!((signed_area(&ccw) - 100.0).abs() < 1e-9);

        let cw: Vec<_> = square(0.0, 0.0, 10.0).into_iter().rev().collect();
        let path: Vec<[f64; 2]> = cw.iter().map(|p| [p.x, p.y]).collect();
        assert!((signed_area(&path) + 100.0).abs() < 1e-9);
        assert!(signed_area(&ccw_path(&cw).unwrap()) > 0.0);
    }

    #[test]
    fn test_intersection_partial_overlap() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 1.0, 2.0);
        let area = intersection_area(&a, &b).unwrap();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_identical_mixed_winding() {
        let a = square(-0.5, -0.5, 1.0);
        let b: Vec<_> = a.iter().rev().cloned().collect();
        let area = intersection_area(&a, &b).unwrap();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_contained() {
        let outer = square(0.0, 0.0, 4.0);
        let inner = square(1.0, 1.0, 1.0);
        assert!((intersection_area(&outer, &inner).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(5.0, 5.0, 1.0);
        assert_eq!(intersection_area(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_intersection_degenerate_inputs() {
        let a = square(0.0, 0.0, 1.0);
        let flat = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert_eq!(intersection_area(&a, &flat).unwrap(), 0.0);
        assert!(intersection_area(&a, &flat[..2]).is_err());
    }

    #[test]
    fn test_boxes_touch() {
        let a = square(0.0, 0.0, 10.0);
        assert!(boxes_touch(&a, &square(5.0, 5.0, 10.0)));
        assert!(boxes_touch(&a, &square(10.0, 0.0, 1.0)));
        assert!(!boxes_touch(&a, &square(20.0, 20.0, 10.0)));
    }
}
