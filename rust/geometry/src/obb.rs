// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Oriented bounding boxes
//!
//! An [`Obb`] is fitted by trying a handful of candidate "up" directions,
//! projecting onto the perpendicular plane and taking the minimum-area
//! rectangle of the projected convex hull (rotating calipers). The candidate
//! with the smallest box volume wins.
//!
//! Axes are canonicalised so that the same physical box always yields the
//! same frame: each axis points along its largest positive component, axes are
//! ordered by the world axis they are closest to, and the frame is
//! right-handed. An axis-aligned box therefore gets the identity frame.

use crate::csg::Plane;
use crate::mesh::Mesh;
use crate::transform::{frame_from_axes, from_parts};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, SymmetricEigen, Vector2, Vector3};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Fewer points than this cannot define a solid box
pub const MIN_OBB_POINTS: usize = 4;

/// Relative size below which an extent is treated as zero
const EXTENT_EPSILON: f64 = 1e-9;

/// Oriented bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct Obb {
    /// Box center in world coordinates
    pub center: Point3<f64>,
    /// Orthonormal, right-handed axes as matrix columns
    pub axes: Matrix3<f64>,
    /// Full edge lengths along each axis
    pub extents: Vector3<f64>,
}

/// One of the six bounding faces of an [`Obb`]
#[derive(Debug, Clone)]
pub struct ObbFace {
    /// Index of the box axis this face is perpendicular to
    pub axis_index: usize,
    /// Corners ordered (-,-), (+,-), (+,+), (-,+) over `u` and `v`
    pub corners: [Point3<f64>; 4],
    /// In-plane unit vectors (the two other box axes)
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    /// Plane through the face with the box axis as normal
    pub plane: Plane,
}

impl ObbFace {
    /// Rectangle area from two adjacent edges.
    ///
    /// Corners come from the box frame, so the edges are perpendicular by
    /// construction even for nearly coincident boxes.
    pub fn area(&self) -> f64 {
        let e1 = self.corners[1] - self.corners[0];
        let e2 = self.corners[3] - self.corners[0];
        debug_assert!(
            e1.dot(&e2).abs() <= 1e-6 * (e1.norm() * e2.norm()).max(1e-12),
            "face edges are not perpendicular"
        );
        e1.norm() * e2.norm()
    }

    /// Coordinates of `p` in this face's (u, v) basis, relative to corner 0
    #[inline]
    pub fn to_local_2d(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.corners[0];
        Point2::new(d.dot(&self.u), d.dot(&self.v))
    }

    /// Polygon of this face in its own 2D basis
    pub fn local_polygon(&self) -> [Point2<f64>; 4] {
        self.corners.map(|c| self.to_local_2d(&c))
    }
}

impl Obb {
    /// Fit a box to a point set.
    ///
    /// Candidates are the three principal directions of the point covariance.
    /// Returns `None` for fewer than [`MIN_OBB_POINTS`] points, non-finite
    /// coordinates, or a box with a vanishing extent.
    pub fn from_points(points: &[Point3<f64>]) -> Option<Obb> {
        if !usable(points) {
            return None;
        }
        let (_, pca) = principal_axes(points)?;
        let candidates: Vec<Vector3<f64>> = pca.column_iter().map(|c| c.into_owned()).collect();
        best_box(points, &candidates)
    }

    /// Fit a box to a mesh.
    ///
    /// Candidates are the distinct face normals (up to sign) followed by the
    /// principal directions of the vertices; for the primitive solids this
    /// always contains the true box orientation.
    pub fn from_mesh(mesh: &Mesh) -> Option<Obb> {
        let points: Vec<Point3<f64>> = mesh.vertices().collect();
        if !usable(&points) {
            return None;
        }

        let mut seen = FxHashSet::default();
        let mut candidates = Vec::new();
        for [a, b, c] in mesh.triangles() {
            let Some(n) = (b - a).cross(&(c - a)).try_normalize(1e-14) else {
                continue;
            };
            let n = canonical_sign(n);
            let key = (
                (n.x * 1e6).round() as i64,
                (n.y * 1e6).round() as i64,
                (n.z * 1e6).round() as i64,
            );
            if seen.insert(key) {
                candidates.push(n);
            }
        }
        if let Some((_, pca)) = principal_axes(&points) {
            candidates.extend(pca.column_iter().map(|c| c.into_owned()));
        }

        best_box(&points, &candidates)
    }

    /// Unit axis `k`
    #[inline]
    pub fn axis(&self, k: usize) -> Vector3<f64> {
        self.axes.column(k).into_owned()
    }

    /// Box volume
    pub fn volume(&self) -> f64 {
        self.extents.x * self.extents.y * self.extents.z
    }

    /// Box frame as a rigid transform (axes + center)
    pub fn frame(&self) -> Matrix4<f64> {
        from_parts(&self.axes, &self.center.coords)
    }

    /// The eight corners
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let h = self.extents * 0.5;
        let mut out = [self.center; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner += self.axis(0) * (sx * h.x) + self.axis(1) * (sy * h.y) + self.axis(2) * (sz * h.z);
        }
        out
    }

    /// Bounding faces, two per axis: `[-x, +x, -y, +y, -z, +z]`
    pub fn faces(&self) -> [ObbFace; 6] {
        let h = self.extents * 0.5;
        std::array::from_fn(|i| {
            let k = i / 2;
            let sign = if i % 2 == 0 { -1.0 } else { 1.0 };
            let (ui, vi) = ((k + 1) % 3, (k + 2) % 3);
            let axis = self.axis(k);
            let (u, v) = (self.axis(ui), self.axis(vi));
            let face_center = self.center + axis * (sign * h[k]);

            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .map(|(su, sv)| face_center + u * (su * h[ui]) + v * (sv * h[vi]));

            ObbFace {
                axis_index: k,
                corners,
                u,
                v,
                plane: Plane::new(corners[0], axis),
            }
        })
    }

    /// Pairs `(i, j)` of this box's axis `i` and `other`'s axis `j` that are
    /// parallel within `threshold` (absolute cosine).
    ///
    /// For each axis of `self` only the first matching axis of `other` is
    /// kept.
    pub fn matched_axes(&self, other: &Obb, threshold: f64) -> SmallVec<[(usize, usize); 3]> {
        let mut pairs = SmallVec::new();
        for i in 0..3 {
            let a = self.axis(i);
            for j in 0..3 {
                if a.dot(&other.axis(j)).abs() >= threshold {
                    pairs.push((i, j));
                    break;
                }
            }
        }
        pairs
    }
}

fn usable(points: &[Point3<f64>]) -> bool {
    points.len() >= MIN_OBB_POINTS
        && points
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
}

/// Mean and covariance eigenvectors (columns) of a point set
pub fn principal_axes(points: &[Point3<f64>]) -> Option<(Point3<f64>, Matrix3<f64>)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;

    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p.coords - mean;
        cov += d * d.transpose();
    }
    cov /= n;

    let eigen = SymmetricEigen::new(cov);
    let axes = eigen.eigenvectors;
    if axes.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some((Point3::from(mean), axes))
}

struct Candidate {
    obb: Obb,
    volume: f64,
}

fn best_box(points: &[Point3<f64>], normals: &[Vector3<f64>]) -> Option<Obb> {
    let mut best: Option<Candidate> = None;
    for n in normals {
        let Some(candidate) = box_with_normal(points, n) else {
            continue;
        };
        let better = match &best {
            Some(b) => candidate.volume < b.volume * (1.0 - 1e-9),
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }

    let obb = canonicalize(best?.obb);
    let scale = obb.extents.max().max(1.0);
    if obb.extents.iter().any(|e| *e <= EXTENT_EPSILON * scale) {
        return None;
    }
    Some(obb)
}

/// Tightest box whose third axis is `normal`
fn box_with_normal(points: &[Point3<f64>], normal: &Vector3<f64>) -> Option<Candidate> {
    let basis = frame_from_axes(normal, &Vector3::x())?;
    let (u, v, n) = (
        basis.column(0).into_owned(),
        basis.column(1).into_owned(),
        basis.column(2).into_owned(),
    );

    let projected: Vec<Point2<f64>> = points
        .iter()
        .map(|p| Point2::new(p.coords.dot(&u), p.coords.dot(&v)))
        .collect();
    let hull = convex_hull(&projected);
    let rect = min_area_rect(&hull)?;

    let (n_min, n_max) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        let d = p.coords.dot(&n);
        (lo.min(d), hi.max(d))
    });

    let e1 = u * rect.dir.x + v * rect.dir.y;
    let e2 = u * rect.perp.x + v * rect.perp.y;
    let center = e1 * (0.5 * (rect.d_min + rect.d_max))
        + e2 * (0.5 * (rect.p_min + rect.p_max))
        + n * (0.5 * (n_min + n_max));
    let extents = Vector3::new(rect.d_max - rect.d_min, rect.p_max - rect.p_min, n_max - n_min);

    Some(Candidate {
        volume: extents.x * extents.y * extents.z,
        obb: Obb {
            center: Point3::from(center),
            axes: Matrix3::from_columns(&[e1, e2, n]),
            extents,
        },
    })
}

struct Rect2 {
    dir: Vector2<f64>,
    perp: Vector2<f64>,
    d_min: f64,
    d_max: f64,
    p_min: f64,
    p_max: f64,
}

/// Minimum-area enclosing rectangle of a convex polygon (rotating calipers)
fn min_area_rect(hull: &[Point2<f64>]) -> Option<Rect2> {
    if hull.len() < 2 {
        return None;
    }

    let mut best: Option<(f64, Rect2)> = None;
    for i in 0..hull.len() {
        let j = (i + 1) % hull.len();
        let Some(dir) = (hull[j] - hull[i]).try_normalize(1e-14) else {
            continue;
        };
        let perp = Vector2::new(-dir.y, dir.x);

        let mut rect = Rect2 {
            dir,
            perp,
            d_min: f64::MAX,
            d_max: f64::MIN,
            p_min: f64::MAX,
            p_max: f64::MIN,
        };
        for p in hull {
            let d = p.coords.dot(&dir);
            let q = p.coords.dot(&perp);
            rect.d_min = rect.d_min.min(d);
            rect.d_max = rect.d_max.max(d);
            rect.p_min = rect.p_min.min(q);
            rect.p_max = rect.p_max.max(q);
        }

        let area = (rect.d_max - rect.d_min) * (rect.p_max - rect.p_min);
        let better = match &best {
            Some((best_area, _)) => area < best_area * (1.0 - 1e-12),
            None => true,
        };
        if better {
            best = Some((area, rect));
        }
    }
    best.map(|(_, rect)| rect)
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, no repeats
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(pts.len() * 2);
    for p in &pts {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

/// Flip a direction so its largest-magnitude component is positive
fn canonical_sign(v: Vector3<f64>) -> Vector3<f64> {
    if v[v.iamax()] < 0.0 {
        -v
    } else {
        v
    }
}

const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

fn canonicalize(obb: Obb) -> Obb {
    let axes: [Vector3<f64>; 3] =
        std::array::from_fn(|k| canonical_sign(obb.axes.column(k).into_owned()));

    // Slot k receives the box axis best aligned with world axis k
    let mut best = PERMUTATIONS[0];
    let mut best_score = f64::MIN;
    for perm in PERMUTATIONS {
        let score: f64 = (0..3).map(|k| axes[perm[k]][k].abs()).sum();
        if score > best_score + 1e-12 {
            best_score = score;
            best = perm;
        }
    }

    let mut columns = best.map(|k| axes[k]);
    let extents = Vector3::new(obb.extents[best[0]], obb.extents[best[1]], obb.extents[best[2]]);
    if columns[0].cross(&columns[1]).dot(&columns[2]) < 0.0 {
        // Flip the axis whose sign was least clear-cut
        let weakest = (0..3)
            .min_by(|&a, &b| columns[a].amax().total_cmp(&columns[b].amax()))
            .unwrap_or(2);
        columns[weakest] = -columns[weakest];
    }

    Obb {
        center: obb.center,
        axes: Matrix3::from_columns(&columns),
        extents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{make_box, make_cylinder};
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    #[test]
    fn test_axis_aligned_box_gets_identity_frame() {
        let mesh = make_box(Vector3::new(2.0, 1.0, 0.5))
            .transformed(&Matrix4::new_translation(&Vector3::new(1.0, -2.0, 3.0)));
        let obb = Obb::from_mesh(&mesh).unwrap();
        assert_relative_eq!(obb.axes, Matrix3::identity(), epsilon = 1e-9);
        assert_relative_eq!(obb.extents, Vector3::new(2.0, 1.0, 0.5), epsilon = 1e-9);
        assert_relative_eq!(obb.center, Point3::new(1.0, -2.0, 3.0), epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_box_recovers_extents() {
        let rot = Rotation3::from_euler_angles(0.3, -0.2, 0.9).into_inner();
        let mesh = make_box(Vector3::new(3.0, 1.0, 0.4)).transformed(&from_parts(&rot, &Vector3::zeros()));
        let obb = Obb::from_mesh(&mesh).unwrap();
        assert_relative_eq!(obb.volume(), 1.2, epsilon = 1e-9);
        let mut sorted: Vec<f64> = obb.extents.iter().cloned().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(sorted[0], 0.4, epsilon = 1e-9);
        assert_relative_eq!(sorted[2], 3.0, epsilon = 1e-9);
        assert_relative_eq!(obb.axes.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_point_cloud_box() {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..3 {
                    points.push(Point3::new(i as f64 * 0.5, j as f64 * 0.25, k as f64 * 0.1));
                }
            }
        }
        let obb = Obb::from_points(&points).unwrap();
        assert_relative_eq!(obb.volume(), 2.0 * 1.0 * 0.2, epsilon = 1e-9);
        assert_relative_eq!(obb.center, Point3::new(1.0, 0.5, 0.1), epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        let three = [Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        assert!(Obb::from_points(&three).is_none());

        let planar = [
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        assert!(Obb::from_points(&planar).is_none());

        let with_nan = [
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, f64::NAN),
        ];
        assert!(Obb::from_points(&with_nan).is_none());
    }

    #[test]
    fn test_faces() {
        let obb = Obb::from_mesh(&make_box(Vector3::new(1.0, 2.0, 3.0))).unwrap();
        let faces = obb.faces();
        assert_relative_eq!(faces[0].area(), 6.0, epsilon = 1e-9);
        assert_relative_eq!(faces[3].area(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(faces[5].area(), 2.0, epsilon = 1e-9);
        // +z face sits at z = 1.5, plane normal is the box axis
        assert_relative_eq!(faces[5].plane.signed_distance(&Point3::new(0.0, 0.0, 1.5)), 0.0, epsilon = 1e-9);
        assert_relative_eq!(faces[5].plane.normal, Vector3::z(), epsilon = 1e-9);
        let local = faces[5].local_polygon();
        assert_relative_eq!(local[2], Point2::new(1.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn test_nearly_coincident_faces_stay_rectangular() {
        let a = Obb::from_mesh(&make_box(Vector3::new(1.0, 1.0, 1.0))).unwrap();
        let b = Obb::from_mesh(
            &make_box(Vector3::new(1.0, 1.0, 1.0))
                .transformed(&Matrix4::new_translation(&Vector3::new(1e-6, 0.0, 0.0))),
        )
        .unwrap();
        for face in a.faces().iter().chain(b.faces().iter()) {
            assert_relative_eq!(face.area(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_matched_axes() {
        let a = Obb::from_mesh(&make_box(Vector3::new(1.0, 2.0, 3.0))).unwrap();
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_4).into_inner();
        let b = Obb::from_mesh(
            &make_box(Vector3::new(1.0, 2.0, 3.0)).transformed(&from_parts(&rot, &Vector3::zeros())),
        )
        .unwrap();
        let pairs = a.matched_axes(&b, 0.99);
        assert_eq!(pairs.as_slice(), &[(2, 2)]);

        let same = a.matched_axes(&a, 0.99);
        assert_eq!(same.as_slice(), &[(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_cylinder_long_axis() {
        let obb = Obb::from_mesh(&make_cylinder(0.5, 3.0)).unwrap();
        assert_relative_eq!(obb.extents.z, 3.0, epsilon = 1e-9);
        assert_relative_eq!(obb.axis(2), Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    fn test_convex_hull_square_with_interior() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 0.5),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point2::new(0.5, 0.5)));
    }
}
