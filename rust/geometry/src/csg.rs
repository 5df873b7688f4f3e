// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG (Constructive Solid Geometry) Operations
//!
//! Solid intersection volume between two closed meshes. Convex inputs (every
//! fitted primitive is convex) are clipped plane by plane, which is exact and
//! cheap. Anything else goes through the csgrs BSP boolean, which is guarded by
//! a triangle budget because its recursion depth grows with polygon count.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::transform::frame_from_axes;
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;

/// Plane definition for clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Point on the plane
    pub point: Point3<f64>,
    /// Normal vector (must be normalized)
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Plane through `point`; `normal` is normalized here
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Signed distance, positive on the side the normal points to
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }

    /// Same plane, opposite orientation
    pub fn flipped(&self) -> Self {
        Self {
            point: self.point,
            normal: -self.normal,
        }
    }
}

/// Planar polygon as an ordered loop of points
pub type Polygon3 = Vec<Point3<f64>>;

/// CSG Clipping Processor
pub struct ClippingProcessor {
    /// Epsilon for floating point comparisons, relative to model size
    pub epsilon: f64,
    /// Combined triangle count above which the BSP path refuses to run
    pub max_csg_triangles: usize,
}

impl ClippingProcessor {
    /// Create a new clipping processor
    pub fn new() -> Self {
        Self {
            epsilon: 1e-9,
            max_csg_triangles: 4096,
        }
    }

    /// Clip a polygon against a plane (Sutherland-Hodgman)
    /// Returns the part of the polygon in front of the plane
    pub fn clip_polygon(&self, polygon: &[Point3<f64>], plane: &Plane, eps: f64) -> Polygon3 {
        let n = polygon.len();
        let mut out = Vec::with_capacity(n + 2);
        if n == 0 {
            return out;
        }

        for i in 0..n {
            let cur = polygon[i];
            let next = polygon[(i + 1) % n];
            let dc = plane.signed_distance(&cur);
            let dn = plane.signed_distance(&next);
            let cur_in = dc >= -eps;
            let next_in = dn >= -eps;

            if cur_in {
                push_distinct(&mut out, cur, eps);
            }
            if cur_in != next_in {
                let t = dc / (dc - dn);
                push_distinct(&mut out, cur + (next - cur) * t, eps);
            }
        }

        if out.len() > 1 && (out[0] - out[out.len() - 1]).norm() <= eps {
            out.pop();
        }
        out
    }

    /// Clip a convex polyhedron (as face polygons) by half-spaces.
    ///
    /// Each plane keeps what lies in front of it; the opening left by each cut
    /// is closed with a cap polygon.
    pub fn clip_convex(&self, mut faces: Vec<Polygon3>, planes: &[Plane], eps: f64) -> Vec<Polygon3> {
        for plane in planes {
            let cuts = faces
                .iter()
                .flatten()
                .any(|p| plane.signed_distance(p) < -eps);
            if !cuts {
                continue;
            }

            let mut clipped = Vec::with_capacity(faces.len() + 1);
            let mut on_plane: Vec<Point3<f64>> = Vec::new();
            for face in &faces {
                let poly = self.clip_polygon(face, plane, eps);
                if poly.len() < 3 {
                    continue;
                }
                for p in &poly {
                    if plane.signed_distance(p).abs() <= eps
                        && !on_plane.iter().any(|q| (q - p).norm() <= eps)
                    {
                        on_plane.push(*p);
                    }
                }
                clipped.push(poly);
            }

            if let Some(cap) = cap_polygon(&on_plane, plane) {
                clipped.push(cap);
            }
            faces = clipped;
            if faces.is_empty() {
                break;
            }
        }
        faces
    }

    /// Volume shared by two closed meshes
    pub fn intersection_volume(&self, a: &Mesh, b: &Mesh) -> Result<f64> {
        if a.triangle_count() == 0 || b.triangle_count() == 0 {
            return Err(Error::EmptyMesh("intersection needs two triangle meshes".into()));
        }

        if a.is_convex(1e-6) && b.is_convex(1e-6) {
            Ok(self.convex_intersection_volume(a, b))
        } else {
            self.csg_intersection_volume(a, b)
        }
    }

    /// Exact intersection volume of two convex meshes
    pub fn convex_intersection_volume(&self, a: &Mesh, b: &Mesh) -> f64 {
        let eps = self.epsilon * model_scale(a, b);
        let faces: Vec<Polygon3> = a.triangles().map(|t| t.to_vec()).collect();
        // Inward-facing planes so "front" is the inside of b
        let planes: Vec<Plane> = face_planes(b).iter().map(Plane::flipped).collect();
        let clipped = self.clip_convex(faces, &planes, eps);
        convex_volume(&clipped)
    }

    /// Intersection volume through the csgrs BSP boolean
    pub fn csg_intersection_volume(&self, a: &Mesh, b: &Mesh) -> Result<f64> {
        use csgrs::traits::CSG;

        let total = a.triangle_count() + b.triangle_count();
        if total > self.max_csg_triangles {
            return Err(Error::BooleanFailed(format!(
                "{total} triangles exceed the CSG budget of {}",
                self.max_csg_triangles
            )));
        }

        let a_csg = Self::mesh_to_csgrs(a)?;
        let b_csg = Self::mesh_to_csgrs(b)?;
        let result = a_csg.intersection(&b_csg);

        // Divergence theorem over fan-triangulated result polygons
        let mut signed = 0.0;
        for polygon in &result.polygons {
            let vertices = &polygon.vertices;
            if vertices.len() < 3 {
                continue;
            }
            let p0 = vertices[0].pos.coords;
            for w in vertices[1..].windows(2) {
                signed += p0.dot(&w[0].pos.coords.cross(&w[1].pos.coords));
            }
        }

        let volume = (signed / 6.0).abs();
        if !volume.is_finite() {
            return Err(Error::BooleanFailed("non-finite intersection volume".into()));
        }
        Ok(volume)
    }

    /// Convert our Mesh format to csgrs Mesh format
    fn mesh_to_csgrs(mesh: &Mesh) -> Result<csgrs::mesh::Mesh<()>> {
        use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CSGMesh};
        use std::sync::OnceLock;

        if mesh.is_empty() {
            return Ok(CSGMesh {
                polygons: Vec::new(),
                bounding_box: OnceLock::new(),
                metadata: None,
            });
        }

        let mut polygons = Vec::with_capacity(mesh.triangle_count());
        for [v0, v1, v2] in mesh.triangles() {
            // Skip degenerate triangles to avoid NaN propagation
            let face_normal = match (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-10) {
                Some(n) => n,
                None => continue,
            };

            let vertices = vec![
                Vertex::new(v0, face_normal),
                Vertex::new(v1, face_normal),
                Vertex::new(v2, face_normal),
            ];
            polygons.push(Polygon::new(vertices, None));
        }

        if polygons.is_empty() {
            return Err(Error::degenerate("mesh has no non-degenerate triangles"));
        }
        Ok(CSGMesh::from_polygons(&polygons, None))
    }
}

impl Default for ClippingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn push_distinct(out: &mut Polygon3, p: Point3<f64>, eps: f64) {
    if out.last().map_or(true, |q| (q - p).norm() > eps) {
        out.push(p);
    }
}

fn model_scale(a: &Mesh, b: &Mesh) -> f64 {
    let (a_min, a_max) = a.bounds();
    let (b_min, b_max) = b.bounds();
    (a_max - a_min).norm().max((b_max - b_min).norm()).max(1.0)
}

/// Distinct outward face planes of a mesh
pub fn face_planes(mesh: &Mesh) -> Vec<Plane> {
    let mut seen = FxHashSet::default();
    let mut planes = Vec::new();
    for [a, b, c] in mesh.triangles() {
        let Some(normal) = (b - a).cross(&(c - a)).try_normalize(1e-14) else {
            continue;
        };
        let offset = normal.dot(&a.coords);
        let key = (
            (normal.x * 1e7).round() as i64,
            (normal.y * 1e7).round() as i64,
            (normal.z * 1e7).round() as i64,
            (offset * 1e7).round() as i64,
        );
        if seen.insert(key) {
            planes.push(Plane::new(a, normal));
        }
    }
    planes
}

/// Polygon through coplanar points, ordered by angle around their centroid
fn cap_polygon(points: &[Point3<f64>], plane: &Plane) -> Option<Polygon3> {
    if points.len() < 3 {
        return None;
    }
    let basis = frame_from_axes(&plane.normal, &Vector3::x())?;
    let (u, v) = (basis.column(0).into_owned(), basis.column(1).into_owned());
    let center = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64;

    let mut keyed: Vec<(f64, Point3<f64>)> = points
        .iter()
        .map(|p| {
            let d = p.coords - center;
            (d.dot(&v).atan2(d.dot(&u)), *p)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    Some(keyed.into_iter().map(|(_, p)| p).collect())
}

/// Area and unit normal of a planar polygon (Newell)
fn polygon_area_normal(polygon: &[Point3<f64>]) -> Option<(f64, Vector3<f64>)> {
    if polygon.len() < 3 {
        return None;
    }
    let p0 = polygon[0];
    let mut sum = Vector3::zeros();
    for w in polygon[1..].windows(2) {
        sum += (w[0] - p0).cross(&(w[1] - p0));
    }
    let twice_area = sum.norm();
    let normal = sum.try_normalize(1e-14)?;
    Some((twice_area * 0.5, normal))
}

/// Volume of a convex polyhedron given as face polygons.
///
/// Sums the pyramids from an interior point to every face; face orientation
/// does not matter.
pub fn convex_volume(faces: &[Polygon3]) -> f64 {
    let count: usize = faces.iter().map(|f| f.len()).sum();
    if faces.len() < 4 || count == 0 {
        return 0.0;
    }
    let interior = faces
        .iter()
        .flatten()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / count as f64;

    faces
        .iter()
        .filter_map(|face| {
            let (area, normal) = polygon_area_normal(face)?;
            let height = (face[0].coords - interior).dot(&normal).abs();
            Some(area * height / 3.0)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{make_box, make_cylinder, make_sphere};
    use nalgebra::Matrix4;

    fn unit_box_at(x: f64, y: f64, z: f64) -> Mesh {
        make_box(Vector3::new(1.0, 1.0, 1.0))
            .transformed(&Matrix4::new_translation(&Vector3::new(x, y, z)))
    }

    #[test]
    fn test_plane_signed_distance() {
        let plane = Plane::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

        assert_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, 5.0)), 5.0);
        assert_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, -5.0)), -5.0);
        assert_eq!(plane.signed_distance(&Point3::new(5.0, 5.0, 0.0)), 0.0);
        assert!(plane.flipped().signed_distance(&Point3::new(0.0, 0.0, 1.0)) < 0.0);
    }

    #[test]
    fn test_clip_polygon_half() {
        let processor = ClippingProcessor::new();
        let square = vec![
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ];
        let plane = Plane::new(Point3::origin(), Vector3::x());
        let clipped = processor.clip_polygon(&square, &plane, 1e-12);
        assert_eq!(clipped.len(), 4);
        let (area, _) = polygon_area_normal(&clipped).unwrap();
        assert!((area - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_polygon_all_behind() {
        let processor = ClippingProcessor::new();
        let triangle = vec![
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            Point3::new(0.5, 1.0, -1.0),
        ];
        let plane = Plane::new(Point3::origin(), Vector3::z());
        assert!(processor.clip_polygon(&triangle, &plane, 1e-12).is_empty());
    }

    #[test]
    fn test_identical_boxes_full_overlap() {
        let processor = ClippingProcessor::new();
        let a = unit_box_at(0.0, 0.0, 0.0);
        let volume = processor.intersection_volume(&a, &a.clone()).unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_boxes() {
        let processor = ClippingProcessor::new();
        let a = unit_box_at(0.0, 0.0, 0.0);
        let b = unit_box_at(0.5, 0.25, 0.0);
        let volume = processor.intersection_volume(&a, &b).unwrap();
        assert!((volume - 0.5 * 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_boxes() {
        let processor = ClippingProcessor::new();
        let volume = processor
            .intersection_volume(&unit_box_at(0.0, 0.0, 0.0), &unit_box_at(3.0, 0.0, 0.0))
            .unwrap();
        assert!(volume.abs() < 1e-12);
    }

    #[test]
    fn test_sphere_inside_box() {
        let processor = ClippingProcessor::new();
        let sphere = make_sphere(0.4);
        let volume = processor
            .intersection_volume(&sphere, &unit_box_at(0.0, 0.0, 0.0))
            .unwrap();
        assert!((volume - sphere.volume()).abs() < 1e-9);
    }

    #[test]
    fn test_cylinder_through_box() {
        let processor = ClippingProcessor::new();
        let cylinder = make_cylinder(0.25, 4.0);
        let volume = processor
            .intersection_volume(&cylinder, &unit_box_at(0.0, 0.0, 0.0))
            .unwrap();
        assert!((volume - cylinder.volume() / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_convex_goes_through_csg() {
        let processor = ClippingProcessor::new();
        let mut pair = unit_box_at(0.0, 0.0, 0.0);
        pair.merge(&unit_box_at(3.0, 0.0, 0.0));
        assert!(!pair.is_convex(1e-6));

        let probe = unit_box_at(0.25, 0.25, 0.25);
        let volume = processor.intersection_volume(&pair, &probe).unwrap();
        assert!((volume - 0.75f64.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn test_csg_budget() {
        let processor = ClippingProcessor {
            max_csg_triangles: 10,
            ..ClippingProcessor::new()
        };
        let mut pair = unit_box_at(0.0, 0.0, 0.0);
        pair.merge(&unit_box_at(3.0, 0.0, 0.0));
        assert!(processor.intersection_volume(&pair, &unit_box_at(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_empty_mesh_is_error() {
        let processor = ClippingProcessor::new();
        assert!(processor
            .intersection_volume(&Mesh::new(), &unit_box_at(0.0, 0.0, 0.0))
            .is_err());
    }
}
