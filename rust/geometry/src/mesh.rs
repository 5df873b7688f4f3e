// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point3, Vector3};

/// Color given to vertices that carry none when colored and plain meshes merge
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Triangle mesh
///
/// Positions and normals are stored flat (x, y, z triples) in f64; fitting and
/// contact scoring compare faces at millimetre tolerances, which f32 storage
/// would eat into once meshes are posed far from the origin.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
    /// Per-vertex RGBA; empty for uncolored meshes
    pub colors: Vec<[u8; 4]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Empty mesh with room for `vertex_count` vertices and `index_count` indices
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
            colors: Vec::new(),
        }
    }

    /// Attach one RGB color in `[0, 1]` per vertex, stored as opaque 8-bit RGBA.
    ///
    /// Channels are clamped and truncated, so 0.5 becomes 127.
    pub fn with_colors(mut self, colors: &[[f64; 3]]) -> Result<Self> {
        if colors.len() != self.vertex_count() {
            return Err(Error::degenerate(format!(
                "{} colors for {} vertices",
                colors.len(),
                self.vertex_count()
            )));
        }
        self.colors = colors
            .iter()
            .map(|rgb| {
                let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
                [r, g, b, 255]
            })
            .collect();
        Ok(self)
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Triangle-less mesh carrying only points (point cloud payload)
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let mut mesh = Self::with_capacity(points.len(), 0);
        for p in points {
            mesh.add_vertex(*p, Vector3::zeros());
        }
        mesh
    }

    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.extend_from_slice(position.coords.as_slice());
        self.normals.extend_from_slice(normal.as_slice());
    }

    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    /// Append `other`, re-indexing its triangles
    pub fn merge(&mut self, other: &Mesh) {
        let base = self.vertex_count() as u32;
        if self.has_colors() || other.has_colors() {
            self.colors.resize(self.vertex_count(), WHITE);
            if other.has_colors() {
                self.colors.extend_from_slice(&other.colors);
            } else {
                self.colors.resize(self.vertex_count() + other.vertex_count(), WHITE);
            }
        }
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|&i| i + base));
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of vertex `i`
    #[inline]
    pub fn vertex(&self, i: usize) -> Point3<f64> {
        Point3::new(
            self.positions[i * 3],
            self.positions[i * 3 + 1],
            self.positions[i * 3 + 2],
        )
    }

    /// Iterate over vertex positions
    pub fn vertices(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
    }

    /// Iterate over triangles as vertex triples
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |t| {
            [
                self.vertex(t[0] as usize),
                self.vertex(t[1] as usize),
                self.vertex(t[2] as usize),
            ]
        })
    }

    /// Axis-aligned bounds `(min, max)`; the origin twice for an empty mesh
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let mut vertices = self.vertices();
        let Some(first) = vertices.next() else {
            return (Point3::origin(), Point3::origin());
        };
        vertices.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p)))
    }

    /// Axis-aligned extents in the mesh's own frame
    pub fn extents(&self) -> Vector3<f64> {
        let (min, max) = self.bounds();
        max - min
    }

    /// Center of the axis-aligned bounds
    pub fn bounds_center(&self) -> Point3<f64> {
        let (min, max) = self.bounds();
        nalgebra::center(&min, &max)
    }

    /// Apply a homogeneous transform in place.
    ///
    /// Normals are transformed by the inverse transpose of the linear block so
    /// they stay perpendicular under non-uniform scale.
    pub fn apply_transform(&mut self, tf: &Matrix4<f64>) {
        let linear = tf.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or(linear);

        for chunk in self.positions.chunks_exact_mut(3) {
            let p = tf.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
            chunk.copy_from_slice(&[p.x, p.y, p.z]);
        }
        for chunk in self.normals.chunks_exact_mut(3) {
            let n = normal_matrix * Vector3::new(chunk[0], chunk[1], chunk[2]);
            let n = n.try_normalize(1e-12).unwrap_or(n);
            chunk.copy_from_slice(&[n.x, n.y, n.z]);
        }
    }

    /// Copy of the mesh posed by `tf`
    pub fn transformed(&self, tf: &Matrix4<f64>) -> Mesh {
        let mut mesh = self.clone();
        mesh.apply_transform(tf);
        mesh
    }

    /// Enclosed volume via the divergence theorem.
    ///
    /// Only meaningful for closed, consistently wound meshes; the absolute
    /// value is returned so inward winding does not flip the sign.
    pub fn volume(&self) -> f64 {
        let signed: f64 = self
            .triangles()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)))
            .sum();
        (signed / 6.0).abs()
    }

    /// Check convexity: every vertex lies behind (or on) every face plane.
    ///
    /// `tolerance` is relative to the bounding-box diagonal.
    pub fn is_convex(&self, tolerance: f64) -> bool {
        if self.triangle_count() < 4 {
            return false;
        }
        let (min, max) = self.bounds();
        let eps = tolerance * (max - min).norm().max(1e-12);

        for [a, b, c] in self.triangles() {
            let normal = match (b - a).cross(&(c - a)).try_normalize(1e-14) {
                Some(n) => n,
                None => continue,
            };
            if self.vertices().any(|p| (p - a).dot(&normal) > eps) {
                return false;
            }
        }
        true
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::make_box;

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.triangle_count(), 0);
        assert_eq!(mesh.bounds(), (Point3::origin(), Point3::origin()));
        assert_eq!(mesh.volume(), 0.0);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut mesh = make_box(Vector3::new(1.0, 1.0, 1.0));
        let other = make_box(Vector3::new(1.0, 1.0, 1.0));
        let (n, t) = (mesh.vertex_count(), mesh.triangle_count());
        mesh.merge(&other);
        assert_eq!(mesh.vertex_count(), 2 * n);
        assert_eq!(mesh.triangle_count(), 2 * t);
        assert_eq!(mesh.indices[3 * t], other.indices[0] + n as u32);
    }

    #[test]
    fn test_box_volume_and_extents() {
        let mesh = make_box(Vector3::new(1.0, 2.0, 3.0));
        assert!((mesh.volume() - 6.0).abs() < 1e-10);
        assert!((mesh.extents() - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(mesh.is_convex(1e-9));
    }

    #[test]
    fn test_transform_moves_bounds() {
        let mesh = make_box(Vector3::new(1.0, 1.0, 1.0));
        let tf = Matrix4::new_translation(&Vector3::new(2.0, 0.0, -1.0));
        let moved = mesh.transformed(&tf);
        let center = moved.bounds_center();
        assert!((center - Point3::new(2.0, 0.0, -1.0)).norm() < 1e-12);
        assert!((moved.volume() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_scaling_transform_scales_volume() {
        let mesh = make_box(Vector3::new(1.0, 1.0, 1.0));
        let grown = mesh.transformed(&Matrix4::new_scaling(2.0));
        assert!((grown.volume() - 8.0).abs() < 1e-10);
        assert!((grown.extents() - Vector3::new(2.0, 2.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_merged_boxes_are_not_convex() {
        let mut mesh = make_box(Vector3::new(1.0, 1.0, 1.0));
        let other = make_box(Vector3::new(1.0, 1.0, 1.0))
            .transformed(&Matrix4::new_translation(&Vector3::new(3.0, 0.0, 0.0)));
        mesh.merge(&other);
        assert!(!mesh.is_convex(1e-9));
    }

    #[test]
    fn test_from_points_has_no_triangles() {
        let mesh = Mesh::from_points(&[Point3::origin(), Point3::new(1.0, 0.0, 0.0)]);
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(!mesh.has_colors());
    }

    #[test]
    fn test_point_colors_are_quantised() {
        let points = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let mesh = Mesh::from_points(&points)
            .with_colors(&[[1.0, 0.5, 0.0], [0.2, 1.5, -0.1]])
            .unwrap();
        assert_eq!(mesh.colors, vec![[255, 127, 0, 255], [51, 255, 0, 255]]);

        let moved = mesh.transformed(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1.0)));
        assert_eq!(moved.colors, mesh.colors);

        assert!(Mesh::from_points(&points).with_colors(&[[0.0; 3]]).is_err());
    }

    #[test]
    fn test_merge_pads_missing_colors() {
        let colored = Mesh::from_points(&[Point3::origin()])
            .with_colors(&[[0.0, 0.0, 0.0]])
            .unwrap();
        let mut mesh = make_box(Vector3::new(1.0, 1.0, 1.0));
        let n = mesh.vertex_count();
        mesh.merge(&colored);
        assert_eq!(mesh.colors.len(), n + 1);
        assert_eq!(mesh.colors[0], WHITE);
        assert_eq!(mesh.colors[n], [0, 0, 0, 255]);
    }
}
