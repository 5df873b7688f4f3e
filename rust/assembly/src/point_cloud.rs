// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segmented part point clouds.

use nalgebra::{Point3, Vector3};
use part2cad_geometry::Obb;
use rustc_hash::FxHashMap;

/// One segmented input point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledPoint {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    /// Semantic object category.
    pub object_id: i64,
    /// Part instance label within the object.
    pub part_id: i64,
}

/// Points of one part instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PartPointCloud {
    points: Vec<Point3<f64>>,
    /// Carried along for collaborators; fitting ignores them.
    normals: Vec<Vector3<f64>>,
    object_id: i64,
    part_id: i64,
}

impl PartPointCloud {
    pub fn new(points: Vec<Point3<f64>>, object_id: i64, part_id: i64) -> Self {
        Self {
            points,
            normals: Vec::new(),
            object_id,
            part_id,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vector3<f64>>) -> Self {
        self.normals = normals;
        self
    }

    /// Group labelled points by `(object_id, part_id)`, in first-seen order.
    pub fn from_labeled_points(points: &[LabeledPoint]) -> Vec<PartPointCloud> {
        let mut index: FxHashMap<(i64, i64), usize> = FxHashMap::default();
        let mut clouds: Vec<PartPointCloud> = Vec::new();
        for p in points {
            let slot = *index.entry((p.object_id, p.part_id)).or_insert_with(|| {
                clouds.push(PartPointCloud::new(Vec::new(), p.object_id, p.part_id));
                clouds.len() - 1
            });
            clouds[slot].points.push(p.position);
            clouds[slot].normals.push(p.normal);
        }
        clouds
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn normals(&self) -> &[Vector3<f64>] {
        &self.normals
    }

    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    pub fn part_id(&self) -> i64 {
        self.part_id
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oriented bounding box, if the points span a volume
    pub fn obb(&self) -> Option<Obb> {
        Obb::from_points(&self.points)
    }

    /// Full OBB edge lengths
    pub fn obb_extents(&self) -> Option<Vector3<f64>> {
        self.obb().map(|b| b.extents)
    }
}
