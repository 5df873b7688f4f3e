// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contact scoring between posed parts
//!
//! The score is directional: `score_ab` says how much of B is supported by
//! A, `score_ba` the reverse. Evidence is taken from, in order:
//!
//! 1. Face contact. Nearly parallel OBB axes whose closest bounding faces
//!    lie within a distance threshold; the overlap of A's face projected onto
//!    B's face, as a fraction of each face's area.
//! 2. Volume overlap. Shared volume over each mesh's own volume.
//! 3. Proximity. Negative distance between the box centers, the same in
//!    both directions.

use nalgebra::{Matrix4, Point2, Point3};
use part2cad_geometry::{intersection_area, ClippingProcessor, Mesh, Obb, ObbFace};

use crate::config::AssemblyConfig;
use crate::state::{PartState, PosedPart};

/// Ratios at or below this count as "no overlap".
const ZERO_TOLERANCE: f64 = 1e-8;

/// Directional support scores between part pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactScorer {
    /// Minimum |cos| between two axes for their faces to be compared
    pub angle_threshold: f64,
    /// Maximum mean distance between two faces in contact
    pub distance_threshold: f64,
}

impl Default for ContactScorer {
    fn default() -> Self {
        Self::new(&AssemblyConfig::default())
    }
}

impl ContactScorer {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            angle_threshold: config.contact_angle_threshold,
            distance_threshold: config.contact_distance_threshold,
        }
    }

    /// Score two meshes under their world transforms.
    pub fn score(
        &self,
        mesh_a: &Mesh,
        transform_a: &Matrix4<f64>,
        mesh_b: &Mesh,
        transform_b: &Matrix4<f64>,
    ) -> (f64, f64) {
        self.score_posed(
            &PosedPart::new(mesh_a, transform_a),
            &PosedPart::new(mesh_b, transform_b),
        )
    }

    pub fn score_states(&self, a: &PartState, b: &PartState) -> (f64, f64) {
        self.score_posed(&PosedPart::from_state(a), &PosedPart::from_state(b))
    }

    /// Score two parts that are already in world coordinates.
    pub fn score_posed(&self, a: &PosedPart, b: &PosedPart) -> (f64, f64) {
        if let (Some(obb_a), Some(obb_b)) = (&a.obb, &b.obb) {
            if let Some(ratios) = self.face_contact(obb_a, obb_b) {
                return ratios;
            }
        }

        let (ab, ba) = self.volume_ratios(&a.mesh, &b.mesh);
        if ab.abs() > ZERO_TOLERANCE || ba.abs() > ZERO_TOLERANCE {
            return (ab, ba);
        }

        let distance = -(center(a) - center(b)).norm();
        (distance, distance)
    }

    /// Best face-contact ratios over all parallel axis pairs, or `None` when
    /// no pair of faces is close enough.
    ///
    /// For each axis of `a` only the first accepted axis of `b` counts.
    pub fn face_contact(&self, a: &Obb, b: &Obb) -> Option<(f64, f64)> {
        let faces_a = a.faces();
        let faces_b = b.faces();

        let mut best: Option<(f64, f64)> = None;
        for i in 0..3 {
            for j in 0..3 {
                if a.axis(i).dot(&b.axis(j)).abs() < self.angle_threshold {
                    continue;
                }

                // Closest of the four face pairings along these axes
                let mut closest: Option<(&ObbFace, &ObbFace, f64)> = None;
                for face_a in &faces_a[2 * i..2 * i + 2] {
                    for face_b in &faces_b[2 * j..2 * j + 2] {
                        let d = face_distance(face_a, face_b);
                        if closest.map_or(true, |(_, _, best_d)| d < best_d) {
                            closest = Some((face_a, face_b, d));
                        }
                    }
                }
                let Some((face_a, face_b, d)) = closest else {
                    continue;
                };
                if d > self.distance_threshold {
                    continue;
                }

                let (ab, ba) = face_ratios(face_a, face_b);
                best = Some(match best {
                    Some((max_ab, max_ba)) => (max_ab.max(ab), max_ba.max(ba)),
                    None => (ab, ba),
                });
                break;
            }
        }
        best
    }

    /// Shared volume over `b`'s and `a`'s own volume; zero when the boolean
    /// fails.
    pub fn volume_ratios(&self, a: &Mesh, b: &Mesh) -> (f64, f64) {
        let shared = match ClippingProcessor::new().intersection_volume(a, b) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "Volume intersection failed, scoring as zero");
                return (0.0, 0.0);
            }
        };
        (ratio(shared, b.volume()), ratio(shared, a.volume()))
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 && whole.is_finite() {
        part / whole
    } else {
        0.0
    }
}

fn center(part: &PosedPart) -> Point3<f64> {
    part.obb
        .as_ref()
        .map_or_else(|| part.mesh.bounds_center(), |obb| obb.center)
}

/// Mean unsigned distance of `a`'s corners to `b`'s plane
fn face_distance(a: &ObbFace, b: &ObbFace) -> f64 {
    a.corners
        .iter()
        .map(|c| b.plane.signed_distance(c).abs())
        .sum::<f64>()
        / 4.0
}

/// `(overlap / area_b, overlap / area_a)` with `a` projected onto `b`'s plane
fn face_ratios(a: &ObbFace, b: &ObbFace) -> (f64, f64) {
    // Projection onto b's plane drops the normal component, which the (u, v)
    // coordinates ignore anyway
    let projected: Vec<Point2<f64>> = a.corners.iter().map(|c| b.to_local_2d(c)).collect();
    let overlap = match intersection_area(&b.local_polygon(), &projected) {
        Ok(area) => area,
        Err(e) => {
            tracing::debug!(error = %e, "Face overlap failed");
            0.0
        }
    };
    (ratio(overlap, b.area()), ratio(overlap, a.area()))
}
