// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive fitting
//!
//! Every part cloud is matched against five primitive candidates sized from
//! its oriented bounding box: box, sphere, cylinder, capsule and cone. Each
//! candidate is registered onto the points with ICP (rigid motion plus
//! uniform scale) and the lowest residual wins.

use nalgebra::{Matrix4, Vector3};
use part2cad_geometry::registration::initial_alignments;
use part2cad_geometry::transform::{force_proper_rotation, split_scale};
use part2cad_geometry::{register, Mesh, Primitive, RegistrationConfig};

use crate::config::{AssemblyConfig, MIN_PART_POINTS};
use crate::point_cloud::PartPointCloud;
use crate::state::{PartMeta, PartState};

/// Winning candidate for one part.
#[derive(Debug, Clone)]
pub struct PrimitiveFit {
    pub primitive: Primitive,
    /// Candidate mesh in its canonical frame
    pub mesh: Mesh,
    /// Proper rigid transform onto the points
    pub transform: Matrix4<f64>,
    pub scale: f64,
    pub cost: f64,
}

impl PrimitiveFit {
    pub fn into_state(self, cloud: &PartPointCloud) -> PartState {
        PartState {
            mesh: self.mesh,
            transform: self.transform,
            meta: PartMeta {
                object_id: cloud.object_id(),
                part_id: cloud.part_id(),
                scale: self.scale,
                cost: self.cost,
                primitive: self.primitive,
            },
        }
    }
}

/// Fits primitive solids to part point clouds.
#[derive(Debug, Clone)]
pub struct PrimitiveFitter {
    registration: RegistrationConfig,
    cone_height_trim: f64,
}

impl PrimitiveFitter {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            registration: config.registration.clone(),
            cone_height_trim: config.cone_height_trim,
        }
    }

    /// Candidate primitives for a box of the given full extents.
    ///
    /// The cone is left out when the trim would leave it without height.
    pub fn candidates(&self, extents: &Vector3<f64>) -> Vec<Primitive> {
        let radius = extents.min() / 2.0;
        let length = extents.max();
        let mut out = vec![
            Primitive::Box { extents: *extents },
            Primitive::Sphere { radius },
            Primitive::Cylinder {
                radius,
                height: length,
            },
            Primitive::Capsule {
                radius,
                height: length,
            },
        ];
        let cone_height = length - self.cone_height_trim;
        if cone_height > 1e-9 * length.max(1.0) {
            out.push(Primitive::Cone {
                radius,
                height: cone_height,
            });
        } else {
            tracing::debug!(
                length,
                trim = self.cone_height_trim,
                candidates = out.len(),
                "Part too short for a cone candidate"
            );
        }
        out
    }

    /// Best primitive for one part, or `None` when the part carries too
    /// little information to fit anything.
    pub fn fit(&self, cloud: &PartPointCloud) -> Option<PrimitiveFit> {
        if cloud.len() < MIN_PART_POINTS {
            tracing::debug!(part_id = cloud.part_id(), points = cloud.len(), "Too few points to fit");
            return None;
        }
        let Some(obb) = cloud.obb() else {
            tracing::warn!(part_id = cloud.part_id(), "No oriented bounding box, skipping part");
            return None;
        };

        let mut best: Option<PrimitiveFit> = None;
        for primitive in self.candidates(&obb.extents) {
            let mesh = match primitive.mesh() {
                Ok(mesh) => mesh,
                Err(e) => {
                    tracing::debug!(candidate = primitive.name(), error = %e, "Candidate rejected");
                    continue;
                }
            };

            let starts = initial_alignments(&obb, &primitive);
            let registration = match register(&mesh, cloud.points(), &starts, &self.registration) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(candidate = primitive.name(), error = %e, "Registration failed");
                    continue;
                }
            };

            let proper = force_proper_rotation(&registration.transform);
            let (transform, scale) = match split_scale(&proper) {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::debug!(candidate = primitive.name(), error = %e, "Unusable transform");
                    continue;
                }
            };

            tracing::debug!(
                part_id = cloud.part_id(),
                candidate = primitive.name(),
                cost = registration.cost,
                scale,
                iterations = registration.iterations,
                "Candidate registered"
            );

            if best.as_ref().map_or(true, |b| registration.cost < b.cost) {
                best = Some(PrimitiveFit {
                    primitive,
                    mesh,
                    transform,
                    scale,
                    cost: registration.cost,
                });
            }
        }

        if best.is_none() {
            tracing::warn!(part_id = cloud.part_id(), "No candidate could be registered");
        }
        best
    }

    /// Fit every part of one object, dropping parts that cannot be fitted.
    pub fn fit_object(&self, parts: &[PartPointCloud]) -> Vec<PartState> {
        parts
            .iter()
            .filter_map(|cloud| self.fit(cloud).map(|fit| fit.into_state(cloud)))
            .collect()
    }
}
