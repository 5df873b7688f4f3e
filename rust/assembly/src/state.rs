// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fitted part state shared by the assembly stages.

use nalgebra::Matrix4;
use part2cad_geometry::transform::with_scale;
use part2cad_geometry::{Mesh, Obb, Primitive};

/// Provenance of a fitted part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartMeta {
    /// Semantic object category of the source points.
    pub object_id: i64,
    pub part_id: i64,
    /// Uniform scale factored out of the registration.
    pub scale: f64,
    /// Registration residual.
    pub cost: f64,
    pub primitive: Primitive,
}

/// A primitive mesh in its canonical frame plus the rigid pose that places
/// it in the world. The world geometry is `transform * scale(meta.scale)`.
#[derive(Debug, Clone)]
pub struct PartState {
    pub mesh: Mesh,
    pub transform: Matrix4<f64>,
    pub meta: PartMeta,
}

impl PartState {
    /// Full similarity transform, scale included.
    pub fn global_transform(&self) -> Matrix4<f64> {
        with_scale(&self.transform, self.meta.scale)
    }

    /// Mesh in world coordinates.
    pub fn posed_mesh(&self) -> Mesh {
        self.mesh.transformed(&self.global_transform())
    }

    /// OBB of the posed mesh.
    pub fn posed_obb(&self) -> Option<Obb> {
        Obb::from_mesh(&self.posed_mesh())
    }
}

/// A part posed once, with its box cached, for repeated pairwise queries.
#[derive(Debug, Clone)]
pub struct PosedPart {
    pub mesh: Mesh,
    pub obb: Option<Obb>,
}

impl PosedPart {
    pub fn new(mesh: &Mesh, transform: &Matrix4<f64>) -> Self {
        let mesh = mesh.transformed(transform);
        let obb = Obb::from_mesh(&mesh);
        Self { mesh, obb }
    }

    pub fn from_state(state: &PartState) -> Self {
        Self::new(&state.mesh, &state.global_transform())
    }
}
