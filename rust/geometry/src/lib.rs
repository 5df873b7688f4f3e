// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Part2CAD Geometry
//!
//! Geometry kernel for turning segmented part point clouds into posed
//! primitive solids: triangle meshes, primitive builders, oriented bounding
//! boxes, transform algebra on nalgebra matrices, ICP registration, 2D face
//! overlap via i_overlay and solid intersection volume via csgrs.

pub mod bool2d;
pub mod csg;
pub mod error;
pub mod mesh;
pub mod obb;
pub mod primitives;
pub mod registration;
pub mod transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

pub use bool2d::intersection_area;
pub use csg::{ClippingProcessor, Plane};
pub use error::{Error, Result};
pub use mesh::Mesh;
pub use obb::{Obb, ObbFace, MIN_OBB_POINTS};
pub use primitives::Primitive;
pub use registration::{register, Registration, RegistrationConfig};
