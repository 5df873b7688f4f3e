// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive solid meshes
//!
//! All builders return closed, outward-wound meshes centered on their
//! bounding-box center. Round solids are generated by revolving an (r, z)
//! profile around the z axis.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Segments around the z axis for round primitives
pub const RADIAL_SEGMENTS: usize = 32;
/// Latitude bands for spheres (capsule caps use half as many each)
pub const SPHERE_RINGS: usize = 16;

/// Primitive solid kinds used as fitting candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Box { extents: Vector3<f64> },
    Sphere { radius: f64 },
    Cylinder { radius: f64, height: f64 },
    /// `height` is the length of the straight section between the cap centers
    Capsule { radius: f64, height: f64 },
    Cone { radius: f64, height: f64 },
}

impl Primitive {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Box { .. } => "box",
            Primitive::Sphere { .. } => "sphere",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Capsule { .. } => "capsule",
            Primitive::Cone { .. } => "cone",
        }
    }

    /// Whether the primitive has a distinguished long axis (z)
    pub fn is_axial(&self) -> bool {
        matches!(
            self,
            Primitive::Cylinder { .. } | Primitive::Capsule { .. } | Primitive::Cone { .. }
        )
    }

    /// Build the mesh, validating dimensions first
    pub fn mesh(&self) -> Result<Mesh> {
        match *self {
            Primitive::Box { extents } => {
                for e in extents.iter() {
                    check_positive("box extent", *e)?;
                }
                Ok(make_box(extents))
            }
            Primitive::Sphere { radius } => {
                check_positive("sphere radius", radius)?;
                Ok(make_sphere(radius))
            }
            Primitive::Cylinder { radius, height } => {
                check_positive("cylinder radius", radius)?;
                check_positive("cylinder height", height)?;
                Ok(make_cylinder(radius, height))
            }
            Primitive::Capsule { radius, height } => {
                check_positive("capsule radius", radius)?;
                if !(height >= 0.0 && height.is_finite()) {
                    return Err(Error::InvalidPrimitive(format!("capsule height {height}")));
                }
                Ok(make_capsule(radius, height))
            }
            Primitive::Cone { radius, height } => {
                check_positive("cone radius", radius)?;
                check_positive("cone height", height)?;
                Ok(make_cone(radius, height))
            }
        }
    }
}

fn check_positive(what: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidPrimitive(format!("{what} must be positive, got {value}")))
    }
}

/// Axis-aligned box with the given full extents, flat-shaded (24 vertices)
pub fn make_box(extents: Vector3<f64>) -> Mesh {
    let h = extents * 0.5;
    let mut mesh = Mesh::with_capacity(24, 36);

    // (normal axis, sign); corners wound counter-clockwise seen from outside
    for axis in 0..3 {
        for sign in [-1.0, 1.0] {
            let u = (axis + 1) % 3;
            let v = (axis + 2) % 3;
            let mut normal = Vector3::zeros();
            normal[axis] = sign;

            let base = mesh.vertex_count() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let mut p = Vector3::zeros();
                p[axis] = sign * h[axis];
                p[u] = su * h[u];
                p[v] = sv * h[v];
                mesh.add_vertex(Point3::from(p), normal);
            }
            if sign > 0.0 {
                mesh.add_triangle(base, base + 1, base + 2);
                mesh.add_triangle(base, base + 2, base + 3);
            } else {
                mesh.add_triangle(base, base + 2, base + 1);
                mesh.add_triangle(base, base + 3, base + 2);
            }
        }
    }

    mesh
}

/// UV sphere centered at the origin
pub fn make_sphere(radius: f64) -> Mesh {
    let profile: Vec<ProfilePoint> = (0..=SPHERE_RINGS)
        .map(|k| {
            let phi = PI * k as f64 / SPHERE_RINGS as f64;
            let (s, c) = phi.sin_cos();
            ProfilePoint::new(radius * s, -radius * c, s, -c)
        })
        .collect();
    revolve(&profile)
}

/// Capped cylinder along z
pub fn make_cylinder(radius: f64, height: f64) -> Mesh {
    let h = height * 0.5;
    revolve(&[
        ProfilePoint::new(0.0, -h, 0.0, -1.0),
        ProfilePoint::new(radius, -h, 0.0, -1.0),
        ProfilePoint::new(radius, -h, 1.0, 0.0),
        ProfilePoint::new(radius, h, 1.0, 0.0),
        ProfilePoint::new(radius, h, 0.0, 1.0),
        ProfilePoint::new(0.0, h, 0.0, 1.0),
    ])
}

/// Capsule along z: a cylinder of length `height` with hemispherical caps
pub fn make_capsule(radius: f64, height: f64) -> Mesh {
    let h = height * 0.5;
    let half_rings = (SPHERE_RINGS / 2).max(1);
    let mut profile = Vec::with_capacity(2 * half_rings + 2);

    for k in 0..=half_rings {
        let phi = 0.5 * PI * k as f64 / half_rings as f64;
        let (s, c) = phi.sin_cos();
        profile.push(ProfilePoint::new(radius * s, -h - radius * c, s, -c));
    }
    for k in 0..=half_rings {
        let phi = 0.5 * PI + 0.5 * PI * k as f64 / half_rings as f64;
        let (s, c) = phi.sin_cos();
        profile.push(ProfilePoint::new(radius * s, h - radius * c, s, -c));
    }
    revolve(&profile)
}

/// Cone along z, base at `-height / 2`, apex at `+height / 2`
pub fn make_cone(radius: f64, height: f64) -> Mesh {
    let h = height * 0.5;
    let slant = (height * height + radius * radius).sqrt();
    let (nr, nz) = (height / slant, radius / slant);
    revolve(&[
        ProfilePoint::new(0.0, -h, 0.0, -1.0),
        ProfilePoint::new(radius, -h, 0.0, -1.0),
        ProfilePoint::new(radius, -h, nr, nz),
        ProfilePoint::new(0.0, h, nr, nz),
    ])
}

/// A point of a revolution profile with its outward (r, z) normal
#[derive(Debug, Clone, Copy)]
struct ProfilePoint {
    r: f64,
    z: f64,
    nr: f64,
    nz: f64,
}

impl ProfilePoint {
    fn new(r: f64, z: f64, nr: f64, nz: f64) -> Self {
        let r = if r.abs() < 1e-12 { 0.0 } else { r };
        Self { r, z, nr, nz }
    }

    fn is_pole(&self) -> bool {
        self.r == 0.0
    }
}

/// Revolve a bottom-to-top profile around z.
///
/// Each profile point becomes a ring of `RADIAL_SEGMENTS` vertices, or a single
/// vertex when it lies on the axis. Repeating a position with a different
/// normal produces a crease; the zero-length segment between the copies emits
/// no triangles.
fn revolve(profile: &[ProfilePoint]) -> Mesh {
    let n = RADIAL_SEGMENTS;
    let mut mesh = Mesh::with_capacity(profile.len() * n, profile.len() * n * 6);
    let mut ring_start = Vec::with_capacity(profile.len());

    for p in profile {
        ring_start.push(mesh.vertex_count() as u32);
        if p.is_pole() {
            mesh.add_vertex(
                Point3::new(0.0, 0.0, p.z),
                Vector3::new(0.0, 0.0, p.nz.signum()),
            );
            continue;
        }
        for j in 0..n {
            let theta = 2.0 * PI * j as f64 / n as f64;
            let (s, c) = theta.sin_cos();
            mesh.add_vertex(
                Point3::new(p.r * c, p.r * s, p.z),
                Vector3::new(p.nr * c, p.nr * s, p.nz),
            );
        }
    }

    let index = |ring: usize, j: usize| -> u32 {
        if profile[ring].is_pole() {
            ring_start[ring]
        } else {
            ring_start[ring] + (j % n) as u32
        }
    };

    for i in 0..profile.len().saturating_sub(1) {
        let (lower, upper) = (profile[i], profile[i + 1]);
        if (lower.r - upper.r).abs() < 1e-12 && (lower.z - upper.z).abs() < 1e-12 {
            continue;
        }
        for j in 0..n {
            let a0 = index(i, j);
            let a1 = index(i, j + 1);
            let b0 = index(i + 1, j);
            let b1 = index(i + 1, j + 1);
            if !lower.is_pole() {
                mesh.add_triangle(a0, a1, b1);
            }
            if !upper.is_pole() {
                mesh.add_triangle(a0, b1, b0);
            }
        }
    }

    mesh
}
