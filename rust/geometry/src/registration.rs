// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh-to-point-cloud registration
//!
//! Iterative closest point with a similarity (rotation, translation, uniform
//! scale) model. The candidate mesh surface is sampled once with a seeded RNG,
//! correspondences are taken in both directions (sample to target and target
//! to sample) and each step solves the closed-form Umeyama update. The
//! residual is the mean correspondence distance at the final pose.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::obb::Obb;
use crate::primitives::Primitive;
use crate::transform::{frame_from_axes, from_parts};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use rand::prelude::*;
use smallvec::{smallvec, SmallVec};

/// ICP settings
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationConfig {
    /// Hard iteration cap
    pub max_iterations: usize,
    /// Points sampled from the candidate surface
    pub surface_samples: usize,
    /// Target clouds larger than this are subsampled by stride
    pub max_target_points: usize,
    /// Stop when the residual improves by less than this
    pub tolerance: f64,
    /// Estimate a uniform scale alongside the rigid motion
    pub enable_scale: bool,
    /// Seed for surface sampling
    pub seed: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            surface_samples: 300,
            max_target_points: 600,
            tolerance: 1e-6,
            enable_scale: true,
            seed: 10,
        }
    }
}

/// Result of registering a mesh onto a point cloud
#[derive(Debug, Clone)]
pub struct Registration {
    /// Similarity transform taking mesh coordinates onto the target
    pub transform: Matrix4<f64>,
    /// Mean correspondence distance at `transform`
    pub cost: f64,
    /// Iterations used by the winning start
    pub iterations: usize,
}

/// Register `mesh` onto `target`, trying every start in `initial` and
/// keeping the lowest residual.
pub fn register(
    mesh: &Mesh,
    target: &[Point3<f64>],
    initial: &[Matrix4<f64>],
    config: &RegistrationConfig,
) -> Result<Registration> {
    if target.is_empty() {
        return Err(Error::Registration("empty target point cloud".into()));
    }
    if initial.is_empty() {
        return Err(Error::Registration("no initial alignment".into()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let source = sample_surface(mesh, config.surface_samples, &mut rng)?;
    let target = subsample(target, config.max_target_points);

    let mut best: Option<Registration> = None;
    for start in initial {
        let Some(result) = icp(&source, &target, start, config) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| result.cost < b.cost) {
            best = Some(result);
        }
    }
    best.ok_or_else(|| Error::Registration("no start converged to a finite pose".into()))
}

/// Starting poses that put a primitive (built in its canonical frame) onto the
/// target's bounding box.
///
/// Boxes are built with the target box's extents in axis order, so the box
/// frame maps them directly. Axial primitives have their long axis on z and
/// are started with z along the longest extent and x along the shortest, in
/// both orientations of the long axis.
pub fn initial_alignments(target: &Obb, primitive: &Primitive) -> SmallVec<[Matrix4<f64>; 2]> {
    let frame = target.frame();
    if !primitive.is_axial() {
        return smallvec![frame];
    }

    let longest = target.extents.imax();
    let shortest = target.extents.imin();
    let Some(axes) = frame_from_axes(&target.axis(longest), &target.axis(shortest)) else {
        return smallvec![frame];
    };

    let flip = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0));
    smallvec![
        from_parts(&axes, &target.center.coords),
        from_parts(&(axes * flip), &target.center.coords),
    ]
}

/// Area-weighted random points on the mesh surface
pub fn sample_surface(mesh: &Mesh, count: usize, rng: &mut StdRng) -> Result<Vec<Point3<f64>>> {
    let triangles: Vec<[Point3<f64>; 3]> = mesh.triangles().collect();
    let mut cumulative = Vec::with_capacity(triangles.len());
    let mut total = 0.0;
    for [a, b, c] in &triangles {
        total += (b - a).cross(&(c - a)).norm() * 0.5;
        cumulative.push(total);
    }
    if !(total > 0.0) || count == 0 {
        return Err(Error::Registration("mesh has no surface to sample".into()));
    }

    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let pick = rng.gen::<f64>() * total;
        let idx = cumulative
            .partition_point(|&c| c < pick)
            .min(triangles.len() - 1);
        let [a, b, c] = triangles[idx];

        // Uniform barycentric sample
        let r1 = rng.gen::<f64>().sqrt();
        let r2 = rng.gen::<f64>();
        let p = a.coords * (1.0 - r1) + b.coords * (r1 * (1.0 - r2)) + c.coords * (r1 * r2);
        samples.push(Point3::from(p));
    }
    Ok(samples)
}

fn subsample(points: &[Point3<f64>], max: usize) -> Vec<Point3<f64>> {
    if max == 0 || points.len() <= max {
        return points.to_vec();
    }
    let stride = (points.len() + max - 1) / max;
    points.iter().step_by(stride).cloned().collect()
}

fn nearest(points: &[Point3<f64>], query: &Point3<f64>) -> (usize, f64) {
    let mut best = (0, f64::MAX);
    for (i, p) in points.iter().enumerate() {
        let d = (p - query).norm_squared();
        if d < best.1 {
            best = (i, d);
        }
    }
    (best.0, best.1.sqrt())
}

/// Symmetric correspondences as (source index, target index), plus mean distance
fn correspondences(posed: &[Point3<f64>], target: &[Point3<f64>]) -> (Vec<(usize, usize)>, f64) {
    let mut pairs = Vec::with_capacity(posed.len() + target.len());
    let mut total = 0.0;
    for (i, p) in posed.iter().enumerate() {
        let (j, d) = nearest(target, p);
        pairs.push((i, j));
        total += d;
    }
    for (j, t) in target.iter().enumerate() {
        let (i, d) = nearest(posed, t);
        pairs.push((i, j));
        total += d;
    }
    let mean = total / pairs.len() as f64;
    (pairs, mean)
}

fn icp(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
    start: &Matrix4<f64>,
    config: &RegistrationConfig,
) -> Option<Registration> {
    let mut tf = *start;
    let mut previous_tf = tf;
    let mut previous = f64::MAX;
    let mut iterations = 0;

    for _ in 0..config.max_iterations {
        let posed: Vec<Point3<f64>> = source.iter().map(|p| tf.transform_point(p)).collect();
        let (pairs, cost) = correspondences(&posed, target);
        if cost > previous {
            tf = previous_tf;
            break;
        }
        if previous - cost < config.tolerance {
            break;
        }
        previous = cost;
        previous_tf = tf;
        iterations += 1;

        match umeyama(source, target, &pairs, config.enable_scale) {
            Some(update) => tf = update,
            None => break,
        }
    }

    let posed: Vec<Point3<f64>> = source.iter().map(|p| tf.transform_point(p)).collect();
    let (_, cost) = correspondences(&posed, target);
    cost.is_finite().then_some(Registration {
        transform: tf,
        cost,
        iterations,
    })
}

/// Closed-form similarity taking `source[i]` onto `target[j]` for each pair
fn umeyama(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
    pairs: &[(usize, usize)],
    with_scale: bool,
) -> Option<Matrix4<f64>> {
    let n = pairs.len() as f64;
    if pairs.len() < 3 {
        return None;
    }

    let mut mu_s = Vector3::zeros();
    let mut mu_t = Vector3::zeros();
    for &(i, j) in pairs {
        mu_s += source[i].coords;
        mu_t += target[j].coords;
    }
    mu_s /= n;
    mu_t /= n;

    let mut sigma = Matrix3::zeros();
    let mut var_s = 0.0;
    for &(i, j) in pairs {
        let ds = source[i].coords - mu_s;
        let dt = target[j].coords - mu_t;
        sigma += dt * ds.transpose();
        var_s += ds.norm_squared();
    }
    sigma /= n;
    var_s /= n;

    let svd = sigma.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut s = Vector3::new(1.0, 1.0, 1.0);
    if u.determinant() * v_t.determinant() < 0.0 {
        s.z = -1.0;
    }
    let rotation = u * Matrix3::from_diagonal(&s) * v_t;

    let scale = if with_scale {
        if var_s <= f64::EPSILON {
            return None;
        }
        svd.singular_values.dot(&s) / var_s
    } else {
        1.0
    };
    if !(scale > 1e-9) || !scale.is_finite() {
        return None;
    }

    let linear = rotation * scale;
    let translation = mu_t - linear * mu_s;
    Some(from_parts(&linear, &translation))
}
