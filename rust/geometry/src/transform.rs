// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared transform utilities
//!
//! Every pose in the pipeline is a homogeneous `Matrix4<f64>`. Registration
//! produces similarity transforms (uniform scale folded into the linear block);
//! everything downstream works with rigid transforms plus a separate scale, and
//! [`split_scale`] is the one place where the two are separated.

use crate::error::{Error, Result};
use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, UnitQuaternion, Vector3};

/// Assemble a homogeneous transform from a linear block and a translation
#[inline]
pub fn from_parts(linear: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut tf = Matrix4::identity();
    tf.fixed_view_mut::<3, 3>(0, 0).copy_from(linear);
    tf.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    tf
}

/// Linear (rotation or rotation*scale) block
#[inline]
pub fn linear(tf: &Matrix4<f64>) -> Matrix3<f64> {
    tf.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Translation column
#[inline]
pub fn translation(tf: &Matrix4<f64>) -> Vector3<f64> {
    tf.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Negate the linear block when it is a reflection.
///
/// Negating a 3x3 block flips the sign of its determinant, so the result is a
/// proper rotation (times scale) with the translation untouched.
pub fn force_proper_rotation(tf: &Matrix4<f64>) -> Matrix4<f64> {
    let lin = linear(tf);
    if lin.determinant() < 0.0 {
        from_parts(&(-lin), &translation(tf))
    } else {
        *tf
    }
}

/// Factor a similarity transform into a rigid transform and a uniform scale.
///
/// The scale is `sqrt((R * R^T)[0, 0])`, i.e. the length of the first row of
/// the linear block, and the rotation block is divided by it. A vanishing or
/// non-finite scale is rejected.
pub fn split_scale(tf: &Matrix4<f64>) -> Result<(Matrix4<f64>, f64)> {
    let lin = linear(tf);
    let scale = (lin * lin.transpose())[(0, 0)].sqrt();
    if !scale.is_finite() || scale < 1e-12 {
        return Err(Error::degenerate(format!(
            "cannot factor scale out of transform (scale = {scale})"
        )));
    }
    Ok((from_parts(&(lin / scale), &translation(tf)), scale))
}

/// Compose a rigid transform with a uniform scale applied first
#[inline]
pub fn with_scale(rigid: &Matrix4<f64>, scale: f64) -> Matrix4<f64> {
    rigid * Matrix4::new_nonuniform_scaling(&Vector3::repeat(scale))
}

/// Rotation about a fixed pivot point: `T(p) * R * T(-p)`
pub fn rotation_about(rotation: &Matrix3<f64>, pivot: &Point3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(&pivot.coords)
        * from_parts(rotation, &Vector3::zeros())
        * Matrix4::new_translation(&(-pivot.coords))
}

/// Inverse of a rigid transform (`[R^T | -R^T t]`)
pub fn rigid_inverse(tf: &Matrix4<f64>) -> Matrix4<f64> {
    let rt = linear(tf).transpose();
    from_parts(&rt, &(-(rt * translation(tf))))
}

/// Quaternion of a rotation block as `[x, y, z, w]`, with `w >= 0`
pub fn quaternion_xyzw(rotation: &Matrix3<f64>) -> [f64; 4] {
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation));
    let sign = if q.w < 0.0 { -1.0 } else { 1.0 };
    [sign * q.i, sign * q.j, sign * q.k, sign * q.w]
}

/// Optimal rotation taking `from[i]` onto `to[i]` (orthogonal Procrustes).
///
/// `H = sum(to_i * from_i^T)`, `R = U * V^T`; when `det(R) < 0` the last left
/// singular vector is flipped so the result is a proper rotation.
pub fn fit_rotation(from: &[Vector3<f64>], to: &[Vector3<f64>]) -> Result<Matrix3<f64>> {
    if from.len() != to.len() || from.is_empty() {
        return Err(Error::degenerate("rotation fit needs matching, non-empty vector sets"));
    }

    let mut h = Matrix3::zeros();
    for (f, t) in from.iter().zip(to.iter()) {
        h += t * f.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(Error::SvdFailed)?;
    let v_t = svd.v_t.ok_or(Error::SvdFailed)?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }
    Ok(r)
}

/// Right-handed orthonormal frame with the given z direction.
///
/// `x_hint` is projected onto the plane perpendicular to z; when the two are
/// (nearly) parallel a world axis is used instead. Columns are x, y, z.
pub fn frame_from_axes(z_axis: &Vector3<f64>, x_hint: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let z = z_axis.try_normalize(1e-12)?;
    let x_orthogonal = x_hint - z * x_hint.dot(&z);
    let x = match x_orthogonal.try_normalize(1e-6) {
        Some(x) => x,
        None => {
            let fallback = if z.z.abs() < 0.9 { Vector3::z() } else { Vector3::x() };
            fallback.cross(&z).normalize()
        }
    };
    // Y = Z x X keeps the frame right-handed
    let y = z.cross(&x).normalize();
    Some(Matrix3::from_columns(&[x, y, z]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn rot_z(angle: f64) -> Matrix3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
    }

    #[test]
    fn test_split_scale_recovers_parts() {
        let rot = rot_z(0.3);
        let tf = from_parts(&(rot * 2.5), &Vector3::new(1.0, 2.0, 3.0));
        let (rigid, scale) = split_scale(&tf).unwrap();
        assert_relative_eq!(scale, 2.5, epsilon = 1e-12);
        assert_relative_eq!(linear(&rigid), rot, epsilon = 1e-12);
        assert_relative_eq!(translation(&rigid), Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(with_scale(&rigid, scale), tf, epsilon = 1e-12);
    }

    #[test]
    fn test_split_scale_rejects_zero() {
        let tf = from_parts(&Matrix3::zeros(), &Vector3::zeros());
        assert!(split_scale(&tf).is_err());
    }

    #[test]
    fn test_force_proper_rotation() {
        let reflection = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        let tf = from_parts(&reflection, &Vector3::new(0.0, 0.0, 4.0));
        let fixed = force_proper_rotation(&tf);
        assert!(linear(&fixed).determinant() > 0.0);
        assert_relative_eq!(translation(&fixed), Vector3::new(0.0, 0.0, 4.0));

        let proper = from_parts(&rot_z(1.0), &Vector3::zeros());
        assert_eq!(force_proper_rotation(&proper), proper);
    }

    #[test]
    fn test_rigid_inverse() {
        let tf = from_parts(&rot_z(0.7), &Vector3::new(-1.0, 0.5, 2.0));
        let product = rigid_inverse(&tf) * tf;
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_keeps_pivot() {
        let pivot = Point3::new(1.0, 1.0, 0.0);
        let tf = rotation_about(&rot_z(FRAC_PI_2), &pivot);
        assert_relative_eq!(tf.transform_point(&pivot), pivot, epsilon = 1e-12);
        let moved = tf.transform_point(&Point3::new(2.0, 1.0, 0.0));
        assert_relative_eq!(moved, Point3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_quaternion_identity() {
        assert_eq!(quaternion_xyzw(&Matrix3::identity()), [0.0, 0.0, 0.0, 1.0]);
        let q = quaternion_xyzw(&rot_z(FRAC_PI_2));
        assert_relative_eq!(q[2], (0.5f64).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(q[3], (0.5f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_fit_rotation_recovers_rotation() {
        let r = rot_z(0.4) * Rotation3::from_axis_angle(&Vector3::x_axis(), -0.2).into_inner();
        let from = vec![Vector3::x(), Vector3::y(), Vector3::z()];
        let to: Vec<_> = from.iter().map(|v| r * v).collect();
        let fitted = fit_rotation(&from, &to).unwrap();
        assert_relative_eq!(fitted, r, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_rotation_never_reflects() {
        let from = vec![Vector3::x(), Vector3::y(), Vector3::z()];
        let to = vec![Vector3::x(), Vector3::y(), -Vector3::z()];
        let fitted = fit_rotation(&from, &to).unwrap();
        assert_relative_eq!(fitted.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_frame_from_parallel_axes() {
        let frame = frame_from_axes(&Vector3::z(), &Vector3::z()).unwrap();
        assert_relative_eq!(frame.determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.column(2).into_owned(), Vector3::z());
        assert!(frame_from_axes(&Vector3::zeros(), &Vector3::x()).is_none());
    }
}
