// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis snapping of child parts to their parents
//!
//! Walks the kinematic tree breadth-first from the root. For each edge the
//! child's OBB axes that are nearly parallel to a parent axis are rotated onto
//! it; unmatched child axes map to themselves. The rotation is the Procrustes
//! fit of those axis pairs, applied about the child's own origin. Parents are
//! always refined before their children, and each correction only looks at
//! the parent's current pose.

use nalgebra::{Point3, Vector3};
use part2cad_geometry::transform::{fit_rotation, rotation_about, translation};

use crate::config::AssemblyConfig;
use crate::error::Result;
use crate::kinematics::KinematicTree;
use crate::state::PartState;

/// Snaps part orientations along the kinematic tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentRefiner {
    /// Minimum |cos| between a parent and a child axis to snap them
    pub angle_threshold: f64,
}

impl Default for AlignmentRefiner {
    fn default() -> Self {
        Self::new(&AssemblyConfig::default())
    }
}

impl AlignmentRefiner {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            angle_threshold: config.alignment_angle_threshold,
        }
    }

    /// Refine the transforms of `states` in place.
    ///
    /// Meshes and metadata are left untouched.
    pub fn refine(&self, states: &mut [PartState], tree: &KinematicTree) -> Result<()> {
        for (parent, child) in tree.bfs_edges() {
            let (Some(parent_state), Some(child_state)) = (states.get(parent), states.get(child))
            else {
                continue;
            };
            let (Some(parent_obb), Some(child_obb)) =
                (parent_state.posed_obb(), child_state.posed_obb())
            else {
                tracing::debug!(parent, child, "Missing bounding box, alignment skipped");
                continue;
            };

            let matched = parent_obb.matched_axes(&child_obb, self.angle_threshold);
            if matched.is_empty() {
                continue;
            }

            let mut from: Vec<Vector3<f64>> = Vec::with_capacity(3);
            let mut to: Vec<Vector3<f64>> = Vec::with_capacity(3);
            for &(p, c) in &matched {
                let source = child_obb.axis(c);
                let mut target = parent_obb.axis(p);
                if target.dot(&source) < 0.0 {
                    target = -target;
                }
                from.push(source);
                to.push(target);
            }
            for c in 0..3 {
                if !matched.iter().any(|&(_, mc)| mc == c) {
                    from.push(child_obb.axis(c));
                    to.push(child_obb.axis(c));
                }
            }

            let rotation = fit_rotation(&from, &to)?;
            let state = &mut states[child];
            let pivot = Point3::from(translation(&state.transform));
            state.transform = rotation_about(&rotation, &pivot) * state.transform;

            tracing::debug!(parent, child, matched = matched.len(), "Child axes snapped");
        }
        Ok(())
    }
}
