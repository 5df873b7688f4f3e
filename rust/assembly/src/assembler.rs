// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Part graph assembly
//!
//! Turns fitted part states and their kinematic tree into a [`PartGraph`]
//! whose node records carry parent-relative poses, joints and colors.
//!
//! Articulated parts get their joint frame moved from the part center to the
//! part's edge: the joint axis is the local box axis closest to gravity, the
//! frame is shifted by half the largest remaining extent, and a link offset
//! moves the mesh back to where it was fitted. Children are expressed
//! relative to their parent's fitted pose, never the shifted joint frame.

use nalgebra::{Matrix4, Vector3};
use part2cad_geometry::transform::{linear, quaternion_xyzw, rigid_inverse, translation};
use part2cad_graph::{
    Joint, JointType, LinkOffset, NodeAttributes, NodeId, NodeType, PartGraph, PartLabel,
    IDENTITY_QUATERNION,
};
use rustc_hash::FxHashMap;

use crate::config::{gravity, AssemblyConfig, JointClassification, SemanticLabels};
use crate::error::{Error, Result};
use crate::kinematics::KinematicTree;
use crate::palette::palette;
use crate::state::PartState;

/// Joint frame of an articulated part.
#[derive(Debug, Clone, PartialEq)]
pub struct JointFrame {
    /// Global rigid pose with the joint moved to the part's edge
    pub transform: Matrix4<f64>,
    /// Unit axis in the part's local frame
    pub axis: [f64; 3],
    pub link_offset: LinkOffset,
}

/// Derive the joint frame of a part: joint axis along the local box axis
/// most parallel to gravity, origin moved half the largest other extent along
/// that extent's axis.
pub fn joint_frame(state: &PartState) -> JointFrame {
    let rotation = linear(&state.transform);
    let down = gravity();

    let mut gravity_idx = 0;
    let mut best = f64::MIN;
    for k in 0..3 {
        let alignment = rotation.column(k).dot(&down).abs();
        if alignment > best {
            best = alignment;
            gravity_idx = k;
        }
    }

    let extents = state.mesh.extents() * state.meta.scale;
    let mut swing_idx = (gravity_idx + 1) % 3;
    for k in 0..3 {
        if k != gravity_idx && extents[k] > extents[swing_idx] {
            swing_idx = k;
        }
    }
    let half = extents[swing_idx] * 0.5;

    let shift: Vector3<f64> = rotation.column(swing_idx) * half;
    let mut axis = [0.0; 3];
    axis[gravity_idx] = 1.0;
    let mut position = [0.0; 3];
    position[swing_idx] = -half;

    JointFrame {
        transform: Matrix4::new_translation(&shift) * state.transform,
        axis,
        link_offset: LinkOffset {
            position,
            orientation: IDENTITY_QUATERNION,
        },
    }
}

/// Writes the final part graph of one object.
#[derive(Debug, Clone)]
pub struct PartGraphAssembler {
    joints: JointClassification,
    labels: SemanticLabels,
    seed: u64,
}

impl PartGraphAssembler {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            joints: config.joints.clone(),
            labels: config.labels.clone(),
            seed: config.seed,
        }
    }

    /// Build the part graph; node ids are part indices.
    ///
    /// `object_index` is recorded as `object_id` on every node.
    pub fn assemble(
        &self,
        states: &[PartState],
        tree: &KinematicTree,
        object_index: i64,
    ) -> Result<PartGraph> {
        let mut graph = match &tree.graph {
            Some(g) => PartGraph::from_tree(g, tree.root)
                .map_err(|e| Error::invariant(object_index, e.to_string()))?,
            None => PartGraph::single(tree.root),
        };
        if graph.len() != states.len() {
            return Err(Error::invariant(
                object_index,
                format!("{} tree nodes for {} parts", graph.len(), states.len()),
            ));
        }

        let colors = palette(graph.node_ids(), self.seed);

        // Parents come first in node order, so their poses are ready
        let order: Vec<NodeId> = graph.node_ids().to_vec();
        let mut poses: FxHashMap<NodeId, Matrix4<f64>> = FxHashMap::default();
        for id in order {
            let state = states
                .get(id)
                .ok_or_else(|| Error::invariant(object_index, format!("no part for node {id}")))?;

            let kind = self.joints.classify(state.meta.part_id);
            let (global, joint) = match kind {
                JointType::Fixed => (state.transform, Joint::Fixed),
                _ => {
                    let frame = joint_frame(state);
                    let joint = Joint::from_parts(kind, frame.axis, frame.link_offset);
                    (frame.transform, joint)
                }
            };

            let parent_pose = match graph.parent(id) {
                Some(p) => *poses.get(&p).ok_or_else(|| {
                    Error::invariant(object_index, format!("node {id} visited before parent {p}"))
                })?,
                None => Matrix4::identity(),
            };
            let local = rigid_inverse(&parent_pose) * global;
            poses.insert(id, state.transform);

            let attributes = NodeAttributes {
                id,
                cad_id: id,
                object_id: Some(object_index),
                label: self.labels.label(state.meta.object_id).to_string(),
                part_label: Some(PartLabel::Id(state.meta.part_id)),
                node_type: NodeType::ObjectNode,
                orientation: quaternion_xyzw(&linear(&local)),
                position: translation(&local).into(),
                scale: state.meta.scale,
                joint,
                color: colors.get(&id).copied(),
            };
            graph.set_node_info(id, attributes, Some(state.mesh.clone()))?;
        }

        Ok(graph)
    }
}
