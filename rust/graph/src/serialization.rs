// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON-friendly graph snapshots.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::part_graph::{Joint, JointType, LinkOffset, NodeAttributes, NodeType, PartLabel};
use crate::NodeId;

/// A dumped graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub root_id: NodeId,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// Parent to child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src_id: NodeId,
    pub dst_id: NodeId,
}

/// One node as written to JSON.
///
/// Concept nodes carry only `id`, `label` and `type`; object nodes carry the
/// full pose. Articulated joints add `joint_axis` and the link offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cad_id: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<i64>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_label: Option<PartLabel>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joint_type: Option<JointType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joint_axis: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_offset_position: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_offset_orientation: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[f64; 3]>,
}

impl From<&NodeAttributes> for NodeRecord {
    fn from(attrs: &NodeAttributes) -> Self {
        if attrs.node_type == NodeType::ConceptNode {
            return NodeRecord {
                id: attrs.id,
                cad_id: None,
                object_id: None,
                label: attrs.label.clone(),
                part_label: None,
                node_type: NodeType::ConceptNode,
                orientation: None,
                position: None,
                scale: None,
                joint_type: None,
                joint_axis: None,
                link_offset_position: None,
                link_offset_orientation: None,
                color: None,
            };
        }

        let link_offset = attrs.joint.link_offset();
        NodeRecord {
            id: attrs.id,
            cad_id: Some(attrs.cad_id),
            object_id: attrs.object_id,
            label: attrs.label.clone(),
            part_label: attrs.part_label.clone(),
            node_type: attrs.node_type,
            orientation: Some(attrs.orientation),
            position: Some(attrs.position),
            scale: Some(attrs.scale),
            joint_type: Some(attrs.joint.joint_type()),
            joint_axis: attrs.joint.axis(),
            link_offset_position: link_offset.map(|l| l.position),
            link_offset_orientation: link_offset.map(|l| l.orientation),
            color: attrs.color,
        }
    }
}

impl TryFrom<&NodeRecord> for NodeAttributes {
    type Error = Error;

    fn try_from(record: &NodeRecord) -> Result<Self> {
        if record.node_type == NodeType::ConceptNode {
            return Ok(NodeAttributes::concept(record.id, record.label.clone()));
        }

        let missing = |field: &str| {
            Error::Serialization(format!("node {} has no `{field}`", record.id))
        };

        let kind = record.joint_type.ok_or_else(|| missing("joint_type"))?;
        let joint = match kind {
            JointType::Fixed => Joint::Fixed,
            _ => Joint::from_parts(
                kind,
                record.joint_axis.ok_or_else(|| missing("joint_axis"))?,
                LinkOffset {
                    position: record
                        .link_offset_position
                        .ok_or_else(|| missing("link_offset_position"))?,
                    orientation: record
                        .link_offset_orientation
                        .ok_or_else(|| missing("link_offset_orientation"))?,
                },
            ),
        };

        Ok(NodeAttributes {
            id: record.id,
            cad_id: record.cad_id.unwrap_or(record.id),
            object_id: record.object_id,
            label: record.label.clone(),
            part_label: record.part_label.clone(),
            node_type: record.node_type,
            orientation: record.orientation.ok_or_else(|| missing("orientation"))?,
            position: record.position.ok_or_else(|| missing("position"))?,
            scale: record.scale.ok_or_else(|| missing("scale"))?,
            joint,
            color: record.color,
        })
    }
}

impl GraphSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
