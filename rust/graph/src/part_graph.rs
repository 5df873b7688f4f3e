// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rooted part trees with per-node CAD attributes.
//!
//! A [`PartGraph`] is the assembled form of one object (or one background
//! mesh, or the scene root): a tree of node ids where each node carries an
//! attribute record and optionally a renderable mesh. Graphs are built with
//! local ids and moved into a scene-wide id range with
//! [`PartGraph::offset_ids`].

use std::fmt;

use part2cad_geometry::Mesh;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::digraph::DiGraph;
use crate::error::{Error, Result};
use crate::serialization::{EdgeRecord, GraphSnapshot, NodeRecord};
use crate::NodeId;

/// Identity quaternion, `[x, y, z, w]`.
pub const IDENTITY_QUATERNION: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// Node kind in the exported scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Grouping node without geometry (the scene root).
    ConceptNode,
    /// Node backed by a mesh.
    ObjectNode,
}

/// Part label: the segmentation part id, or a name for non-part nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartLabel {
    Id(i64),
    Name(String),
}

impl fmt::Display for PartLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartLabel::Id(id) => write!(f, "{id}"),
            PartLabel::Name(name) => f.write_str(name),
        }
    }
}

/// Joint kind, as written to `joint_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Fixed,
    Revolute,
    Prismatic,
}

/// Mesh placement relative to an articulated joint frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkOffset {
    pub position: [f64; 3],
    /// Quaternion `[x, y, z, w]`
    pub orientation: [f64; 4],
}

/// Joint connecting a node to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Joint {
    Fixed,
    Revolute { axis: [f64; 3], link_offset: LinkOffset },
    Prismatic { axis: [f64; 3], link_offset: LinkOffset },
}

impl Joint {
    pub fn joint_type(&self) -> JointType {
        match self {
            Joint::Fixed => JointType::Fixed,
            Joint::Revolute { .. } => JointType::Revolute,
            Joint::Prismatic { .. } => JointType::Prismatic,
        }
    }

    /// Joint axis in the node frame, for articulated joints.
    pub fn axis(&self) -> Option<[f64; 3]> {
        match self {
            Joint::Fixed => None,
            Joint::Revolute { axis, .. } | Joint::Prismatic { axis, .. } => Some(*axis),
        }
    }

    pub fn link_offset(&self) -> Option<LinkOffset> {
        match self {
            Joint::Fixed => None,
            Joint::Revolute { link_offset, .. } | Joint::Prismatic { link_offset, .. } => {
                Some(*link_offset)
            }
        }
    }

    /// Build from a kind plus axis data; `Fixed` ignores the extras.
    pub fn from_parts(kind: JointType, axis: [f64; 3], link_offset: LinkOffset) -> Joint {
        match kind {
            JointType::Fixed => Joint::Fixed,
            JointType::Revolute => Joint::Revolute { axis, link_offset },
            JointType::Prismatic => Joint::Prismatic { axis, link_offset },
        }
    }
}

/// Attribute record of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttributes {
    pub id: NodeId,
    pub cad_id: NodeId,
    /// Owning object id (object parts only).
    pub object_id: Option<i64>,
    /// Semantic label (object category, `Background`, `scene`).
    pub label: String,
    pub part_label: Option<PartLabel>,
    pub node_type: NodeType,
    /// Orientation relative to the parent, `[x, y, z, w]`.
    pub orientation: [f64; 4],
    /// Position relative to the parent.
    pub position: [f64; 3],
    pub scale: f64,
    pub joint: Joint,
    /// RGB in `[0, 1]`.
    pub color: Option<[f64; 3]>,
}

impl NodeAttributes {
    /// Geometry-free grouping node.
    pub fn concept(id: NodeId, label: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::ConceptNode,
            label: label.into(),
            ..Self::placeholder(id)
        }
    }

    /// Unposed object node; the assembler fills in the rest.
    pub fn placeholder(id: NodeId) -> Self {
        Self {
            id,
            cad_id: id,
            object_id: None,
            label: String::new(),
            part_label: None,
            node_type: NodeType::ObjectNode,
            orientation: IDENTITY_QUATERNION,
            position: [0.0; 3],
            scale: 1.0,
            joint: Joint::Fixed,
            color: None,
        }
    }
}

/// A node: attributes plus optional geometry.
#[derive(Debug, Clone)]
pub struct PartNode {
    pub attributes: NodeAttributes,
    pub mesh: Option<Mesh>,
}

/// Rooted tree of parts.
#[derive(Debug, Clone)]
pub struct PartGraph {
    root: NodeId,
    /// Node ids in insertion order (root first, then breadth-first).
    order: Vec<NodeId>,
    nodes: FxHashMap<NodeId, PartNode>,
    /// `(parent, child)` edges in insertion order.
    edges: Vec<(NodeId, NodeId)>,
    parent: FxHashMap<NodeId, NodeId>,
}

impl PartGraph {
    /// A graph consisting of one root node.
    pub fn single(root: NodeId) -> Self {
        let mut nodes = FxHashMap::default();
        nodes.insert(
            root,
            PartNode {
                attributes: NodeAttributes::placeholder(root),
                mesh: None,
            },
        );
        Self {
            root,
            order: vec![root],
            nodes,
            edges: Vec::new(),
            parent: FxHashMap::default(),
        }
    }

    /// Graph mirroring a spanning tree over nodes `0..n`, rooted at `root`.
    pub fn from_tree(tree: &DiGraph, root: NodeId) -> Result<Self> {
        let n = tree.node_count();
        if root >= n {
            return Err(Error::NodeNotFound(root));
        }
        if tree.edge_count() + 1 != n {
            return Err(Error::NotATree(format!(
                "{} edges for {} nodes",
                tree.edge_count(),
                n
            )));
        }

        let mut graph = Self::single(root);
        for (parent, child) in tree.bfs_edges(root) {
            graph.add_child(parent, child)?;
        }
        if graph.len() != n {
            return Err(Error::NotATree(format!(
                "only {} of {} nodes reachable from {root}",
                graph.len(),
                n
            )));
        }
        Ok(graph)
    }

    /// Attach a new node `child` under `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&parent) {
            return Err(Error::NodeNotFound(parent));
        }
        if self.nodes.contains_key(&child) {
            return Err(Error::DuplicateNode(child));
        }
        self.nodes.insert(
            child,
            PartNode {
                attributes: NodeAttributes::placeholder(child),
                mesh: None,
            },
        );
        self.order.push(child);
        self.edges.push((parent, child));
        self.parent.insert(child, parent);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node ids, root first.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// `(parent, child)` edges.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(&id).copied()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(p, _)| *p == id)
            .map(|(_, c)| *c)
            .collect()
    }

    pub fn attributes(&self, id: NodeId) -> Option<&NodeAttributes> {
        self.nodes.get(&id).map(|n| &n.attributes)
    }

    pub fn mesh(&self, id: NodeId) -> Option<&Mesh> {
        self.nodes.get(&id).and_then(|n| n.mesh.as_ref())
    }

    /// `(id, mesh)` for every node that has geometry, in node order.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.mesh(*id).map(|m| (*id, m)))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Store the attribute record and mesh of node `id`.
    ///
    /// The record's `id` and `cad_id` are overwritten with `id` so they always
    /// track the node they belong to.
    pub fn set_node_info(
        &mut self,
        id: NodeId,
        mut attributes: NodeAttributes,
        mesh: Option<Mesh>,
    ) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
        attributes.id = id;
        attributes.cad_id = id;
        node.attributes = attributes;
        node.mesh = mesh;
        Ok(())
    }

    /// Shift every node id by `offset`, including the ids stored inside the
    /// attribute records. Nothing changes if any id would leave the `usize`
    /// range.
    pub fn offset_ids(&mut self, offset: isize) -> Result<()> {
        if offset == 0 {
            return Ok(());
        }
        for &id in &self.order {
            shift(id, offset)?;
        }

        // Every shift below succeeds after the check above
        let map = |id: NodeId| id.wrapping_add_signed(offset);

        self.root = map(self.root);
        for id in self.order.iter_mut() {
            *id = map(*id);
        }
        for (p, c) in self.edges.iter_mut() {
            *p = map(*p);
            *c = map(*c);
        }
        self.parent = self.parent.drain().map(|(c, p)| (map(c), map(p))).collect();
        self.nodes = self
            .nodes
            .drain()
            .map(|(id, mut node)| {
                node.attributes.id = map(node.attributes.id);
                node.attributes.cad_id = map(node.attributes.cad_id);
                (map(id), node)
            })
            .collect();
        Ok(())
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Serializable view: root id, node records in node order, edges.
    pub fn dump(&self) -> GraphSnapshot {
        GraphSnapshot {
            root_id: self.root,
            nodes: self
                .order
                .iter()
                .filter_map(|id| self.attributes(*id))
                .map(NodeRecord::from)
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|&(src_id, dst_id)| EdgeRecord { src_id, dst_id })
                .collect(),
        }
    }

    /// Rebuild a graph (without meshes) from a snapshot.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self> {
        let mut graph = Self::single(snapshot.root_id);
        let mut pending: Vec<&EdgeRecord> = snapshot.edges.iter().collect();
        // Edges may arrive in any order; attach whatever has a known parent
        while !pending.is_empty() {
            let before = pending.len();
            let mut rest = Vec::with_capacity(before);
            for edge in pending {
                if graph.contains(edge.src_id) {
                    graph.add_child(edge.src_id, edge.dst_id)?;
                } else {
                    rest.push(edge);
                }
            }
            if rest.len() == before {
                return Err(Error::NotATree(format!(
                    "{} edges unreachable from root {}",
                    rest.len(),
                    snapshot.root_id
                )));
            }
            pending = rest;
        }

        for record in &snapshot.nodes {
            let attributes = NodeAttributes::try_from(record)?;
            graph.set_node_info(record.id, attributes, None)?;
        }
        Ok(graph)
    }
}

fn shift(id: NodeId, offset: isize) -> Result<NodeId> {
    id.checked_add_signed(offset)
        .ok_or(Error::IdUnderflow { id, offset })
}
