// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene-level graph: one concept root with every object and background
//! graph attached beneath it.

use part2cad_geometry::Mesh;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::part_graph::{NodeAttributes, PartGraph};
use crate::serialization::{EdgeRecord, GraphSnapshot};
use crate::NodeId;

/// Label of the scene root node.
pub const SCENE_LABEL: &str = "scene";

/// Scene graph ready for export.
#[derive(Debug, Clone)]
pub struct KinoGraph {
    root: PartGraph,
    objects: Vec<PartGraph>,
    backgrounds: Vec<PartGraph>,
    /// Attachment edges `(scene root, sub-graph root)`.
    contacts: Vec<(NodeId, NodeId)>,
    used_ids: FxHashSet<NodeId>,
}

impl KinoGraph {
    /// Scene with a `ConceptNode` root labelled `scene`.
    pub fn new(root_id: NodeId) -> Result<Self> {
        let mut root = PartGraph::single(root_id);
        root.set_node_info(root_id, NodeAttributes::concept(root_id, SCENE_LABEL), None)?;
        let mut used_ids = FxHashSet::default();
        used_ids.insert(root_id);
        Ok(Self {
            root,
            objects: Vec::new(),
            backgrounds: Vec::new(),
            contacts: Vec::new(),
            used_ids,
        })
    }

    /// Attach an object graph under the scene root.
    pub fn add_object(&mut self, graph: PartGraph) -> Result<()> {
        self.claim_ids(&graph)?;
        self.contacts.push((self.root.root(), graph.root()));
        self.objects.push(graph);
        Ok(())
    }

    /// Attach a background graph under the scene root.
    pub fn add_background(&mut self, graph: PartGraph) -> Result<()> {
        self.claim_ids(&graph)?;
        self.contacts.push((self.root.root(), graph.root()));
        self.backgrounds.push(graph);
        Ok(())
    }

    fn claim_ids(&mut self, graph: &PartGraph) -> Result<()> {
        let mut clashes: Vec<NodeId> = graph
            .node_ids()
            .iter()
            .copied()
            .filter(|id| self.used_ids.contains(id))
            .collect();
        if !clashes.is_empty() {
            clashes.sort_unstable();
            return Err(Error::IdCollision(clashes));
        }
        self.used_ids.extend(graph.node_ids().iter().copied());
        Ok(())
    }

    pub fn root_id(&self) -> NodeId {
        self.root.root()
    }

    pub fn objects(&self) -> &[PartGraph] {
        &self.objects
    }

    pub fn backgrounds(&self) -> &[PartGraph] {
        &self.backgrounds
    }

    pub fn contacts(&self) -> &[(NodeId, NodeId)] {
        &self.contacts
    }

    /// Total number of nodes across all graphs.
    pub fn node_count(&self) -> usize {
        self.used_ids.len()
    }

    fn graphs(&self) -> impl Iterator<Item = &PartGraph> + '_ {
        std::iter::once(&self.root)
            .chain(self.objects.iter())
            .chain(self.backgrounds.iter())
    }

    /// Flatten every graph into one snapshot rooted at the scene root.
    ///
    /// Nodes and tree edges appear graph by graph (root, objects,
    /// backgrounds); attachment edges follow at the end.
    pub fn dump(&self) -> GraphSnapshot {
        let mut nodes = Vec::with_capacity(self.node_count());
        let mut edges = Vec::new();
        for graph in self.graphs() {
            let snapshot = graph.dump();
            nodes.extend(snapshot.nodes);
            edges.extend(snapshot.edges);
        }
        edges.extend(
            self.contacts
                .iter()
                .map(|&(src_id, dst_id)| EdgeRecord { src_id, dst_id }),
        );
        GraphSnapshot {
            root_id: self.root_id(),
            nodes,
            edges,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        self.dump().to_json()
    }

    /// Mesh of node `id`, wherever it lives.
    pub fn mesh(&self, id: NodeId) -> Option<&Mesh> {
        self.graphs().find_map(|g| g.mesh(id))
    }

    /// `(id, mesh)` for every node with geometry, in dump order.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> + '_ {
        self.graphs().flat_map(|g| g.meshes())
    }
}
