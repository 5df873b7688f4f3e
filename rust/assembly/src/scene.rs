// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly
//!
//! A [`CadScene`] owns the scene-wide id allocator. Objects are converted
//! with local ids and then shifted into a freshly allocated range, so every
//! node id in the scene is unique without any global counter.

use nalgebra::{Matrix4, Point3};
use part2cad_geometry::transform::{linear, quaternion_xyzw, translation};
use part2cad_geometry::Mesh;
use part2cad_graph::{
    IdAllocator, Joint, KinoGraph, NodeAttributes, NodeId, NodeType, PartGraph, PartLabel,
};
use rayon::prelude::*;

use crate::config::AssemblyConfig;
use crate::error::{Error, Result};
use crate::pipeline::{convert_object, ObjectAssembly};
use crate::point_cloud::PartPointCloud;

/// Label of background nodes.
pub const BACKGROUND_LABEL: &str = "Background";

/// Builder for a whole scene of objects and backgrounds.
#[derive(Debug, Clone)]
pub struct CadScene {
    config: AssemblyConfig,
    ids: IdAllocator,
    root_id: NodeId,
    objects: Vec<PartGraph>,
    backgrounds: Vec<PartGraph>,
    /// Object indices handed out so far (including failed objects)
    next_object: i64,
}

impl CadScene {
    pub fn new(config: AssemblyConfig) -> Self {
        let mut ids = IdAllocator::new();
        let root_id = ids.allocate(1).start;
        Self {
            config,
            ids,
            root_id,
            objects: Vec::new(),
            backgrounds: Vec::new(),
            next_object: 0,
        }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    pub fn objects(&self) -> &[PartGraph] {
        &self.objects
    }

    pub fn backgrounds(&self) -> &[PartGraph] {
        &self.backgrounds
    }

    /// Convert and add one object. Returns its root node id.
    pub fn add_object(&mut self, parts: &[PartPointCloud]) -> Result<NodeId> {
        let index = self.next_object;
        self.next_object += 1;
        let assembly = convert_object(parts, index, &self.config);
        self.place_object(index, assembly)
    }

    /// Convert several objects in parallel and add the ones that succeed, in
    /// input order.
    ///
    /// Ids are allocated after all conversions finish, so the result does not
    /// depend on thread scheduling. Each entry of the returned list is the
    /// object's root id or the error that dropped it.
    pub fn add_objects(&mut self, objects: &[Vec<PartPointCloud>]) -> Vec<Result<NodeId>> {
        let first = self.next_object;
        self.next_object += objects.len() as i64;

        let config = &self.config;
        let assemblies: Vec<(i64, Result<ObjectAssembly>)> = objects
            .par_iter()
            .enumerate()
            .map(|(k, parts)| {
                let index = first + k as i64;
                (index, convert_object(parts, index, config))
            })
            .collect();

        assemblies
            .into_iter()
            .map(|(index, assembly)| self.place_object(index, assembly))
            .collect()
    }

    fn place_object(&mut self, index: i64, assembly: Result<ObjectAssembly>) -> Result<NodeId> {
        let mut graph = match assembly {
            Ok(a) => a.graph,
            Err(e) => {
                tracing::warn!(object = index, error = %e, "Object dropped");
                return Err(e);
            }
        };

        // Ids are reserved only once the shift has succeeded
        let start = self.ids.peek();
        let offset = isize::try_from(start)
            .map_err(|_| Error::invariant(index, format!("id {start} out of range")))?;
        graph.offset_ids(offset)?;
        self.ids.allocate(graph.len());

        let root = graph.root();
        tracing::info!(object = index, root, nodes = graph.len(), "Object added to scene");
        self.objects.push(graph);
        Ok(root)
    }

    /// Add a background mesh as a single fixed node.
    ///
    /// `global_transform` must be rigid.
    pub fn add_background(&mut self, mesh: Mesh, global_transform: &Matrix4<f64>) -> Result<NodeId> {
        let id = self.ids.allocate(1).start;
        let mut graph = PartGraph::single(id);
        let attributes = NodeAttributes {
            id,
            cad_id: id,
            object_id: None,
            label: BACKGROUND_LABEL.to_string(),
            part_label: Some(PartLabel::Name("None".into())),
            node_type: NodeType::ObjectNode,
            orientation: quaternion_xyzw(&linear(global_transform)),
            position: translation(global_transform).into(),
            scale: 1.0,
            joint: Joint::Fixed,
            color: None,
        };
        graph.set_node_info(id, attributes, Some(mesh))?;

        tracing::debug!(id, "Background added to scene");
        self.backgrounds.push(graph);
        Ok(id)
    }

    /// Background given as raw points with one RGB color in `[0, 1]` per
    /// point. An empty `colors` slice leaves the points uncolored.
    pub fn add_background_points(
        &mut self,
        points: &[Point3<f64>],
        colors: &[[f64; 3]],
        global_transform: &Matrix4<f64>,
    ) -> Result<NodeId> {
        let mut mesh = Mesh::from_points(points);
        if !colors.is_empty() {
            mesh = mesh.with_colors(colors)?;
        }
        self.add_background(mesh, global_transform)
    }

    /// Gather the scene root, all objects and all backgrounds into one graph.
    pub fn create_kino_graph(&self) -> Result<KinoGraph> {
        let mut kino = KinoGraph::new(self.root_id)?;
        for graph in &self.objects {
            kino.add_object(graph.clone())?;
        }
        for graph in &self.backgrounds {
            kino.add_background(graph.clone())?;
        }
        Ok(kino)
    }
}

impl Default for CadScene {
    fn default() -> Self {
        Self::new(AssemblyConfig::default())
    }
}
