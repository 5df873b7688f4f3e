// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Part2CAD Graph
//!
//! Graph structures for kinematic part assembly.
//!
//! A [`DiGraph`] holds pairwise support weights between the parts of one
//! object; an [`ArborescenceSolver`] (by default [`Edmonds`]) turns it into a
//! rooted kinematic tree. The tree is materialised as a [`PartGraph`] carrying
//! per-node poses, joints and meshes, and all object and background graphs of a
//! scene are gathered in a [`KinoGraph`] for JSON export.

pub mod arborescence;
pub mod digraph;
pub mod error;
pub mod id_alloc;
pub mod kino_graph;
pub mod part_graph;
pub mod serialization;

/// Node identifier. Local to a graph until it is offset into a scene range.
pub type NodeId = usize;

pub use arborescence::{tree_root, ArborescenceSolver, Edmonds};
pub use digraph::{DiEdge, DiGraph};
pub use error::{Error, Result};
pub use id_alloc::IdAllocator;
pub use kino_graph::{KinoGraph, SCENE_LABEL};
pub use part_graph::{
    Joint, JointType, LinkOffset, NodeAttributes, NodeType, PartGraph, PartLabel,
    IDENTITY_QUATERNION,
};
pub use serialization::{EdgeRecord, GraphSnapshot, NodeRecord};
