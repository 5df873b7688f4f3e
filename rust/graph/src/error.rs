// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for graph operations.

use crate::NodeId;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced node is not part of the graph.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node id was inserted twice into the same graph.
    #[error("duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// Two graphs merged into one scene share node ids.
    #[error("node id collision: {0:?}")]
    IdCollision(Vec<NodeId>),

    /// Offsetting ids would make one of them negative (or overflow).
    #[error("offset {offset} moves node {id} out of range")]
    IdUnderflow { id: NodeId, offset: isize },

    /// A tree must have exactly one node without a parent.
    #[error("expected exactly one root, found {0:?}")]
    RootCount(Vec<NodeId>),

    /// The edge set does not form a tree (e.g. a node with two parents).
    #[error("not a tree: {0}")]
    NotATree(String),

    /// No spanning arborescence exists for the input graph.
    #[error("no spanning arborescence: {0}")]
    NoArborescence(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
