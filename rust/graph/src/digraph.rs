// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal weighted directed graph.
//!
//! Nodes are the dense indices `0..node_count()`; for part assembly a node is
//! a part's position in the fitted-part list. Both adjacency directions are
//! kept so predecessor and successor queries are O(degree).

use std::collections::VecDeque;

use crate::error::{Error, Result};

/// A directed, weighted edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiEdge {
    /// Source node index.
    pub source: usize,
    /// Target node index.
    pub target: usize,
    /// Edge weight.
    pub weight: f64,
}

/// Directed graph over dense node indices.
#[derive(Debug, Clone, Default)]
pub struct DiGraph {
    edges: Vec<DiEdge>,
    /// Outgoing edge indices per node.
    out_adj: Vec<Vec<usize>>,
    /// Incoming edge indices per node.
    in_adj: Vec<Vec<usize>>,
}

impl DiGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with `n` isolated nodes.
    pub fn with_nodes(n: usize) -> Self {
        Self {
            edges: Vec::new(),
            out_adj: vec![Vec::new(); n],
            in_adj: vec![Vec::new(); n],
        }
    }

    /// Complete directed graph on `n` nodes; `weight(i, j)` is called once per
    /// ordered pair, in row-major order.
    pub fn complete(n: usize, mut weight: impl FnMut(usize, usize) -> f64) -> Self {
        let mut graph = Self::with_nodes(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    graph.push_edge(i, j, weight(i, j));
                }
            }
        }
        graph
    }

    // =========================================================================
    // Graph mutation
    // =========================================================================

    /// Adds a node. Returns its index.
    pub fn add_node(&mut self) -> usize {
        self.out_adj.push(Vec::new());
        self.in_adj.push(Vec::new());
        self.out_adj.len() - 1
    }

    /// Adds a directed edge. Returns its index.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) -> Result<usize> {
        for node in [source, target] {
            if node >= self.node_count() {
                return Err(Error::NodeNotFound(node));
            }
        }
        Ok(self.push_edge(source, target, weight))
    }

    fn push_edge(&mut self, source: usize, target: usize, weight: f64) -> usize {
        let idx = self.edges.len();
        self.edges.push(DiEdge {
            source,
            target,
            weight,
        });
        self.out_adj[source].push(idx);
        self.in_adj[target].push(idx);
        idx
    }

    // =========================================================================
    // Graph accessors
    // =========================================================================

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.out_adj.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[DiEdge] {
        &self.edges
    }

    /// Sources of edges entering `node`.
    pub fn predecessors(&self, node: usize) -> Vec<usize> {
        self.in_adj
            .get(node)
            .map(|adj| adj.iter().map(|&e| self.edges[e].source).collect())
            .unwrap_or_default()
    }

    /// Targets of edges leaving `node`.
    pub fn successors(&self, node: usize) -> Vec<usize> {
        self.out_adj
            .get(node)
            .map(|adj| adj.iter().map(|&e| self.edges[e].target).collect())
            .unwrap_or_default()
    }

    /// Number of edges entering `node`.
    pub fn in_degree(&self, node: usize) -> usize {
        self.in_adj.get(node).map_or(0, Vec::len)
    }

    /// Number of edges leaving `node`.
    pub fn out_degree(&self, node: usize) -> usize {
        self.out_adj.get(node).map_or(0, Vec::len)
    }

    /// Nodes with no incoming edge, ascending.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.node_count())
            .filter(|&n| self.in_degree(n) == 0)
            .collect()
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Breadth-first tree edges `(parent, child)` reachable from `source`.
    ///
    /// Every parent is reported before any of its children; successors are
    /// visited in edge insertion order.
    pub fn bfs_edges(&self, source: usize) -> Vec<(usize, usize)> {
        let n = self.node_count();
        if source >= n {
            return Vec::new();
        }
        let mut visited = vec![false; n];
        let mut queue = VecDeque::new();
        let mut out = Vec::new();

        visited[source] = true;
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            for &e in &self.out_adj[node] {
                let next = self.edges[e].target;
                if !visited[next] {
                    visited[next] = true;
                    out.push((node, next));
                    queue.push_back(next);
                }
            }
        }

        out
    }
}
