// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kinematic tree inference
//!
//! Every ordered part pair gets an edge weighted by `exp(score)`, where the
//! score is the contact support of the source for the target. The maximum
//! spanning arborescence of that complete graph is the kinematic tree; its
//! single parentless node is the root part.

use part2cad_graph::{tree_root, ArborescenceSolver, DiGraph, Edmonds};

use crate::config::AssemblyConfig;
use crate::contact::ContactScorer;
use crate::error::{Error, Result};
use crate::state::{PartState, PosedPart};

/// Inferred tree over part indices.
#[derive(Debug, Clone)]
pub struct KinematicTree {
    /// `None` when the object has a single part
    pub graph: Option<DiGraph>,
    pub root: usize,
}

impl KinematicTree {
    pub fn single() -> Self {
        Self {
            graph: None,
            root: 0,
        }
    }

    /// Children of `node`; empty for single-part trees.
    pub fn children(&self, node: usize) -> Vec<usize> {
        self.graph
            .as_ref()
            .map(|g| g.successors(node))
            .unwrap_or_default()
    }

    /// `(parent, child)` pairs, parents before children.
    pub fn bfs_edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .as_ref()
            .map(|g| g.bfs_edges(self.root))
            .unwrap_or_default()
    }
}

/// Builds kinematic trees from contact scores.
#[derive(Debug, Clone)]
pub struct KinematicTreeBuilder<S = Edmonds> {
    scorer: ContactScorer,
    solver: S,
}

impl KinematicTreeBuilder<Edmonds> {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            scorer: ContactScorer::new(config),
            solver: Edmonds,
        }
    }
}

impl<S: ArborescenceSolver> KinematicTreeBuilder<S> {
    pub fn with_solver(scorer: ContactScorer, solver: S) -> Self {
        Self { scorer, solver }
    }

    /// `weights[i][j] = exp(score of i supporting j)`; the diagonal is unused.
    ///
    /// Each unordered pair is scored once, on the calling thread.
    pub fn weights(&self, states: &[PartState]) -> Vec<Vec<f64>> {
        let n = states.len();
        let posed: Vec<PosedPart> = states.iter().map(PosedPart::from_state).collect();
        let mut weights = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let (s_ij, s_ji) = self.scorer.score_posed(&posed[i], &posed[j]);
                tracing::debug!(i, j, s_ij, s_ji, "Contact score");
                weights[i][j] = s_ij.exp();
                weights[j][i] = s_ji.exp();
            }
        }
        weights
    }

    /// Infer the kinematic tree of one object's parts.
    pub fn infer(&self, states: &[PartState]) -> Result<KinematicTree> {
        match states.len() {
            0 => return Err(Error::DegenerateInput("object has no fitted parts".into())),
            1 => return Ok(KinematicTree::single()),
            _ => {}
        }

        let weights = self.weights(states);
        let graph = DiGraph::complete(states.len(), |i, j| weights[i][j]);
        let tree = self
            .solver
            .maximum_arborescence(&graph)
            .map_err(|e| Error::OptimizationFailure(e.to_string()))?;
        let root = tree_root(&tree)?;

        tracing::debug!(root, edges = tree.edge_count(), "Kinematic tree inferred");
        Ok(KinematicTree {
            graph: Some(tree),
            root,
        })
    }
}
