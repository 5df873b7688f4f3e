// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Maximum-weight spanning arborescence.
//!
//! [`Edmonds`] implements the Chu-Liu/Edmonds contraction algorithm. The root
//! is not fixed in advance: a virtual super-root is connected to every node
//! with a large negative weight, so the optimum uses exactly one such edge
//! whenever a single-rooted arborescence exists, and its target becomes the
//! root.
//!
//! Ties are broken towards the lowest edge index (and so, for graphs built by
//! [`DiGraph::complete`], towards the lowest node index), which keeps the
//! chosen tree reproducible.

use crate::digraph::DiGraph;
use crate::error::{Error, Result};

/// A solver returning a spanning arborescence of maximum total weight.
///
/// The returned graph has the same node set as the input and contains only
/// the chosen edges.
pub trait ArborescenceSolver {
    fn maximum_arborescence(&self, graph: &DiGraph) -> Result<DiGraph>;
}

/// Chu-Liu/Edmonds solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Edmonds;

impl ArborescenceSolver for Edmonds {
    fn maximum_arborescence(&self, graph: &DiGraph) -> Result<DiGraph> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::NoArborescence("empty graph".into()));
        }
        if graph.edges().iter().any(|e| !e.weight.is_finite()) {
            return Err(Error::NoArborescence("non-finite edge weight".into()));
        }

        let super_root = n;
        let penalty = 1.0 + graph.edges().iter().map(|e| e.weight.abs()).sum::<f64>();

        let mut edges: Vec<WorkEdge> = (0..n)
            .map(|v| WorkEdge {
                source: super_root,
                target: v,
                weight: -penalty,
                origin: usize::MAX,
            })
            .collect();
        edges.extend(graph.edges().iter().enumerate().map(|(idx, e)| WorkEdge {
            source: e.source,
            target: e.target,
            weight: e.weight,
            origin: idx,
        }));

        let chosen = contract(n + 1, super_root, &edges)
            .ok_or_else(|| Error::NoArborescence("a node is unreachable".into()))?;

        let mut tree = DiGraph::with_nodes(n);
        let mut picked: Vec<usize> = chosen
            .into_iter()
            .map(|k| edges[k].origin)
            .filter(|&origin| origin != usize::MAX)
            .collect();
        picked.sort_unstable();
        for origin in picked {
            let e = graph.edges()[origin];
            tree.add_edge(e.source, e.target, e.weight)?;
        }
        Ok(tree)
    }
}

/// The unique node without a parent.
pub fn tree_root(tree: &DiGraph) -> Result<usize> {
    let roots = tree.roots();
    match roots.as_slice() {
        [root] => Ok(*root),
        _ => Err(Error::RootCount(roots)),
    }
}

#[derive(Debug, Clone, Copy)]
struct WorkEdge {
    source: usize,
    target: usize,
    weight: f64,
    /// Index of the edge this one stands for one level up.
    origin: usize,
}

/// One contraction level. Returns indices into `edges` forming a maximum
/// arborescence rooted at `root`, or `None` if some node has no incoming edge.
fn contract(n: usize, root: usize, edges: &[WorkEdge]) -> Option<Vec<usize>> {
    // Heaviest incoming edge per node
    let mut best_in: Vec<Option<usize>> = vec![None; n];
    for (k, e) in edges.iter().enumerate() {
        if e.target == root || e.source == e.target {
            continue;
        }
        let better = match best_in[e.target] {
            Some(b) => e.weight > edges[b].weight,
            None => true,
        };
        if better {
            best_in[e.target] = Some(k);
        }
    }

    let mut parent_edge = vec![usize::MAX; n];
    for v in (0..n).filter(|&v| v != root) {
        parent_edge[v] = best_in[v]?;
    }

    // Find cycles among the chosen edges
    let mut component = vec![usize::MAX; n];
    let mut in_cycle = vec![false; n];
    let mut walk_id = vec![usize::MAX; n];
    let mut cycles = 0;
    for start in 0..n {
        let mut x = start;
        while x != root && walk_id[x] == usize::MAX && component[x] == usize::MAX {
            walk_id[x] = start;
            x = edges[parent_edge[x]].source;
        }
        if x != root && walk_id[x] == start && component[x] == usize::MAX {
            let mut y = x;
            loop {
                in_cycle[y] = true;
                component[y] = cycles;
                y = edges[parent_edge[y]].source;
                if y == x {
                    break;
                }
            }
            cycles += 1;
        }
    }

    if cycles == 0 {
        return Some(parent_edge.into_iter().filter(|&k| k != usize::MAX).collect());
    }

    let mut next = cycles;
    for c in component.iter_mut() {
        if *c == usize::MAX {
            *c = next;
            next += 1;
        }
    }

    // Edges entering a cycle are charged for the cycle edge they replace
    let mut reduced = Vec::with_capacity(edges.len());
    for (k, e) in edges.iter().enumerate() {
        let (cu, cv) = (component[e.source], component[e.target]);
        if cu == cv {
            continue;
        }
        let weight = if in_cycle[e.target] {
            e.weight - edges[parent_edge[e.target]].weight
        } else {
            e.weight
        };
        reduced.push(WorkEdge {
            source: cu,
            target: cv,
            weight,
            origin: k,
        });
    }

    let sub = contract(next, component[root], &reduced)?;

    let mut chosen: Vec<usize> = sub.iter().map(|&s| reduced[s].origin).collect();
    let mut entered = vec![false; n];
    for &k in &chosen {
        entered[edges[k].target] = true;
    }
    for v in 0..n {
        if in_cycle[v] && !entered[v] {
            chosen.push(parent_edge[v]);
        }
    }
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_weight(tree: &DiGraph) -> f64 {
        tree.edges().iter().map(|e| e.weight).sum()
    }

    /// Exhaustive maximum over all parent assignments (small n only).
    fn brute_force(graph: &DiGraph) -> f64 {
        let n = graph.node_count();
        let weight = |i: usize, j: usize| {
            graph
                .edges()
                .iter()
                .filter(|e| e.source == i && e.target == j)
                .map(|e| e.weight)
                .fold(f64::MIN, f64::max)
        };
        let mut best = f64::MIN;
        for root in 0..n {
            let others: Vec<usize> = (0..n).filter(|&v| v != root).collect();
            let combos = n.pow(others.len() as u32);
            'assign: for code in 0..combos {
                let mut parent = vec![usize::MAX; n];
                let mut c = code;
                for &v in &others {
                    parent[v] = c % n;
                    c /= n;
                    if parent[v] == v {
                        continue 'assign;
                    }
                }
                // Every node must reach the root
                for &v in &others {
                    let mut x = v;
                    let mut steps = 0;
                    while x != root {
                        x = parent[x];
                        steps += 1;
                        if steps > n {
                            continue 'assign;
                        }
                    }
                }
                let total: f64 = others.iter().map(|&v| weight(parent[v], v)).sum();
                best = best.max(total);
            }
        }
        best
    }

    #[test]
    fn two_nodes_tie_picks_lowest_root() {
        let g = DiGraph::complete(2, |_, _| 1.0f64.exp());
        let tree = Edmonds.maximum_arborescence(&g).unwrap();
        assert_eq!(tree.edge_count(), 1);
        assert_eq!(tree.edges()[0].source, 0);
        assert_eq!(tree.edges()[0].target, 1);
        assert_eq!(tree_root(&tree).unwrap(), 0);
    }

    #[test]
    fn asymmetric_weights_choose_heavier_direction() {
        let g = DiGraph::complete(2, |i, _| if i == 1 { 3.0 } else { 1.0 });
        let tree = Edmonds.maximum_arborescence(&g).unwrap();
        assert_eq!(tree_root(&tree).unwrap(), 1);
    }

    #[test]
    fn cycle_is_broken_optimally() {
        // Heavy 1 -> 2 -> 3 -> 1 cycle, 0 feeds it weakly.
        let w = |i: usize, j: usize| match (i, j) {
            (1, 2) | (2, 3) | (3, 1) => 10.0,
            (0, 3) => 2.0,
            (0, _) => 1.0,
            _ => 0.5,
        };
        let g = DiGraph::complete(4, w);
        let tree = Edmonds.maximum_arborescence(&g).unwrap();
        assert_eq!(tree.edge_count(), 3);
        assert!((total_weight(&tree) - brute_force(&g)).abs() < 1e-9);
    }

    #[test]
    fn matches_brute_force_on_complete_graphs() {
        for n in 2..=5 {
            for seed in 0..6u64 {
                let g = DiGraph::complete(n, |i, j| {
                    let h = (i as u64 * 7919 + j as u64 * 104729 + seed * 31337) % 1000;
                    (h as f64 / 250.0).exp()
                });
                let tree = Edmonds.maximum_arborescence(&g).unwrap();
                assert_eq!(tree.edge_count(), n - 1);
                let root = tree_root(&tree).unwrap();
                for v in (0..n).filter(|&v| v != root) {
                    assert_eq!(tree.in_degree(v), 1);
                }
                assert_eq!(tree.bfs_edges(root).len(), n - 1);
                assert!((total_weight(&tree) - brute_force(&g)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn single_node_has_no_edges() {
        let g = DiGraph::with_nodes(1);
        let tree = Edmonds.maximum_arborescence(&g).unwrap();
        assert_eq!(tree.edge_count(), 0);
        assert_eq!(tree_root(&tree).unwrap(), 0);
    }

    #[test]
    fn disconnected_graph_has_two_roots() {
        let mut g = DiGraph::with_nodes(4);
        g.add_edge(0, 1, 1.0).unwrap();
        g.add_edge(2, 3, 1.0).unwrap();
        let tree = Edmonds.maximum_arborescence(&g).unwrap();
        assert!(matches!(tree_root(&tree), Err(Error::RootCount(r)) if r == vec![0, 2]));
    }

    #[test]
    fn rejects_empty_and_nan() {
        assert!(Edmonds.maximum_arborescence(&DiGraph::new()).is_err());
        let g = DiGraph::complete(2, |_, _| f64::NAN);
        assert!(Edmonds.maximum_arborescence(&g).is_err());
    }
}
