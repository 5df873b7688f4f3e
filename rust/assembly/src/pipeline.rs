// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-object conversion: fit, infer, refine, assemble.

use part2cad_graph::PartGraph;

use crate::alignment::AlignmentRefiner;
use crate::assembler::PartGraphAssembler;
use crate::config::AssemblyConfig;
use crate::error::{Error, Result};
use crate::fitter::PrimitiveFitter;
use crate::kinematics::{KinematicTree, KinematicTreeBuilder};
use crate::point_cloud::PartPointCloud;
use crate::state::PartState;

/// Output of one object conversion.
#[derive(Debug, Clone)]
pub struct ObjectAssembly {
    /// Part graph with local node ids `0..n`
    pub graph: PartGraph,
    /// Final part states, refined if alignment is enabled
    pub states: Vec<PartState>,
    pub tree: KinematicTree,
}

/// Convert the part clouds of one object into a part graph.
///
/// Parts that cannot be fitted are dropped; the object fails only if no part
/// survives or the tree cannot be built.
pub fn convert_object(
    parts: &[PartPointCloud],
    object_index: i64,
    config: &AssemblyConfig,
) -> Result<ObjectAssembly> {
    let states = PrimitiveFitter::new(config).fit_object(parts);
    tracing::info!(
        object = object_index,
        parts = parts.len(),
        fitted = states.len(),
        "Primitive fitting complete"
    );
    assemble_object(states, object_index, config)
}

/// Assemble already fitted parts.
pub fn assemble_object(
    mut states: Vec<PartState>,
    object_index: i64,
    config: &AssemblyConfig,
) -> Result<ObjectAssembly> {
    if states.is_empty() {
        return Err(Error::DegenerateInput(format!(
            "object {object_index} has no fitted parts"
        )));
    }

    let tree = KinematicTreeBuilder::new(config)
        .infer(&states)
        .map_err(|e| match e {
            Error::Graph(g) => Error::invariant(object_index, g.to_string()),
            other => other,
        })?;

    if config.refine_alignment {
        AlignmentRefiner::new(config).refine(&mut states, &tree)?;
    }

    let graph = PartGraphAssembler::new(config).assemble(&states, &tree, object_index)?;
    tracing::info!(
        object = object_index,
        root = tree.root,
        nodes = graph.len(),
        "Object assembled"
    );

    Ok(ObjectAssembly {
        graph,
        states,
        tree,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::box_state;

    #[test]
    fn test_empty_object_fails() {
        let err = assemble_object(Vec::new(), 3, &AssemblyConfig::default()).unwrap_err();
        assert!(matches!(err, Error::DegenerateInput(_)));
    }

    #[test]
    fn test_unfittable_parts_fail_object() {
        let parts = vec![PartPointCloud::new(Vec::new(), 0, 0)];
        assert!(convert_object(&parts, 0, &AssemblyConfig::default()).is_err());
    }

    #[test]
    fn test_assemble_without_refinement() {
        let mut config = AssemblyConfig::default();
        config.refine_alignment = false;
        let states = vec![
            box_state([1.0, 1.0, 1.0], [0.0, 0.0, 0.0], 0),
            box_state([1.0, 1.0, 0.2], [0.0, 0.0, 0.6], 1),
        ];
        let out = assemble_object(states, 0, &config).unwrap();
        assert_eq!(out.graph.edges(), &[(0, 1)]);
        assert_eq!(out.states.len(), 2);
    }
}
