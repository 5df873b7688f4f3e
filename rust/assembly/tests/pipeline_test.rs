// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks of the part assembly pipeline.

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
use part2cad_assembly::{
    assemble_object, AlignmentRefiner, AssemblyConfig, CadScene, ContactScorer, KinematicTree,
    KinematicTreeBuilder, PartGraphAssembler, PartMeta, PartPointCloud, PartState,
    PrimitiveFitter,
};
use part2cad_geometry::primitives::{make_box, make_cylinder};
use part2cad_geometry::registration::sample_surface;
use part2cad_geometry::Primitive;
use part2cad_graph::{GraphSnapshot, Joint, NodeType, PartGraph};
use rand::prelude::*;
use serde_json::Value;

fn box_part(extents: [f64; 3], transform: Matrix4<f64>, part_id: i64) -> PartState {
    let extents = Vector3::from(extents);
    PartState {
        mesh: make_box(extents),
        transform,
        meta: PartMeta {
            object_id: 0,
            part_id,
            scale: 1.0,
            cost: 0.0,
            primitive: Primitive::Box { extents },
        },
    }
}

fn at(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

fn base_and_lid() -> Vec<PartState> {
    vec![
        box_part([1.0, 1.0, 1.0], Matrix4::identity(), 0),
        box_part([1.0, 1.0, 0.2], at(0.0, 0.0, 0.6), 1),
    ]
}

fn cloud_from_box(
    extents: [f64; 3],
    pose: &Matrix4<f64>,
    part_id: i64,
    seed: u64,
) -> PartPointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = sample_surface(&make_box(Vector3::from(extents)), 500, &mut rng)
        .unwrap()
        .into_iter()
        .map(|p| pose.transform_point(&p))
        .collect();
    PartPointCloud::new(points, 0, part_id)
}

#[test]
fn test_base_and_lid_end_to_end() {
    let config = AssemblyConfig::default();
    let states = base_and_lid();

    let (ab, ba) = ContactScorer::new(&config).score_states(&states[0], &states[1]);
    assert_relative_eq!(ab, 1.0, epsilon = 1e-9);
    assert_relative_eq!(ba, 1.0, epsilon = 1e-9);

    let out = assemble_object(states, 0, &config).unwrap();
    assert_eq!(out.tree.root, 0);
    assert_eq!(out.tree.bfs_edges(), vec![(0, 1)]);
    assert_eq!(out.graph.root(), 0);
    assert_eq!(out.graph.edges(), &[(0, 1)]);

    let lid = out.graph.attributes(1).unwrap();
    assert_eq!(lid.joint, Joint::Fixed);
    assert_relative_eq!(lid.position[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(lid.position[1], 0.0, epsilon = 1e-9);
    assert_relative_eq!(lid.position[2], 0.6, epsilon = 1e-9);
    assert_relative_eq!(lid.orientation[3], 1.0, epsilon = 1e-9);
}

#[test]
fn test_single_part_object() {
    let config = AssemblyConfig::default();
    let states = vec![box_part([0.5, 0.5, 0.5], at(1.0, 0.0, 0.0), 3)];
    let tree = KinematicTreeBuilder::new(&config).infer(&states).unwrap();
    assert!(tree.graph.is_none());
    assert_eq!(tree.root, 0);

    let graph = PartGraphAssembler::new(&config).assemble(&states, &tree, 0).unwrap();
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.root(), 0);
    assert!(graph.edges().is_empty());
    assert_eq!(graph.attributes(0).unwrap().position, [1.0, 0.0, 0.0]);
}

#[test]
fn test_too_few_points_never_fit() {
    let fitter = PrimitiveFitter::new(&AssemblyConfig::default());
    for n in 0..4 {
        let points = (0..n)
            .map(|i| Point3::new(i as f64, (i * i) as f64, 1.0 - i as f64))
            .collect();
        assert!(fitter.fit(&PartPointCloud::new(points, 0, 0)).is_none());
    }
}

#[test]
fn test_congruent_meshes_overlap_fully() {
    let scorer = ContactScorer::default();
    let pose = Rotation3::from_euler_angles(0.3, -0.2, 0.9).to_homogeneous();
    for mesh in [make_box(Vector3::new(0.3, 0.7, 1.1)), make_cylinder(0.2, 0.9)] {
        let posed = mesh.transformed(&pose);
        let (ab, ba) = scorer.volume_ratios(&posed, &posed);
        assert_relative_eq!(ab, 1.0, epsilon = 1e-6);
        assert_relative_eq!(ba, 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_tree_shape_on_scattered_parts() {
    let config = AssemblyConfig::default();
    let mut rng = StdRng::seed_from_u64(21);
    for n in 2..=6 {
        let states: Vec<PartState> = (0..n)
            .map(|k| {
                let x = rng.gen_range(-2.0..2.0);
                let y = rng.gen_range(-2.0..2.0);
                let z = rng.gen_range(0.0..2.0);
                box_part([0.3, 0.4, 0.5], at(x, y, z), k as i64)
            })
            .collect();
        let tree = KinematicTreeBuilder::new(&config).infer(&states).unwrap();
        let graph = tree.graph.as_ref().unwrap();
        assert_eq!(graph.edge_count(), n - 1);
        assert_eq!(graph.roots(), vec![tree.root]);
        assert_eq!(tree.bfs_edges().len(), n - 1);
    }
}

#[test]
fn test_alignment_twice_changes_nothing() {
    let mut states = base_and_lid();
    let tilt = Rotation3::from_euler_angles(0.05, 0.0, 0.1).to_homogeneous();
    states[1].transform = at(0.0, 0.0, 0.6) * tilt;
    let tree = KinematicTree {
        graph: Some({
            let mut g = part2cad_graph::DiGraph::with_nodes(2);
            g.add_edge(0, 1, 1.0).unwrap();
            g
        }),
        root: 0,
    };
    let refiner = AlignmentRefiner::default();
    refiner.refine(&mut states, &tree).unwrap();
    let first = states[1].transform;
    refiner.refine(&mut states, &tree).unwrap();
    assert!((states[1].transform - first).norm() < 1e-9);
}

#[test]
fn test_offset_round_trip_on_assembled_graph() {
    let out = assemble_object(base_and_lid(), 0, &AssemblyConfig::default()).unwrap();
    let mut graph: PartGraph = out.graph.clone();
    graph.offset_ids(7).unwrap();
    assert_eq!(graph.root(), 7);
    assert_eq!(graph.attributes(8).unwrap().cad_id, 8);
    graph.offset_ids(-7).unwrap();
    assert_eq!(graph.dump(), out.graph.dump());
}

#[test]
fn test_nearly_coincident_parts_score_without_error() {
    let a = box_part([1.0, 1.0, 1.0], Matrix4::identity(), 0);
    let b = box_part([1.0, 1.0, 1.0], at(1e-6, 1e-6, 1e-6), 1);
    let (ab, ba) = ContactScorer::default().score_states(&a, &b);
    assert!(ab.is_finite() && ba.is_finite());
}

#[test]
fn test_scene_from_point_clouds() {
    let base = cloud_from_box([1.0, 1.0, 1.0], &Matrix4::identity(), 0, 1);
    let lid = cloud_from_box([1.0, 1.0, 0.2], &at(0.0, 0.0, 0.6), 1, 2);
    let leg = cloud_from_box([0.2, 0.2, 0.8], &at(3.0, 0.0, 0.4), 0, 3);
    let broken = vec![PartPointCloud::new(vec![Point3::origin(); 3], 0, 0)];

    let mut scene = CadScene::default();
    let results = scene.add_objects(&[vec![base, lid], broken, vec![leg]]);
    assert_eq!(results.len(), 3);
    let cabinet = *results[0].as_ref().unwrap();
    assert!(cabinet == 1 || cabinet == 2);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().ok(), Some(&3));

    let points = [Point3::new(0.0, 0.0, -0.5), Point3::new(1.0, 1.0, -0.5)];
    let colors = [[0.5, 0.5, 0.5], [1.0, 1.0, 1.0]];
    scene
        .add_background_points(&points, &colors, &Matrix4::identity())
        .unwrap();

    let kino = scene.create_kino_graph().unwrap();
    let snapshot = kino.dump();
    assert_eq!(snapshot.root_id, 0);
    assert_eq!(snapshot.nodes.len(), 5);
    // One tree edge plus three attachments
    assert_eq!(snapshot.edges.len(), 4);
    assert_eq!(kino.contacts(), &[(0, cabinet), (0, 3), (0, 4)]);
    assert_eq!(kino.meshes().count(), 4);

    let json = kino.to_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    let nodes = value["nodes"].as_array().unwrap();
    assert_eq!(nodes[0]["type"], "ConceptNode");
    for node in &nodes[1..] {
        for key in [
            "id", "cad_id", "label", "part_label", "type", "orientation", "position", "scale",
            "joint_type",
        ] {
            assert!(node.get(key).is_some(), "missing {key} in {node}");
        }
        assert_eq!(node["type"], "ObjectNode");
    }
    assert_eq!(nodes[4]["label"], "Background");
    assert!(nodes[4].get("object_id").is_none());
    assert_eq!(nodes[3]["object_id"], 2);

    let parsed = GraphSnapshot::from_json(&json).unwrap();
    assert_eq!(parsed.edges, snapshot.edges);
    let ids: Vec<_> = parsed.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids.len(), 5);
    assert!((0..5).all(|id| ids.contains(&id)));
    assert_eq!(parsed.node(0).unwrap().node_type, NodeType::ConceptNode);
}
