// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Part2CAD Assembly
//!
//! Turns instance-segmented part point clouds into articulated CAD part
//! graphs.
//!
//! For each object the pipeline runs:
//!
//! 1. [`PrimitiveFitter`]: best of five primitive solids per part, registered
//!    onto the points.
//! 2. [`ContactScorer`]: directional support scores between every part pair.
//! 3. [`KinematicTreeBuilder`]: maximum spanning arborescence of the scores.
//! 4. [`AlignmentRefiner`]: snaps child axes onto their parents.
//! 5. [`PartGraphAssembler`]: parent-relative poses, joints and colors.
//!
//! [`CadScene`] runs this for many objects and collects them with background
//! geometry into a [`part2cad_graph::KinoGraph`].

pub mod alignment;
pub mod assembler;
pub mod config;
pub mod contact;
pub mod error;
pub mod fitter;
pub mod kinematics;
pub mod palette;
pub mod pipeline;
pub mod point_cloud;
pub mod scene;
pub mod state;

pub use alignment::AlignmentRefiner;
pub use assembler::{joint_frame, JointFrame, PartGraphAssembler};
pub use config::{
    AssemblyConfig, JointClassification, SemanticLabels, GRAVITY_DIRECTION, MIN_PART_POINTS,
};
pub use contact::ContactScorer;
pub use error::{Error, Result};
pub use fitter::{PrimitiveFit, PrimitiveFitter};
pub use kinematics::{KinematicTree, KinematicTreeBuilder};
pub use pipeline::{assemble_object, convert_object, ObjectAssembly};
pub use point_cloud::{LabeledPoint, PartPointCloud};
pub use scene::{CadScene, BACKGROUND_LABEL};
pub use state::{PartMeta, PartState, PosedPart};
