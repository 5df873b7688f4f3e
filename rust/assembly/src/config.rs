// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembly configuration loaded from environment variables.

use std::str::FromStr;

use nalgebra::Vector3;
use part2cad_geometry::RegistrationConfig;
use part2cad_graph::JointType;
use rustc_hash::{FxHashMap, FxHashSet};

/// Parts with fewer points than this are never fitted.
pub const MIN_PART_POINTS: usize = 4;

/// World "down" direction used to pick joint axes.
pub const GRAVITY_DIRECTION: [f64; 3] = [0.0, 0.0, -1.0];

/// [`GRAVITY_DIRECTION`] as a vector.
pub fn gravity() -> Vector3<f64> {
    Vector3::from(GRAVITY_DIRECTION)
}

/// Object category names keyed by semantic object id.
pub const DEFAULT_SEMANTIC_LABELS: [(i64, &str); 8] = [
    (0, "Table"),
    (1, "Chair"),
    (2, "Bed"),
    (3, "StorageFurniture"),
    (4, "TrashCan"),
    (5, "Microwave"),
    (6, "Dishwasher"),
    (7, "Display"),
];

/// Label used for semantic ids missing from the table.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Which part labels become articulated joints.
///
/// Revolute membership is checked first; parts in neither set get a fixed
/// joint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JointClassification {
    pub revolute: FxHashSet<i64>,
    pub prismatic: FxHashSet<i64>,
}

impl JointClassification {
    pub fn new(
        revolute: impl IntoIterator<Item = i64>,
        prismatic: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            revolute: revolute.into_iter().collect(),
            prismatic: prismatic.into_iter().collect(),
        }
    }

    pub fn classify(&self, part_id: i64) -> JointType {
        if self.revolute.contains(&part_id) {
            JointType::Revolute
        } else if self.prismatic.contains(&part_id) {
            JointType::Prismatic
        } else {
            JointType::Fixed
        }
    }
}

/// Object category lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticLabels {
    names: FxHashMap<i64, String>,
}

impl Default for SemanticLabels {
    fn default() -> Self {
        Self {
            names: DEFAULT_SEMANTIC_LABELS
                .iter()
                .map(|(id, name)| (*id, (*name).to_string()))
                .collect(),
        }
    }
}

impl SemanticLabels {
    pub fn label(&self, object_id: i64) -> &str {
        self.names
            .get(&object_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn insert(&mut self, object_id: i64, name: impl Into<String>) {
        self.names.insert(object_id, name.into());
    }
}

/// Tunables of the part assembly pipeline.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Minimum |cos| between face normals for a face contact.
    pub contact_angle_threshold: f64,
    /// Maximum plane distance for a face contact.
    pub contact_distance_threshold: f64,
    /// Minimum |cos| between box axes for alignment snapping.
    pub alignment_angle_threshold: f64,
    /// Snap child part axes to their parents after tree inference.
    pub refine_alignment: bool,
    /// Subtracted from the longest extent when sizing the cone candidate.
    pub cone_height_trim: f64,
    /// Seed for palette shuffling.
    pub seed: u64,
    /// ICP settings; `registration.enable_scale` toggles scale estimation.
    pub registration: RegistrationConfig,
    pub joints: JointClassification,
    pub labels: SemanticLabels,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            contact_angle_threshold: 0.99,
            contact_distance_threshold: 0.03,
            alignment_angle_threshold: 0.97,
            refine_alignment: true,
            cone_height_trim: 0.15,
            seed: 10,
            registration: RegistrationConfig::default(),
            joints: JointClassification::default(),
            labels: SemanticLabels::default(),
        }
    }
}

impl AssemblyConfig {
    /// Load configuration from `PART2CAD_*` environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let seed = env_or("PART2CAD_SEED", defaults.seed);
        Self {
            contact_angle_threshold: env_or(
                "PART2CAD_CONTACT_ANGLE",
                defaults.contact_angle_threshold,
            ),
            contact_distance_threshold: env_or(
                "PART2CAD_CONTACT_DISTANCE",
                defaults.contact_distance_threshold,
            ),
            alignment_angle_threshold: env_or(
                "PART2CAD_ALIGNMENT_ANGLE",
                defaults.alignment_angle_threshold,
            ),
            refine_alignment: env_or("PART2CAD_REFINE_ALIGNMENT", defaults.refine_alignment),
            cone_height_trim: env_or("PART2CAD_CONE_TRIM", defaults.cone_height_trim),
            seed,
            registration: RegistrationConfig {
                max_iterations: env_or(
                    "PART2CAD_ICP_ITERATIONS",
                    defaults.registration.max_iterations,
                ),
                surface_samples: env_or(
                    "PART2CAD_ICP_SAMPLES",
                    defaults.registration.surface_samples,
                ),
                max_target_points: env_or(
                    "PART2CAD_ICP_MAX_TARGET",
                    defaults.registration.max_target_points,
                ),
                enable_scale: env_or("PART2CAD_ENABLE_SCALE", defaults.registration.enable_scale),
                seed,
                ..defaults.registration
            },
            joints: JointClassification::new(
                env_list("PART2CAD_REVOLUTE_PARTS"),
                env_list("PART2CAD_PRISMATIC_PARTS"),
            ),
            labels: defaults.labels,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Comma-separated integer list; malformed entries are skipped.
fn env_list(key: &str) -> Vec<i64> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}
