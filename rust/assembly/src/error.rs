// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for assembly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning part point clouds into a part graph
#[derive(Error, Debug)]
pub enum Error {
    /// Too few or degenerate points; the part is skipped
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// No primitive candidate could be registered; the part is skipped
    #[error("No primitive fit found: {0}")]
    NoFitFound(String),

    /// A numerical optimization that must succeed did not
    #[error("Optimization failed: {0}")]
    OptimizationFailure(String),

    /// Assembly of one object hit a broken invariant
    #[error("Invariant violated in object {object}: {detail}")]
    InvariantViolation { object: i64, detail: String },

    #[error(transparent)]
    Geometry(#[from] part2cad_geometry::Error),

    #[error(transparent)]
    Graph(#[from] part2cad_graph::Error),
}

impl Error {
    pub fn invariant(object: i64, detail: impl Into<String>) -> Self {
        Error::InvariantViolation {
            object,
            detail: detail.into(),
        }
    }
}
