// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Invalid primitive parameters: {0}")]
    InvalidPrimitive(String),

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("SVD did not produce singular vectors")]
    SvdFailed,
}

impl Error {
    /// Shorthand for a degenerate-geometry error
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Error::DegenerateGeometry(msg.into())
    }
}
