// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene-level node id allocation.
//!
//! Each object or background graph is built with local ids `0..n` and then
//! shifted into the range handed out here, so ids never collide across the
//! graphs of one scene.

use std::ops::Range;

use crate::NodeId;

/// Hands out contiguous, non-overlapping id ranges.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: NodeId,
}

impl IdAllocator {
    /// Allocator whose first id is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first id is `first`.
    pub fn starting_at(first: NodeId) -> Self {
        Self { next: first }
    }

    /// Reserve `count` consecutive ids.
    pub fn allocate(&mut self, count: usize) -> Range<NodeId> {
        let start = self.next;
        self.next += count;
        start..self.next
    }

    /// The id the next allocation will start at.
    pub fn peek(&self) -> NodeId {
        self.next
    }
}
