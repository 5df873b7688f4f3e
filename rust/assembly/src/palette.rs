// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-node display colors.

use part2cad_graph::NodeId;
use rand::prelude::*;
use rustc_hash::FxHashMap;

/// Rainbow colormap at `x` in `[0, 1]`, channels in `[0, 1]`.
pub fn rainbow(x: f64) -> [f64; 3] {
    let x = x.clamp(0.0, 1.0);
    let r = (2.0 * x - 0.5).abs();
    let g = (x * std::f64::consts::PI).sin();
    let b = (x * std::f64::consts::FRAC_PI_2).cos();
    [r, g, b].map(|c| c.clamp(0.0, 1.0))
}

/// Evenly spaced rainbow colors assigned to `ids` in seeded-shuffled order.
///
/// Channels are quantised to 8 bits and returned in `[0, 1]`.
pub fn palette(ids: &[NodeId], seed: u64) -> FxHashMap<NodeId, [f64; 3]> {
    let mut order = ids.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let n = order.len();
    order
        .into_iter()
        .enumerate()
        .map(|(k, id)| {
            let x = if n > 1 { k as f64 / (n - 1) as f64 } else { 0.0 };
            let color = rainbow(x).map(|c| (c * 255.0).floor() / 255.0);
            (id, color)
        })
        .collect()
}
