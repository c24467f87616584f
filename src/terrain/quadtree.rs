//! Quadtree activation propagation (§4.G step 3): folds the
//! Lindstrom-Koller per-sample activation levels (step 2) into the
//! per-node edge-midpoint and centre activations the chunker (step 4)
//! walks.

use super::heightmap::TerrainHeightMap;

/// Grid-space corners of the quadtree node at `(level, nx, ny)`, where
/// `level` counts down from the root (`level 0` is the whole grid) and
/// `nx`/`ny` range over `0..2^level`.
pub fn node_bounds(hm: &TerrainHeightMap, level: u32, nx: usize, ny: usize) -> (usize, usize, usize, usize) {
    let nodes_per_side = 1usize << level;
    let side = (hm.size - 1) / nodes_per_side;
    let x0 = nx * side;
    let y0 = ny * side;
    (x0, y0, x0 + side, y0 + side)
}

fn raise(hm: &mut TerrainHeightMap, x: usize, y: usize, level: i8) {
    let sample = hm.get_mut(x, y);
    if level > sample.activation_level {
        sample.activation_level = level;
    }
}

/// Promotes one node's four corner activations into its edge midpoints,
/// then into its centre (§4.G step 3).
fn promote_node(hm: &mut TerrainHeightMap, x0: usize, y0: usize, x1: usize, y1: usize) {
    let mid_x = (x0 + x1) / 2;
    let mid_y = (y0 + y1) / 2;
    if mid_x == x0 || mid_y == y0 {
        return;
    }

    let tl = hm.get(x0, y0).activation_level;
    let tr = hm.get(x1, y0).activation_level;
    let bl = hm.get(x0, y1).activation_level;
    let br = hm.get(x1, y1).activation_level;

    raise(hm, mid_x, y0, tl.max(tr));
    raise(hm, mid_x, y1, bl.max(br));
    raise(hm, x0, mid_y, tl.max(bl));
    raise(hm, x1, mid_y, tr.max(br));

    let top = hm.get(mid_x, y0).activation_level;
    let bottom = hm.get(mid_x, y1).activation_level;
    let left = hm.get(x0, mid_y).activation_level;
    let right = hm.get(x1, mid_y).activation_level;
    raise(hm, mid_x, mid_y, top.max(bottom).max(left).max(right));
}

/// Runs the propagation exactly twice per level, mirroring step 2's
/// two-pass (SW/NE) structure so edge midpoints shared by the two halves
/// are stamped from both sides. `raise` only ever increases a level, so
/// the repeated pass is safe to run unconditionally.
pub fn propagate_activation(hm: &mut TerrainHeightMap, tree_depth: u32) {
    for _pass in 0..2 {
        for level in (0..tree_depth).rev() {
            let nodes_per_side = 1usize << level;
            for ny in 0..nodes_per_side {
                for nx in 0..nodes_per_side {
                    let (x0, y0, x1, y1) = node_bounds(hm, level, nx, ny);
                    promote_node(hm, x0, y0, x1, y1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::terrain::heightmap::build_heightmap;
    use image::DynamicImage;

    #[test]
    fn test_flat_grid_propagation_raises_nothing() {
        let config = TerrainConfig {
            max_base_error: 1.0,
            tree_depth: 2,
            ..Default::default()
        };
        let image = DynamicImage::new_luma8(5, 5);
        let mut hm = build_heightmap(&image, &config);
        super::super::heightmap::lindstrom_koller_update(&mut hm);
        propagate_activation(&mut hm, config.tree_depth);

        for sample in &hm.elements {
            assert!(sample.activation_level <= 0);
        }
    }

    #[test]
    fn test_node_bounds_root_covers_whole_grid() {
        let config = TerrainConfig::default();
        let image = DynamicImage::new_luma8(3, 3);
        let hm = build_heightmap(&image, &config);
        let (x0, y0, x1, y1) = node_bounds(&hm, 0, 0, 0);
        assert_eq!((x0, y0), (0, 0));
        assert_eq!((x1, y1), (hm.size - 1, hm.size - 1));
    }
}
