//! LEB (longest-edge bisection) chunking (§4.G step 4): the hardest part
//! of the pipeline. For every quadtree node produced by step 3, this
//! densifies a pair of root right-triangles down to sample resolution
//! via binary-tree triangle ids, then coarsens the result back up by
//! merging "diamonds" (a triangle and its mirror sharing a base edge)
//! wherever neither half's midpoint needs the extra detail, and finally
//! emits a deduplicated vertex/index buffer for the node.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::config::BoundaryPolicy;
use crate::error::{PilotLightError, PilotLightResult};

use super::heightmap::{TerrainHeightMap, NO_VERTEX_BUFFER_INDEX};

/// One emitted chunk (§3 chunk node, §6 file row).
pub struct ChunkNode {
    pub label: i32,
    pub level: i32,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

/// §6: 20 bytes, position then octahedron-encoded normal.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub encoded_normal: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<TerrainVertex>(), 20);

#[derive(Debug, Clone, Copy, Default)]
struct Triangle {
    level: i32,
    apex: u32,
    left: u32,
    right: u32,
}

/// Grid-space centre coordinates to breadth-first quadtree rank, mirroring
/// the reference `pl__node_index` bit trick. `full_log_size` is the whole
/// heightmap's `log2(size - 1)`, not the node's own size.
///
/// The reference implementation has no lowest-set-bit for `x == z == 0`
/// (the finest leaf at the grid's NW corner) and shifts by the machine
/// word width, which is undefined behaviour in C. We return `-1` for
/// that one node instead, reusing the function's existing "not a valid
/// node" sentinel for out-of-range coordinates; the label is metadata
/// only and never drives tree structure.
fn node_index(full_log_size: u32, x: u32, z: u32) -> i32 {
    if x == 0 && z == 0 {
        return -1;
    }
    let l1 = (x | z).trailing_zeros();
    let depth = full_log_size - l1 - 1;
    let base = 0x5555_5555u32 & ((1u32 << (depth * 2)) - 1);
    let shift = l1 + 1;
    let col = x >> shift;
    let row = z >> shift;
    (base + (row << depth) + col) as i32
}

fn elem_coords(size: usize, flat: u32) -> (usize, usize) {
    (flat as usize % size, flat as usize / size)
}

fn activate(hm: &mut TerrainHeightMap, x: usize, z: usize, level: i32) {
    let sample = hm.get_mut(x, z);
    if level as i8 > sample.activation_level {
        sample.activation_level = level as i8;
    }
}

fn mid_activation(hm: &TerrainHeightMap, left: u32, right: u32) -> i32 {
    let (lx, lz) = elem_coords(hm.size, left);
    let (rx, rz) = elem_coords(hm.size, right);
    hm.get((lx + rx) / 2, (lz + rz) / 2).activation_level as i32
}

/// Assigns `sample` a fresh dense vertex index the first time it's
/// referenced (dedup via the `vertex_buffer_index` sentinel), pushing its
/// data into `vertices` and folding its position into the running AABB.
fn assign_vertex(
    hm: &mut TerrainHeightMap,
    vertices: &mut Vec<TerrainVertex>,
    aabb_min: &mut Vec3,
    aabb_max: &mut Vec3,
    sample: u32,
) -> u32 {
    let elem = &mut hm.elements[sample as usize];
    if elem.vertex_buffer_index == NO_VERTEX_BUFFER_INDEX {
        elem.vertex_buffer_index = vertices.len() as u32;
        vertices.push(TerrainVertex { position: elem.position.to_array(), encoded_normal: elem.encoded_normal });
        *aabb_min = aabb_min.min(elem.position);
        *aabb_max = aabb_max.max(elem.position);
    }
    elem.vertex_buffer_index
}

/// Densifies this node's two root triangles down to `max_level`, then
/// coarsens by diamond merge, then emits the surviving triangles as a
/// vertex/index buffer. Ported from `pl__terrain_mesh` (§9); `out` is
/// appended to depth-first in NW, NE, SW, SE order to match the loader's
/// expected traversal.
#[allow(clippy::too_many_arguments)]
fn mesh_node(
    hm: &mut TerrainHeightMap,
    full_log_size: u32,
    start_x: usize,
    start_z: usize,
    log_size: u32,
    level: i32,
    boundary_policy: BoundaryPolicy,
    out: &mut Vec<ChunkNode>,
) {
    let size = 1usize << log_size;
    let end_x = start_x + size;
    let end_z = start_z + size;
    let half = size / 2;
    let cx = start_x + half;
    let cz = start_z + half;
    let label = node_index(full_log_size, cx as u32, cz as u32);

    activate(hm, start_x, start_z, level);
    activate(hm, end_x, start_z, level);
    activate(hm, start_x, end_z, level);
    activate(hm, end_x, end_z, level);

    let max_level = (log_size * 2) as i32;
    let max_id: usize = 1usize << (max_level as u32 + 2);
    let mut triangles = vec![Triangle::default(); max_id];
    let mut present = vec![false; max_id];

    let sw = Triangle {
        level,
        apex: hm.index(end_x, start_z) as u32,
        left: hm.index(start_x, start_z) as u32,
        right: hm.index(end_x, end_z) as u32,
    };
    let ne = Triangle {
        level,
        apex: hm.index(start_x, end_z) as u32,
        left: hm.index(end_x, end_z) as u32,
        right: hm.index(start_x, start_z) as u32,
    };

    let mut stack = vec![(2u32, sw), (3u32, ne)];
    while let Some((id, tri)) = stack.pop() {
        triangles[id as usize] = tri;
        hm.elements[tri.apex as usize].vertex_buffer_index = NO_VERTEX_BUFFER_INDEX;
        hm.elements[tri.left as usize].vertex_buffer_index = NO_VERTEX_BUFFER_INDEX;
        hm.elements[tri.right as usize].vertex_buffer_index = NO_VERTEX_BUFFER_INDEX;

        if tri.level == max_level {
            present[id as usize] = true;
            continue;
        }

        let (lx, lz) = elem_coords(hm.size, tri.left);
        let (rx, rz) = elem_coords(hm.size, tri.right);
        let mid = hm.index((lx + rx) / 2, (lz + rz) / 2) as u32;
        let child_level = tri.level + 1;

        let child0 = Triangle { level: child_level, apex: mid, left: tri.apex, right: tri.left };
        let child1 = Triangle { level: child_level, apex: mid, left: tri.right, right: tri.apex };
        let child0_id = id << 1;
        let child1_id = child0_id | 1;
        if (child1_id as usize) < max_id {
            stack.push((child0_id, child0));
            stack.push((child1_id, child1));
        }
    }

    // Diamond merge, finest pairs first (§4.G step 4, §9). Edge key ->
    // the (up to) two parent triangle ids sharing that base edge; built
    // fresh per level since the key already carries the level.
    for current_level in (0..max_level).rev() {
        let mut edges: FxHashMap<(u32, u32, i32), (u32, u32)> = FxHashMap::default();
        for parent in 2..max_id {
            if triangles[parent].level != current_level {
                continue;
            }
            let child0 = parent << 1;
            let child1 = child0 | 1;
            if child1 >= max_id || !present[child0] || !present[child1] {
                continue;
            }
            let tri = &triangles[parent];
            let key = (tri.left.min(tri.right), tri.left.max(tri.right), current_level);
            edges
                .entry(key)
                .and_modify(|e| e.1 = parent as u32)
                .or_insert((parent as u32, u32::MAX));
        }

        for i in 1..max_id {
            if i & 1 != 0 || !present[i] || !present[i | 1] {
                continue;
            }
            if triangles[i].level != current_level + 1 {
                continue;
            }
            let sibling = i | 1;
            let parent = i >> 1;
            if parent < 2 {
                continue;
            }
            let tri = &triangles[parent];
            if mid_activation(hm, tri.left, tri.right) >= level {
                continue;
            }

            let key = (tri.left.min(tri.right), tri.left.max(tri.right), current_level);
            let mate_parent = match edges.get(&key) {
                Some(&(a, b)) => {
                    let mate = if a == parent as u32 { b } else { a };
                    if mate == u32::MAX || mate < 2 || mate as usize >= max_id {
                        None
                    } else {
                        Some(mate as usize)
                    }
                }
                None => None,
            };

            let Some(mate_parent) = mate_parent else {
                match boundary_policy {
                    BoundaryPolicy::ForceMerge => {
                        present[i] = false;
                        present[sibling] = false;
                        present[parent] = true;
                    }
                    BoundaryPolicy::KeepSplit => {}
                }
                continue;
            };
            if parent > mate_parent {
                continue; // the mate's own pass already handled this diamond
            }

            let mate_child0 = mate_parent << 1;
            let mate_child1 = mate_child0 | 1;
            if mate_child1 >= max_id || !present[mate_child0] || !present[mate_child1] {
                continue;
            }
            let mate = &triangles[mate_parent];
            if mid_activation(hm, mate.left, mate.right) >= level {
                continue;
            }

            present[i] = false;
            present[sibling] = false;
            present[parent] = true;
            present[mate_child0] = false;
            present[mate_child1] = false;
            present[mate_parent] = true;
        }
    }

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut aabb_min = Vec3::splat(f32::INFINITY);
    let mut aabb_max = Vec3::splat(f32::NEG_INFINITY);

    for id in 1..max_id {
        if !present[id] {
            continue;
        }
        let tri = triangles[id];
        let apex_idx = assign_vertex(hm, &mut vertices, &mut aabb_min, &mut aabb_max, tri.apex);
        let left_idx = assign_vertex(hm, &mut vertices, &mut aabb_min, &mut aabb_max, tri.left);
        let right_idx = assign_vertex(hm, &mut vertices, &mut aabb_min, &mut aabb_max, tri.right);
        indices.push(apex_idx);
        indices.push(left_idx);
        indices.push(right_idx);
    }

    out.push(ChunkNode { label, level, aabb_min, aabb_max, vertices, indices });

    if level > 0 {
        let child_log_size = log_size - 1;
        let quarter = 1usize << (child_log_size);
        let corners = [
            (start_x, start_z),          // NW
            (start_x + quarter, start_z), // NE
            (start_x, start_z + quarter), // SW
            (start_x + quarter, start_z + quarter), // SE
        ];
        for (cx, cz) in corners {
            mesh_node(hm, full_log_size, cx, cz, child_log_size, level - 1, boundary_policy, out);
        }
    }
}

/// Builds the full chunk tree for a preprocessed heightmap (§4.G step 4,
/// §8 invariant 6). Depth-first NW/NE/SW/SE order, root first.
pub fn build_chunk_tree(
    hm: &mut TerrainHeightMap,
    tree_depth: u32,
    boundary_policy: BoundaryPolicy,
) -> PilotLightResult<Vec<ChunkNode>> {
    let full_log_size = (hm.size - 1).trailing_zeros();
    if tree_depth > full_log_size {
        return Err(PilotLightError::InvalidConfig {
            field: "tree_depth".to_string(),
            reason: format!(
                "tree_depth {} exceeds heightmap resolution (log2(size-1) = {})",
                tree_depth, full_log_size
            ),
        });
    }

    let mut out = Vec::new();
    mesh_node(hm, full_log_size, 0, 0, full_log_size, tree_depth as i32, boundary_policy, &mut out);
    Ok(out)
}
