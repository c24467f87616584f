//! CDLOD terrain preprocessing (§4.G): heightmap sample grid construction,
//! Lindstrom-Koller error computation, quadtree activation propagation,
//! LEB chunking, and the on-disk chunk file format.
//!
//! `preprocess` ties steps 1-4 together and writes the result straight to
//! a chunk file, mirroring `pl_process_cdlod_heightmap`'s role as the
//! single entry point extensions call.

pub mod chunk_file;
pub mod heightmap;
pub mod leb;
pub mod octahedron;
pub mod quadtree;

use std::path::Path;

use image::DynamicImage;

use crate::config::TerrainConfig;
use crate::error::PilotLightResult;

pub use chunk_file::{read_chunk_tree, ChunkRecord, ChunkTree};
pub use heightmap::TerrainHeightMap;
pub use leb::{ChunkNode, TerrainVertex};

/// Runs the full CDLOD pipeline over `image` and writes the result to
/// `out_path` (§4.G steps 1-4, §6).
pub fn preprocess(image: &DynamicImage, config: &TerrainConfig, out_path: &Path) -> PilotLightResult<()> {
    config.validate()?;

    let mut hm = heightmap::build_heightmap(image, config);
    log::info!("[terrain] built {0}x{0} heightmap", hm.size);

    heightmap::lindstrom_koller_update(&mut hm);
    quadtree::propagate_activation(&mut hm, config.tree_depth);

    let chunks = leb::build_chunk_tree(&mut hm, config.tree_depth, config.boundary_policy)?;
    log::info!("[terrain] chunked into {} nodes", chunks.len());

    chunk_file::write_chunk_file(out_path, config.tree_depth, config.max_base_error, &chunks)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use tempfile::tempdir;

    #[test]
    fn test_preprocess_writes_a_loadable_chunk_file() {
        let config = TerrainConfig { tree_depth: 1, max_base_error: 1.0, ..Default::default() };
        let image = DynamicImage::new_luma8(3, 3);
        let dir = tempdir().unwrap();
        let path = dir.path().join("terrain.chunks");

        preprocess(&image, &config, &path).unwrap();

        let tree = read_chunk_tree(&path).unwrap();
        assert_eq!(tree.nodes.len(), 5);
    }

    #[test]
    fn test_preprocess_rejects_tree_depth_exceeding_resolution() {
        let config = TerrainConfig { tree_depth: 8, max_base_error: 1.0, ..Default::default() };
        let image = DynamicImage::new_luma8(3, 3);
        let dir = tempdir().unwrap();
        let path = dir.path().join("terrain.chunks");

        assert!(preprocess(&image, &config, &path).is_err());
    }
}
