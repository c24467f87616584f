//! Binary chunk file format (§6) and the streaming loader (§4.H).
//!
//! The writer serialises a whole chunk tree depth-first, NW/NE/SW/SE; the
//! loader mirrors that same traversal but never materialises vertex or
//! index bytes, only the per-chunk metadata and the file offset needed to
//! seek back and stream them on demand.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use glam::Vec3;

use super::leb::{ChunkNode, TerrainVertex};

#[derive(Debug, thiserror::Error)]
pub enum ChunkFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated chunk file: expected {expected} bytes, read {got}")]
    Truncated { expected: usize, got: usize },
    #[error("invalid tree_depth: {0}")]
    BadTreeDepth(u32),
}

type ChunkFileResult<T> = Result<T, ChunkFileError>;

const VERTEX_SIZE: usize = 20; // 3x f32 position + 2x f32 encoded normal
const HEADER_SIZE: usize = 4 + 4 + 4; // tree_depth, max_base_error, chunk_count

fn expected_chunk_count(tree_depth: u32) -> usize {
    (4usize.pow(tree_depth + 1) - 1) / 3
}

/// Writes a whole chunk tree (§6): header, then every chunk in the order
/// `chunks` was produced (depth-first NW/NE/SW/SE).
pub fn write_chunk_file(path: &Path, tree_depth: u32, max_base_error: f32, chunks: &[ChunkNode]) -> ChunkFileResult<()> {
    if chunks.len() != expected_chunk_count(tree_depth) {
        return Err(ChunkFileError::BadTreeDepth(tree_depth));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&(tree_depth as i32).to_le_bytes())?;
    writer.write_all(&max_base_error.to_le_bytes())?;
    writer.write_all(&(chunks.len() as u32).to_le_bytes())?;

    for chunk in chunks {
        write_chunk(&mut writer, chunk)?;
    }

    writer.flush()?;
    log::info!("[terrain::chunk_file] wrote {} chunks to {}", chunks.len(), path.display());
    Ok(())
}

fn write_chunk<W: Write>(writer: &mut W, chunk: &ChunkNode) -> ChunkFileResult<()> {
    writer.write_all(&chunk.label.to_le_bytes())?;
    writer.write_all(&chunk.level.to_le_bytes())?;
    write_vec3(writer, chunk.aabb_min)?;
    write_vec3(writer, chunk.aabb_max)?;

    writer.write_all(&(chunk.vertices.len() as u32).to_le_bytes())?;
    for v in &chunk.vertices {
        writer.write_all(&v.position[0].to_le_bytes())?;
        writer.write_all(&v.position[1].to_le_bytes())?;
        writer.write_all(&v.position[2].to_le_bytes())?;
        writer.write_all(&v.encoded_normal[0].to_le_bytes())?;
        writer.write_all(&v.encoded_normal[1].to_le_bytes())?;
    }

    writer.write_all(&(chunk.indices.len() as u32).to_le_bytes())?;
    for &index in &chunk.indices {
        writer.write_all(&index.to_le_bytes())?;
    }
    Ok(())
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> ChunkFileResult<()> {
    writer.write_all(&v.x.to_le_bytes())?;
    writer.write_all(&v.y.to_le_bytes())?;
    writer.write_all(&v.z.to_le_bytes())?;
    Ok(())
}

/// One node's metadata as read back from disk. Vertex and index bytes are
/// never copied into memory here; `vertex_count`/`index_count` and
/// `file_offset` are enough for a caller to `read_chunk_vertices`/
/// `read_chunk_indices` on demand (§4.H: load-on-demand streaming).
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub label: i32,
    pub level: i32,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Byte offset of this chunk's `label` field, i.e. the start of its
    /// on-disk record.
    pub file_offset: u64,
    pub parent: Option<usize>,
    /// `[nw, ne, sw, se]`, `None` for leaves.
    pub children: [Option<usize>; 4],
}

/// A loaded chunk tree: flat arena of `ChunkRecord`s with index-based
/// parent/child links, plus the path used to stream geometry back in.
pub struct ChunkTree {
    pub tree_depth: u32,
    pub max_base_error: f32,
    pub nodes: Vec<ChunkRecord>,
    path: std::path::PathBuf,
}

impl ChunkTree {
    pub fn root(&self) -> &ChunkRecord {
        &self.nodes[0]
    }

    /// Streams just this chunk's vertex buffer off disk (§4.H: callers
    /// load geometry lazily as chunks activate).
    pub fn read_chunk_vertices(&self, record: &ChunkRecord) -> ChunkFileResult<Vec<TerrainVertex>> {
        let mut file = File::open(&self.path)?;
        let vertex_header_offset = record.file_offset + 4 + 4 + 24; // label, level, aabb min+max
        file.seek(SeekFrom::Start(vertex_header_offset + 4))?; // skip the vertex_count field itself
        let mut out = Vec::with_capacity(record.vertex_count as usize);
        let mut buf = [0u8; VERTEX_SIZE];
        for _ in 0..record.vertex_count {
            file.read_exact(&mut buf)?;
            out.push(TerrainVertex {
                position: [
                    f32::from_le_bytes(buf[0..4].try_into().unwrap()),
                    f32::from_le_bytes(buf[4..8].try_into().unwrap()),
                    f32::from_le_bytes(buf[8..12].try_into().unwrap()),
                ],
                encoded_normal: [
                    f32::from_le_bytes(buf[12..16].try_into().unwrap()),
                    f32::from_le_bytes(buf[16..20].try_into().unwrap()),
                ],
            });
        }
        Ok(out)
    }

    /// Streams just this chunk's index buffer off disk.
    pub fn read_chunk_indices(&self, record: &ChunkRecord) -> ChunkFileResult<Vec<u32>> {
        let mut file = File::open(&self.path)?;
        let vertex_header_offset = record.file_offset + 4 + 4 + 24;
        let index_header_offset = vertex_header_offset + 4 + (record.vertex_count as u64) * VERTEX_SIZE as u64;
        file.seek(SeekFrom::Start(index_header_offset + 4))?;
        let mut out = Vec::with_capacity(record.index_count as usize);
        let mut buf = [0u8; 4];
        for _ in 0..record.index_count {
            file.read_exact(&mut buf)?;
            out.push(u32::from_le_bytes(buf));
        }
        Ok(out)
    }
}

/// Reads the header and every chunk's metadata (§4.H), without
/// materialising any vertex or index data. Vertex/index bytes are skipped
/// with a seek, so loading a deep tree stays cheap regardless of mesh
/// density.
pub fn read_chunk_tree(path: &Path) -> ChunkFileResult<ChunkTree> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let tree_depth = read_i32(&mut reader)? as u32;
    let max_base_error = read_f32(&mut reader)?;
    let chunk_count = read_u32(&mut reader)?;
    if chunk_count as usize != expected_chunk_count(tree_depth) {
        return Err(ChunkFileError::BadTreeDepth(tree_depth));
    }

    let mut nodes = Vec::with_capacity(chunk_count as usize);
    read_node(&mut reader, HEADER_SIZE as u64, None, tree_depth as i32, &mut nodes)?;

    Ok(ChunkTree { tree_depth, max_base_error, nodes, path: path.to_path_buf() })
}

fn read_node<R: Read + Seek>(
    reader: &mut R,
    file_offset: u64,
    parent: Option<usize>,
    level: i32,
    nodes: &mut Vec<ChunkRecord>,
) -> ChunkFileResult<usize> {
    let label = read_i32(reader)?;
    let node_level = read_i32(reader)?;
    let aabb_min = read_vec3(reader)?;
    let aabb_max = read_vec3(reader)?;

    let vertex_count = read_u32(reader)?;
    reader.seek(SeekFrom::Current((vertex_count as i64) * VERTEX_SIZE as i64))?;

    let index_count = read_u32(reader)?;
    reader.seek(SeekFrom::Current((index_count as i64) * 4))?;

    let this_index = nodes.len();
    nodes.push(ChunkRecord {
        label,
        level: node_level,
        aabb_min,
        aabb_max,
        vertex_count,
        index_count,
        file_offset,
        parent,
        children: [None; 4],
    });

    if level > 0 {
        let mut children = [None; 4];
        for slot in children.iter_mut() {
            let child_offset = reader.stream_position()?;
            *slot = Some(read_node(reader, child_offset, Some(this_index), level - 1, nodes)?);
        }
        nodes[this_index].children = children;
    }

    Ok(this_index)
}

fn read_i32<R: Read>(reader: &mut R) -> ChunkFileResult<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> ChunkFileResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(reader: &mut R) -> ChunkFileResult<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_vec3<R: Read>(reader: &mut R) -> ChunkFileResult<Vec3> {
    Ok(Vec3::new(read_f32(reader)?, read_f32(reader)?, read_f32(reader)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundaryPolicy, TerrainConfig};
    use crate::terrain::heightmap::{build_heightmap, lindstrom_koller_update};
    use crate::terrain::leb::build_chunk_tree;
    use crate::terrain::quadtree::propagate_activation;
    use image::DynamicImage;
    use tempfile::tempdir;

    fn build_chunks(tree_depth: u32, size: u32) -> Vec<ChunkNode> {
        let config = TerrainConfig { tree_depth, max_base_error: 1.0, ..Default::default() };
        let image = DynamicImage::new_luma8(size, size);
        let mut hm = build_heightmap(&image, &config);
        lindstrom_koller_update(&mut hm);
        propagate_activation(&mut hm, tree_depth);
        build_chunk_tree(&mut hm, tree_depth, BoundaryPolicy::ForceMerge).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_chunk_count_and_metadata() {
        let chunks = build_chunks(1, 3);
        let dir = tempdir().unwrap();
        let path = dir.path().join("terrain.chunks");
        write_chunk_file(&path, 1, 1.0, &chunks).unwrap();

        let tree = read_chunk_tree(&path).unwrap();
        assert_eq!(tree.nodes.len(), chunks.len());
        assert_eq!(tree.tree_depth, 1);
        assert_eq!(tree.root().level, chunks[0].level);
        assert_eq!(tree.root().children.iter().filter(|c| c.is_some()).count(), 4);
    }

    #[test]
    fn test_streamed_vertices_match_written_vertices() {
        let chunks = build_chunks(1, 3);
        let dir = tempdir().unwrap();
        let path = dir.path().join("terrain.chunks");
        write_chunk_file(&path, 1, 1.0, &chunks).unwrap();

        let tree = read_chunk_tree(&path).unwrap();
        let vertices = tree.read_chunk_vertices(tree.root()).unwrap();
        assert_eq!(vertices.len(), chunks[0].vertices.len());
        for (got, want) in vertices.iter().zip(chunks[0].vertices.iter()) {
            assert_eq!(got.position, want.position);
            assert_eq!(got.encoded_normal, want.encoded_normal);
        }
    }

    #[test]
    fn test_mismatched_chunk_count_is_rejected() {
        let chunks = build_chunks(1, 3);
        assert!(write_chunk_file(&std::path::PathBuf::from("/dev/null"), 2, 1.0, &chunks).is_err());
    }
}
