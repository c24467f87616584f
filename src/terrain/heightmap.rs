//! CDLOD heightmap state and the first two preprocessing steps: sample
//! grid construction (§4.G step 1) and Lindstrom-Koller error/activation
//! computation (§4.G step 2).

use glam::Vec3;
use image::DynamicImage;

use crate::config::{EllipsoidConfig, TerrainConfig};

use super::octahedron;

/// `activation_level = -1` means "inactive" (§3).
pub const INACTIVE_LEVEL: i8 = -1;
/// "not yet emitted" (§3).
pub const NO_VERTEX_BUFFER_INDEX: u32 = u32::MAX;

/// Per-sample state (§3 `elements[size*size]`).
#[derive(Debug, Clone, Copy)]
pub struct HeightmapSample {
    pub position: Vec3,
    pub encoded_normal: [f32; 2],
    pub error: f32,
    pub activation_level: i8,
    pub vertex_buffer_index: u32,
}

impl Default for HeightmapSample {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            encoded_normal: [0.0, 0.0],
            error: 0.0,
            activation_level: INACTIVE_LEVEL,
            vertex_buffer_index: NO_VERTEX_BUFFER_INDEX,
        }
    }
}

/// `size: 2^k + 1` for some `k >= 1` (§3).
pub struct TerrainHeightMap {
    pub size: usize,
    pub elements: Vec<HeightmapSample>,
    pub meters_per_pixel: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub max_base_error: f32,
    pub ellipsoid: Option<EllipsoidConfig>,
}

impl TerrainHeightMap {
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.size + i
    }

    pub fn get(&self, i: usize, j: usize) -> &HeightmapSample {
        &self.elements[self.index(i, j)]
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut HeightmapSample {
        let idx = self.index(i, j);
        &mut self.elements[idx]
    }
}

/// `2^k + 1 >= max(width, height)` (§4.G numeric notes).
fn padded_size(width: u32, height: u32) -> usize {
    let target = width.max(height).max(2) - 1;
    let mut k: u32 = 1;
    while (1u32 << k) < target {
        k += 1;
    }
    (1usize << k) + 1
}

/// Heights are internally normalised to 16-bit before being scaled back
/// to `[min, max]`, so 8-bit, 16-bit, and HDR inputs of the same visible
/// values produce identical LODs.
fn normalized_sample(luma16: &image::ImageBuffer<image::Luma<u16>, Vec<u16>>, x: u32, y: u32) -> f32 {
    let x = x.min(luma16.width() - 1);
    let y = y.min(luma16.height() - 1);
    luma16.get_pixel(x, y).0[0] as f32 / u16::MAX as f32
}

/// Step 1 (§4.G): pad the source image up to `N = 2^k + 1`, fill
/// `elements[i,j]` with world-space positions, and compute per-sample
/// normals by central difference.
pub fn build_heightmap(image: &DynamicImage, config: &TerrainConfig) -> TerrainHeightMap {
    let luma16 = image.to_luma16();
    let size = padded_size(luma16.width(), luma16.height());

    let mut heights = vec![0.0f32; size * size];
    for j in 0..size {
        for i in 0..size {
            let normalized = normalized_sample(&luma16, i as u32, j as u32);
            heights[j * size + i] = config.min_height + normalized * (config.max_height - config.min_height);
        }
    }

    let mut elements = vec![HeightmapSample::default(); size * size];
    let half_extent = (size as f32) * config.meters_per_pixel / 2.0;

    for j in 0..size {
        for i in 0..size {
            let h = heights[j * size + i];
            let x = i as f32 * config.meters_per_pixel - half_extent;
            let z = j as f32 * config.meters_per_pixel - half_extent;

            let position = match &config.ellipsoid {
                None => Vec3::new(x, h, z),
                Some(ellipsoid) => ellipsoid_position(ellipsoid, x, z, h),
            };
            elements[j * size + i].position = position;
        }
    }

    for j in 0..size {
        for i in 0..size {
            let normal = central_difference_normal(&elements, size, i, j);
            elements[j * size + i].encoded_normal = octahedron::encode(normal);
        }
    }

    TerrainHeightMap {
        size,
        elements,
        meters_per_pixel: config.meters_per_pixel,
        min_height: config.min_height,
        max_height: config.max_height,
        max_base_error: config.max_base_error,
        ellipsoid: config.ellipsoid,
    }
}

fn ellipsoid_position(ellipsoid: &EllipsoidConfig, x: f32, z: f32, height: f32) -> Vec3 {
    let radius = ellipsoid.radius as f32;
    let longitude = x / radius;
    let latitude = z / radius;
    let base = Vec3::new(
        radius * latitude.cos() * longitude.sin(),
        radius * latitude.sin(),
        radius * latitude.cos() * longitude.cos(),
    );
    let normal = base.normalize();
    base + normal * height
}

fn central_difference_normal(elements: &[HeightmapSample], size: usize, i: usize, j: usize) -> Vec3 {
    let left = elements[j * size + i.saturating_sub(1)].position;
    let right = elements[j * size + (i + 1).min(size - 1)].position;
    let up = elements[j.saturating_sub(1) * size + i].position;
    let down = elements[(j + 1).min(size - 1) * size + i].position;
    (right - left).cross(down - up).normalize_or_zero()
}

/// Step 2 (§4.G): two recursive Lindstrom-Koller passes covering the SW
/// and NE halves of the grid, splitting each root right-triangle along
/// its hypotenuse until the base reaches sample resolution.
pub fn lindstrom_koller_update(hm: &mut TerrainHeightMap) {
    let n = hm.size - 1;

    // Root triangles share the diagonal (0,0)-(n,n): the SW triangle has
    // its right-angle apex at (n,0), the NE triangle's apex is at (0,n).
    update_triangle(hm, (n, 0), (0, 0), (n, n));
    update_triangle(hm, (0, n), (0, 0), (n, n));
}

fn height_of(hm: &TerrainHeightMap, p: (usize, usize)) -> f32 {
    hm.get(p.0, p.1).position.y
}

fn midpoint(a: (usize, usize), b: (usize, usize)) -> (usize, usize) {
    ((a.0 + b.0) / 2, (a.1 + b.1) / 2)
}

/// Ported from `pl__update`: recurses on the left/right leg, not a
/// precomputed depth counter, terminating only when `left` and `right`
/// are already adjacent samples (base resolution, no midpoint left to
/// subdivide). A depth counter that bottoms out early silently stops
/// short of sample resolution and leaves odd-coordinate vertices at
/// `INACTIVE_LEVEL` regardless of their true error.
fn update_triangle(hm: &mut TerrainHeightMap, apex: (usize, usize), left: (usize, usize), right: (usize, usize)) {
    let dx = (left.0 as i64 - right.0 as i64).abs();
    let dz = (left.1 as i64 - right.1 as i64).abs();
    if dx <= 1 && dz <= 1 {
        return;
    }
    let base = midpoint(left, right);

    let error = height_of(hm, base) - (height_of(hm, left) + height_of(hm, right)) / 2.0;
    if error.abs() >= hm.max_base_error {
        let level = ((error.abs() / hm.max_base_error).log2() + 0.5).floor() as i8;
        let sample = hm.get_mut(base.0, base.1);
        sample.error = error;
        if level > sample.activation_level {
            sample.activation_level = level;
        }
    }

    update_triangle(hm, base, apex, left);
    update_triangle(hm, base, right, apex);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_size_rounds_up_to_power_of_two_plus_one() {
        assert_eq!(padded_size(3, 3), 3);
        assert_eq!(padded_size(4, 4), 5);
        assert_eq!(padded_size(9, 5), 9);
    }

    #[test]
    fn test_flat_heightmap_has_no_raised_activation() {
        // Scenario S6 setup: a flat heightmap should never exceed the
        // inactive level since error is always 0.
        let config = TerrainConfig {
            tree_depth: 1,
            max_base_error: 1.0,
            ..Default::default()
        };
        let image = DynamicImage::new_luma8(3, 3);
        let mut hm = build_heightmap(&image, &config);
        lindstrom_koller_update(&mut hm);

        for sample in &hm.elements {
            assert!(sample.activation_level <= 0);
        }
    }

    #[test]
    fn test_grid_size_is_power_of_two_plus_one() {
        let config = TerrainConfig::default();
        let image = DynamicImage::new_luma8(3, 3);
        let hm = build_heightmap(&image, &config);
        let n = hm.size - 1;
        assert_eq!(n & (n - 1), 0, "size - 1 should be a power of two");
    }

    #[test]
    fn test_non_flat_heightmap_raises_activation_at_odd_coordinate_vertices() {
        // A checkerboard height pattern guarantees curvature at every
        // adjacent pair of samples, so the update must reach sample
        // resolution (odd-coordinate vertices, not just the even/coarse
        // grid a truncated recursion would stop at) to find it.
        let config = TerrainConfig {
            tree_depth: 1,
            max_base_error: 0.01,
            meters_per_pixel: 1.0,
            min_height: 0.0,
            max_height: 100.0,
            ..Default::default()
        };
        let size = 5u32;
        let buf: image::ImageBuffer<image::Luma<u8>, Vec<u8>> =
            image::ImageBuffer::from_fn(size, size, |x, y| if (x + y) % 2 == 0 { image::Luma([255u8]) } else { image::Luma([0u8]) });
        let image = DynamicImage::ImageLuma8(buf);

        let mut hm = build_heightmap(&image, &config);
        lindstrom_koller_update(&mut hm);

        let odd_coordinate_activated = (0..hm.size).any(|j| {
            (0..hm.size).any(|i| (i % 2 == 1 || j % 2 == 1) && hm.get(i, j).activation_level > INACTIVE_LEVEL)
        });
        assert!(
            odd_coordinate_activated,
            "expected at least one odd-coordinate (fine-resolution) vertex to receive a raised activation level"
        );
    }
}
